//! Pari-mutuel payout arithmetic.
//!
//! Pure functions shared by settlement and the win meter. All amounts are
//! rounded half-up to the ledger's minor units; the per-winner rounding
//! residual is accepted as drift and never reconciled.

use rust_decimal::Decimal;
use serde::Serialize;

use super::error::DomainError;
use super::id::EntryId;
use super::money::{mul_div, percent_of, round_minor, Amount};

/// Company cut and distributable amount for a pool total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SettlementTerms {
    pub total_pool: Amount,
    pub company_cut_percent: Decimal,
    pub company_cut: Amount,
    pub payout_pool: Amount,
}

impl SettlementTerms {
    /// Split `total_pool` into company cut and payout pool.
    ///
    /// # Errors
    /// Returns [`DomainError::InvalidAmount`] if the cut does not fit.
    pub fn compute(
        total_pool: Amount,
        company_cut_percent: Decimal,
        minor_units: u32,
    ) -> Result<Self, DomainError> {
        let company_cut = percent_of(total_pool, company_cut_percent, minor_units)?;
        Ok(Self {
            total_pool,
            company_cut_percent,
            company_cut,
            payout_pool: total_pool - company_cut,
        })
    }
}

/// One winner's share of the payout pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Share {
    pub entry_id: EntryId,
    pub stake: Amount,
    pub amount: Amount,
}

/// Split `payout_pool` across winning stakes in proportion to each stake.
///
/// `share = stake / total_winning_stake * payout_pool`, rounded per entry.
/// Returns an empty vector when there is no winning stake.
///
/// # Errors
/// Returns [`DomainError::InvalidAmount`] if a share cannot be represented.
pub fn proportional_shares(
    stakes: &[(EntryId, Amount)],
    payout_pool: Amount,
    minor_units: u32,
) -> Result<Vec<Share>, DomainError> {
    let total_winning_stake: Amount = stakes.iter().map(|(_, stake)| *stake).sum();
    if total_winning_stake <= Decimal::ZERO {
        return Ok(Vec::new());
    }

    stakes
        .iter()
        .map(|&(entry_id, stake)| {
            Ok::<_, DomainError>(Share {
                entry_id,
                stake,
                amount: round_minor(
                    mul_div(stake, payout_pool, total_winning_stake)?,
                    minor_units,
                ),
            })
        })
        .collect()
}

/// Advisory payout estimate for a stake on one option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WinMeter {
    pub stake: Amount,
    pub option_total: Amount,
    pub payout_pool: Amount,
    pub estimate: Amount,
    /// `estimate / stake`; zero when nothing would be paid.
    pub multiplier: Decimal,
}

/// Estimate what `stake` would return if the option won with current totals.
///
/// Returns a zero estimate when the option has no stake or is eliminated.
///
/// # Errors
/// Returns [`DomainError::InvalidAmount`] if the estimate cannot be represented.
pub fn estimate_win(
    pool_total: Amount,
    company_cut_percent: Decimal,
    option_total: Amount,
    stake: Amount,
    option_active: bool,
    minor_units: u32,
) -> Result<WinMeter, DomainError> {
    let payout_pool = pool_total
        * (Decimal::ONE - company_cut_percent / Decimal::ONE_HUNDRED);
    let payout_pool = round_minor(payout_pool, minor_units);

    let estimate = if option_total <= Decimal::ZERO || !option_active {
        Decimal::ZERO
    } else {
        round_minor(mul_div(stake, payout_pool, option_total)?, minor_units)
    };
    let multiplier = if stake > Decimal::ZERO && estimate > Decimal::ZERO {
        (estimate / stake).round_dp(4).normalize()
    } else {
        Decimal::ZERO
    };

    Ok(WinMeter {
        stake,
        option_total,
        payout_pool,
        estimate,
        multiplier,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn stakes(amounts: &[Decimal]) -> Vec<(EntryId, Amount)> {
        amounts
            .iter()
            .enumerate()
            .map(|(i, a)| (EntryId::new(i as i64 + 1), *a))
            .collect()
    }

    #[test]
    fn terms_split_company_cut() {
        let terms = SettlementTerms::compute(dec!(1000), dec!(10), 2).unwrap();
        assert_eq!(terms.company_cut, dec!(100));
        assert_eq!(terms.payout_pool, dec!(900));
        assert_eq!(terms.company_cut + terms.payout_pool, terms.total_pool);
    }

    #[test]
    fn zero_cut_pays_everything() {
        let terms = SettlementTerms::compute(dec!(250.50), Decimal::ZERO, 2).unwrap();
        assert_eq!(terms.company_cut, Decimal::ZERO);
        assert_eq!(terms.payout_pool, dec!(250.50));
    }

    #[test]
    fn shares_300_and_700_split_900_exactly() {
        let shares = proportional_shares(&stakes(&[dec!(300), dec!(700)]), dec!(900), 2).unwrap();

        assert_eq!(shares[0].amount, dec!(270));
        assert_eq!(shares[1].amount, dec!(630));
        let total: Decimal = shares.iter().map(|s| s.amount).sum();
        assert_eq!(total, dec!(900));
    }

    #[test]
    fn sole_winner_takes_payout_pool() {
        let shares = proportional_shares(&stakes(&[dec!(1000)]), dec!(900), 2).unwrap();
        assert_eq!(shares.len(), 1);
        assert_eq!(shares[0].amount, dec!(900));
    }

    #[test]
    fn rounding_residual_is_bounded_by_winner_count() {
        let shares = proportional_shares(&stakes(&[dec!(1), dec!(1), dec!(1)]), dec!(100), 2).unwrap();
        let total: Decimal = shares.iter().map(|s| s.amount).sum();

        assert!(shares.iter().all(|s| s.amount == dec!(33.33)));
        let residual = dec!(100) - total;
        assert!(residual >= Decimal::ZERO);
        assert!(residual <= dec!(0.01) * Decimal::from(shares.len()));
    }

    #[test]
    fn large_stakes_split_without_overflowing() {
        let stake = dec!(1000000000000000);
        let shares = proportional_shares(&stakes(&[stake, stake]), dec!(1800000000000000), 2).unwrap();

        assert!(shares.iter().all(|s| s.amount == dec!(900000000000000)));
    }

    #[test]
    fn no_winning_stake_yields_no_shares() {
        assert!(proportional_shares(&[], dec!(900), 2).unwrap().is_empty());
    }

    #[test]
    fn win_meter_estimates_proportional_share() {
        let meter = estimate_win(dec!(1000), dec!(10), dec!(400), dec!(100), true, 2).unwrap();
        assert_eq!(meter.payout_pool, dec!(900));
        assert_eq!(meter.estimate, dec!(225));
        assert_eq!(meter.multiplier, dec!(2.25));
    }

    #[test]
    fn win_meter_is_zero_for_empty_or_eliminated_option() {
        let empty = estimate_win(dec!(1000), dec!(10), Decimal::ZERO, dec!(100), true, 2).unwrap();
        assert_eq!(empty.estimate, Decimal::ZERO);
        assert_eq!(empty.multiplier, Decimal::ZERO);

        let eliminated = estimate_win(dec!(1000), dec!(10), dec!(400), dec!(100), false, 2).unwrap();
        assert_eq!(eliminated.estimate, Decimal::ZERO);
    }
}
