//! Advisory payout estimates from live pool totals.

use diesel::SqliteConnection;

use super::pool_admin::require_option;
use crate::adapter::outbound::sqlite::pool_store;
use crate::domain::id::{OptionId, PoolId};
use crate::domain::money::{validate_amount, Amount};
use crate::domain::payout::{estimate_win, WinMeter};
use crate::domain::policy::LedgerPolicy;
use crate::domain::pool::OptionStatus;
use crate::error::Result;

/// Read-only "if this option wins" calculator.
///
/// Estimates move as other users join; nothing here is a commitment.
#[derive(Debug, Clone, Copy)]
pub struct WinMeterCalculator {
    policy: LedgerPolicy,
}

impl WinMeterCalculator {
    #[must_use]
    pub const fn new(policy: LedgerPolicy) -> Self {
        Self { policy }
    }

    /// Estimate the return of `stake` on `option_id` with current totals.
    ///
    /// # Errors
    /// Returns [`DomainError::PoolNotFound`](crate::domain::DomainError::PoolNotFound),
    /// [`DomainError::OptionNotFound`](crate::domain::DomainError::OptionNotFound),
    /// or [`DomainError::InvalidAmount`](crate::domain::DomainError::InvalidAmount)
    /// for a non-positive stake.
    pub fn estimate(
        &self,
        conn: &mut SqliteConnection,
        pool_id: PoolId,
        option_id: OptionId,
        stake: Amount,
    ) -> Result<WinMeter> {
        let stake = validate_amount(stake, self.policy.minor_units)?;
        let pool = pool_store::get_pool(conn, pool_id)?;
        let option = require_option(conn, pool_id, option_id)?;
        let pct = pool.resolve_company_cut(self.policy.default_company_cut_percent);

        Ok(estimate_win(
            pool.total_pool_amount,
            pct,
            option.total_stake,
            stake,
            option.status == OptionStatus::Active,
            self.policy.minor_units,
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::DomainError;
    use crate::testkit::db::TempDb;
    use crate::testkit::fixtures::{join, open_pool};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    #[test]
    fn estimate_uses_live_totals() {
        let temp = TempDb::create("winmeter-live");
        let db = temp.database();
        let (pool, options) = open_pool(&db, &["Red", "Blue"]);
        join(&db, "alice", &options[0], dec!(400));
        join(&db, "bob", &options[1], dec!(600));
        let meter = WinMeterCalculator::new(LedgerPolicy::default());

        let estimate = db
            .read(|conn| meter.estimate(conn, pool.id, options[0].id, dec!(100)))
            .unwrap();
        assert_eq!(estimate.payout_pool, dec!(900));
        assert_eq!(estimate.estimate, dec!(225));
        assert_eq!(estimate.multiplier, dec!(2.25));
    }

    #[test]
    fn empty_option_estimates_zero() {
        let temp = TempDb::create("winmeter-empty");
        let db = temp.database();
        let (pool, options) = open_pool(&db, &["Red", "Blue"]);
        join(&db, "alice", &options[0], dec!(50));
        let meter = WinMeterCalculator::new(LedgerPolicy::default());

        let estimate = db
            .read(|conn| meter.estimate(conn, pool.id, options[1].id, dec!(10)))
            .unwrap();
        assert_eq!(estimate.estimate, Decimal::ZERO);
    }

    #[test]
    fn unknown_option_is_not_found() {
        let temp = TempDb::create("winmeter-missing");
        let db = temp.database();
        let (pool, _) = open_pool(&db, &["Red", "Blue"]);
        let meter = WinMeterCalculator::new(LedgerPolicy::default());

        let err = db
            .read(|conn| meter.estimate(conn, pool.id, OptionId::new(999), dec!(10)))
            .unwrap_err();
        assert!(matches!(err.as_domain(), Some(DomainError::OptionNotFound { .. })));
    }
}
