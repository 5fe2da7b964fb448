//! Pool settlement: company cut, proportional payouts, rollover.
//!
//! Settlement is one unit of work. It either writes the snapshot, every
//! winner credit, and the terminal status together, or nothing at all.
//! Re-running it against a settled pool returns the stored snapshot, so a
//! retried job can never pay twice.

use chrono::Utc;
use diesel::SqliteConnection;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::pool_admin::{require_option, transition_pool};
use super::rollover::RolloverPool;
use super::wallet::WalletLedger;
use crate::adapter::outbound::sqlite::database::model::{decimal_text, now_text, NewPayoutRow};
use crate::adapter::outbound::sqlite::{pool_store, unit::UnitOfWork};
use crate::domain::error::DomainError;
use crate::domain::id::{OptionId, PoolId, Reference};
use crate::domain::payout::{proportional_shares, SettlementTerms};
use crate::domain::policy::LedgerPolicy;
use crate::domain::pool::{
    EntryStatus, PayoutKind, PayoutStatus, Pool, PoolEntry, PoolLedger, PoolPayout, PoolStatus,
    SettlementKind,
};
use crate::domain::wallet::{TransactionKind, TransactionMeta};
use crate::error::{Error, Result};
use crate::port::outbound::notifier::{Event, SettlementEvent};

/// What a settle call did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "ledger", rename_all = "snake_case")]
pub enum SettlementOutcome {
    /// Winners were paid.
    Settled(PoolLedger),
    /// Nobody won; the payout pool went to the rollover balance.
    RolledOver(PoolLedger),
    /// The pool was already settled; nothing was written.
    AlreadySettled(PoolLedger),
}

impl SettlementOutcome {
    #[must_use]
    pub fn ledger(&self) -> &PoolLedger {
        match self {
            Self::Settled(l) | Self::RolledOver(l) | Self::AlreadySettled(l) => l,
        }
    }

    #[must_use]
    pub fn is_already_settled(&self) -> bool {
        matches!(self, Self::AlreadySettled(_))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SettlementEngine {
    policy: LedgerPolicy,
    wallet: WalletLedger,
    rollover: RolloverPool,
}

impl SettlementEngine {
    #[must_use]
    pub const fn new(policy: LedgerPolicy) -> Self {
        Self {
            policy,
            wallet: WalletLedger::new(policy),
            rollover: RolloverPool::new(policy),
        }
    }

    /// Settle `pool_id` in favour of `winning_option_id`.
    ///
    /// `None`, or a winning option without active entries, rolls the payout
    /// pool over. An `open` pool is locked first.
    ///
    /// # Errors
    /// - [`DomainError::PoolNotFound`] / [`DomainError::OptionNotFound`]
    /// - [`DomainError::InvalidTransition`] for a refunded pool
    /// - any wallet or store error, which rolls the whole settlement back
    pub fn settle(
        &self,
        uow: &mut UnitOfWork<'_>,
        pool_id: PoolId,
        winning_option_id: Option<OptionId>,
    ) -> Result<SettlementOutcome> {
        let mut pool = pool_store::get_pool(uow.conn(), pool_id)?;

        if pool.status.is_settled() {
            let ledger = pool_store::find_ledger(uow.conn(), pool_id)?.ok_or_else(|| {
                Error::Integrity(format!(
                    "pool {pool_id} is {} but has no settlement snapshot",
                    pool.status
                ))
            })?;
            debug!(%pool_id, "Pool already settled");
            return Ok(SettlementOutcome::AlreadySettled(ledger));
        }
        if pool.status == PoolStatus::Refunded {
            return Err(DomainError::InvalidTransition {
                pool_id: pool_id.get(),
                from: pool.status,
                to: PoolStatus::Settled,
            }
            .into());
        }
        if pool.status == PoolStatus::Open {
            transition_pool(uow, &pool, PoolStatus::Locked)?;
            pool.status = PoolStatus::Locked;
        }
        if let Some(option_id) = winning_option_id {
            require_option(uow.conn(), pool_id, option_id)?;
        }

        let pct = pool.resolve_company_cut(self.policy.default_company_cut_percent);
        let terms = SettlementTerms::compute(pool.total_pool_amount, pct, self.policy.minor_units)?;
        let active = pool_store::list_entries_with_status(uow.conn(), pool_id, EntryStatus::Active)?;
        let winners: Vec<PoolEntry> = match winning_option_id {
            Some(option_id) => active
                .into_iter()
                .filter(|e| e.option_id == option_id)
                .collect(),
            None => Vec::new(),
        };

        if winners.is_empty() {
            self.roll_over(uow, &pool, winning_option_id, terms)
        } else {
            let winner = winning_option_id.ok_or_else(|| {
                Error::Integrity(format!("pool {pool_id} has winners but no winning option"))
            })?;
            self.pay_winners(uow, &pool, winner, &winners, terms)
        }
    }

    fn roll_over(
        &self,
        uow: &mut UnitOfWork<'_>,
        pool: &Pool,
        winning_option_id: Option<OptionId>,
        terms: SettlementTerms,
    ) -> Result<SettlementOutcome> {
        let lost = pool_store::settle_active_entries(uow.conn(), pool.id, EntryStatus::Lost)?;
        if terms.payout_pool > Decimal::ZERO {
            self.rollover.add(uow, terms.payout_pool)?;
        }

        let ledger = PoolLedger {
            pool_id: pool.id,
            outcome: SettlementKind::Rollover,
            total_pool: terms.total_pool,
            company_cut_percent: terms.company_cut_percent,
            company_cut: terms.company_cut,
            payout_pool: terms.payout_pool,
            winning_option_id,
            total_winning_stake: Decimal::ZERO,
            total_winners: 0,
            total_payouts: Decimal::ZERO,
            rollover_amount: terms.payout_pool,
            created_at: Utc::now(),
        };
        pool_store::insert_ledger(uow.conn(), &ledger)?;
        transition_pool(uow, pool, PoolStatus::Rollover)?;

        info!(
            pool_id = %pool.id,
            total_pool = %terms.total_pool,
            company_cut = %terms.company_cut,
            rollover_amount = %terms.payout_pool,
            lost_entries = lost,
            "Pool rolled over"
        );
        publish_settled(uow, &ledger);
        Ok(SettlementOutcome::RolledOver(ledger))
    }

    fn pay_winners(
        &self,
        uow: &mut UnitOfWork<'_>,
        pool: &Pool,
        winner: OptionId,
        winners: &[PoolEntry],
        terms: SettlementTerms,
    ) -> Result<SettlementOutcome> {
        let stakes: Vec<_> = winners.iter().map(|e| (e.id, e.amount)).collect();
        let total_winning_stake: Decimal = stakes.iter().map(|(_, stake)| *stake).sum();
        let shares = proportional_shares(&stakes, terms.payout_pool, self.policy.minor_units)?;

        let mut total_payouts = Decimal::ZERO;
        for (entry, share) in winners.iter().zip(&shares) {
            let txn_ref = Reference::new(format!("payout-{}-{}", pool.id, entry.id));
            // Half-up rounding can overshoot; later shares take the shortfall.
            let amount = share.amount.min(terms.payout_pool - total_payouts);
            let (status, reason) = if amount > Decimal::ZERO {
                let meta = TransactionMeta::with_reference(txn_ref.clone())
                    .describe(format!("Winnings from pool {}", pool.id))
                    .metadata(serde_json::json!({
                        "pool_id": pool.id.get(),
                        "entry_id": entry.id.get(),
                        "stake": entry.amount.to_string(),
                    }));
                self.wallet.credit(
                    uow,
                    &entry.user_id,
                    amount,
                    TransactionKind::PoolPayout,
                    meta,
                )?;
                total_payouts += amount;
                (PayoutStatus::Completed, None)
            } else {
                warn!(pool_id = %pool.id, entry_id = %entry.id, stake = %entry.amount, "Winning share rounded to zero");
                (
                    PayoutStatus::Skipped,
                    Some("share rounded to zero".to_string()),
                )
            };

            pool_store::insert_payout(
                uow.conn(),
                &NewPayoutRow {
                    pool_id: pool.id.get(),
                    entry_id: entry.id.get(),
                    user_id: entry.user_id.to_string(),
                    kind: PayoutKind::Winning.as_str().to_string(),
                    amount: decimal_text(amount),
                    txn_ref: txn_ref.to_string(),
                    status: status.as_str().to_string(),
                    reason,
                    created_at: now_text(),
                },
            )?;
            pool_store::set_entry_status(uow.conn(), entry.id, EntryStatus::Won)?;
        }

        let lost = pool_store::settle_active_entries(uow.conn(), pool.id, EntryStatus::Lost)?;
        pool_store::eliminate_other_options(uow.conn(), pool.id, winner)?;

        let ledger = PoolLedger {
            pool_id: pool.id,
            outcome: SettlementKind::Winners,
            total_pool: terms.total_pool,
            company_cut_percent: terms.company_cut_percent,
            company_cut: terms.company_cut,
            payout_pool: terms.payout_pool,
            winning_option_id: Some(winner),
            total_winning_stake,
            total_winners: i32::try_from(winners.len()).unwrap_or(i32::MAX),
            total_payouts,
            rollover_amount: Decimal::ZERO,
            created_at: Utc::now(),
        };
        pool_store::insert_ledger(uow.conn(), &ledger)?;
        transition_pool(uow, pool, PoolStatus::Settled)?;

        info!(
            pool_id = %pool.id,
            winning_option_id = %winner,
            total_pool = %terms.total_pool,
            company_cut = %terms.company_cut,
            total_payouts = %total_payouts,
            residual = %ledger.rounding_residual(),
            winners = winners.len(),
            lost_entries = lost,
            "Pool settled"
        );
        publish_settled(uow, &ledger);
        Ok(SettlementOutcome::Settled(ledger))
    }

    /// Stored settlement snapshot, if the pool was settled.
    ///
    /// # Errors
    /// Returns a store error if the read fails.
    pub fn ledger(&self, conn: &mut SqliteConnection, pool_id: PoolId) -> Result<Option<PoolLedger>> {
        pool_store::find_ledger(conn, pool_id)
    }

    /// Winning and refund payout rows of a pool.
    ///
    /// # Errors
    /// Returns a store error if the read fails.
    pub fn payouts(&self, conn: &mut SqliteConnection, pool_id: PoolId) -> Result<Vec<PoolPayout>> {
        pool_store::list_payouts(conn, pool_id)
    }
}

fn publish_settled(uow: &mut UnitOfWork<'_>, ledger: &PoolLedger) {
    uow.publish(Event::PoolSettled(SettlementEvent {
        pool_id: ledger.pool_id,
        outcome: ledger.outcome,
        total_winners: ledger.total_winners,
        total_payouts: ledger.total_payouts,
        rollover_amount: ledger.rollover_amount,
    }));
}
