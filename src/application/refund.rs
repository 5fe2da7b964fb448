//! Refunds: undo joins for some or all entries of a pool.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::info;

use super::pool_admin::transition_pool;
use super::rollover::RolloverPool;
use super::wallet::WalletLedger;
use crate::adapter::outbound::sqlite::database::model::{decimal_text, now_text, NewPayoutRow};
use crate::adapter::outbound::sqlite::{pool_store, unit::UnitOfWork};
use crate::domain::error::DomainError;
use crate::domain::id::{EntryId, OptionId, PoolId, Reference, UserId};
use crate::domain::money::Amount;
use crate::domain::policy::LedgerPolicy;
use crate::domain::pool::{EntryStatus, PayoutKind, PayoutStatus, PoolEntry, PoolStatus};
use crate::domain::wallet::{TransactionKind, TransactionMeta};
use crate::error::Result;
use crate::port::outbound::notifier::Event;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RefundedEntry {
    pub entry_id: EntryId,
    pub user_id: UserId,
    pub amount: Amount,
    pub reference: Reference,
}

/// What a refund call did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RefundReport {
    pub pool_id: PoolId,
    pub refunded_count: usize,
    pub total_refunded: Amount,
    pub entries: Vec<RefundedEntry>,
    /// Pool status after the refund.
    pub pool_status: PoolStatus,
    /// Rollover seed handed back to the rollover balance.
    pub returned_seed: Amount,
}

#[derive(Debug, Clone, Copy)]
pub struct RefundEngine {
    wallet: WalletLedger,
    rollover: RolloverPool,
}

impl RefundEngine {
    #[must_use]
    pub const fn new(policy: LedgerPolicy) -> Self {
        Self {
            wallet: WalletLedger::new(policy),
            rollover: RolloverPool::new(policy),
        }
    }

    /// Refund `entry_ids` (every active entry when `None`).
    ///
    /// Listed entries that are not active, or belong to another pool, are
    /// skipped. Once no active entries remain the pool becomes `refunded`
    /// and its rollover seed goes back to the rollover balance. Refunding
    /// nothing is not an error, which makes the call safe to repeat.
    ///
    /// # Errors
    /// - [`DomainError::PoolNotFound`] for an unknown pool
    /// - [`DomainError::InvalidTransition`] for a settled pool
    /// - any wallet or store error, which rolls the whole refund back
    pub fn refund(
        &self,
        uow: &mut UnitOfWork<'_>,
        pool_id: PoolId,
        entry_ids: Option<&[EntryId]>,
        reason: &str,
    ) -> Result<RefundReport> {
        let pool = pool_store::get_pool(uow.conn(), pool_id)?;
        if pool.status.is_settled() {
            return Err(DomainError::InvalidTransition {
                pool_id: pool_id.get(),
                from: pool.status,
                to: PoolStatus::Refunded,
            }
            .into());
        }

        let candidates: Vec<PoolEntry> = match entry_ids {
            None => pool_store::list_entries_with_status(uow.conn(), pool_id, EntryStatus::Active)?,
            Some(ids) => pool_store::find_entries(uow.conn(), pool_id, ids)?
                .into_iter()
                .filter(|e| e.status == EntryStatus::Active)
                .collect(),
        };

        let mut option_totals: HashMap<OptionId, Amount> = pool_store::list_options(uow.conn(), pool_id)?
            .into_iter()
            .map(|o| (o.id, o.total_stake))
            .collect();
        let mut refunded = Vec::with_capacity(candidates.len());
        let mut total_refunded = Decimal::ZERO;

        for entry in &candidates {
            let reference = Reference::new(format!("refund-{pool_id}-{}", entry.id));
            let meta = TransactionMeta::with_reference(reference.clone())
                .describe(reason)
                .metadata(serde_json::json!({
                    "pool_id": pool_id.get(),
                    "entry_id": entry.id.get(),
                }));
            self.wallet
                .credit(uow, &entry.user_id, entry.amount, TransactionKind::Refund, meta)?;
            pool_store::set_entry_status(uow.conn(), entry.id, EntryStatus::Refunded)?;
            pool_store::insert_payout(
                uow.conn(),
                &NewPayoutRow {
                    pool_id: pool_id.get(),
                    entry_id: entry.id.get(),
                    user_id: entry.user_id.to_string(),
                    kind: PayoutKind::Refund.as_str().to_string(),
                    amount: decimal_text(entry.amount),
                    txn_ref: reference.to_string(),
                    status: PayoutStatus::Completed.as_str().to_string(),
                    reason: Some(reason.to_string()),
                    created_at: now_text(),
                },
            )?;

            if let Some(total) = option_totals.get_mut(&entry.option_id) {
                *total = (*total - entry.amount).max(Decimal::ZERO);
                pool_store::update_option_total(uow.conn(), entry.option_id, *total)?;
            }
            pool_store::decrement_participants(uow.conn(), pool_id, entry.option_id)?;

            total_refunded += entry.amount;
            refunded.push(RefundedEntry {
                entry_id: entry.id,
                user_id: entry.user_id.clone(),
                amount: entry.amount,
                reference,
            });
        }

        if !refunded.is_empty() {
            pool_store::update_pool_totals(
                uow.conn(),
                pool_id,
                (pool.total_stake - total_refunded).max(Decimal::ZERO),
                (pool.total_pool_amount - total_refunded).max(Decimal::ZERO),
            )?;
        }

        let remaining =
            pool_store::count_entries_with_status(uow.conn(), pool_id, EntryStatus::Active)?;
        let has_entries = !pool_store::list_entries(uow.conn(), pool_id)?.is_empty();
        let mut pool_status = pool.status;
        let mut returned_seed = Decimal::ZERO;

        if pool.status != PoolStatus::Refunded
            && remaining == 0
            && (!refunded.is_empty() || !has_entries)
        {
            let current = pool_store::get_pool(uow.conn(), pool_id)?;
            if current.rollover_seed > Decimal::ZERO {
                self.rollover.add(uow, current.rollover_seed)?;
                pool_store::clear_rollover_seed(uow.conn(), &current)?;
                returned_seed = current.rollover_seed;
            }
            transition_pool(uow, &current, PoolStatus::Refunded)?;
            pool_status = PoolStatus::Refunded;
        }

        info!(
            %pool_id,
            refunded_count = refunded.len(),
            %total_refunded,
            %returned_seed,
            status = %pool_status,
            reason,
            "Refund processed"
        );
        if !refunded.is_empty() || pool_status != pool.status {
            uow.publish(Event::PoolRefunded {
                pool_id,
                refunded_count: refunded.len(),
                total_refunded,
            });
        }

        Ok(RefundReport {
            pool_id,
            refunded_count: refunded.len(),
            total_refunded,
            entries: refunded,
            pool_status,
            returned_seed,
        })
    }
}
