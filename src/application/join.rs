//! Stake collection into a pool option.
//!
//! A join is one unit: claim the reference, debit the wallet, insert the
//! entry, bump option and pool totals, bump the participant summary. Any
//! failure leaves no trace of the attempt.

use chrono::Utc;
use serde::Serialize;
use tracing::info;

use super::idempotency::{IdempotencyGuard, ReferenceScope};
use super::pool_admin::require_option;
use super::wallet::WalletLedger;
use crate::adapter::outbound::sqlite::database::model::{decimal_text, now_text, NewEntryRow};
use crate::adapter::outbound::sqlite::{pool_store, unit::UnitOfWork};
use crate::domain::error::DomainError;
use crate::domain::id::{EntryId, OptionId, PoolId, Reference, UserId};
use crate::domain::money::{checked_add, validate_amount, Amount};
use crate::domain::policy::LedgerPolicy;
use crate::domain::pool::{EntryStatus, OptionStatus, Pool, PoolStatus};
use crate::domain::wallet::{TransactionKind, TransactionMeta};
use crate::error::Result;
use crate::port::outbound::notifier::{Event, JoinEvent};

/// Result of a successful join.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JoinReceipt {
    pub entry_id: EntryId,
    pub reference: Reference,
    pub balance_after: Amount,
}

#[derive(Debug, Clone, Copy)]
pub struct PoolJoinEngine {
    policy: LedgerPolicy,
    wallet: WalletLedger,
    guard: IdempotencyGuard,
}

impl PoolJoinEngine {
    #[must_use]
    pub const fn new(policy: LedgerPolicy) -> Self {
        Self {
            policy,
            wallet: WalletLedger::new(policy),
            guard: IdempotencyGuard::new(),
        }
    }

    /// Stake `amount` from `user_id` on `option_id`.
    ///
    /// `reference` is the caller's idempotency key; one is generated when
    /// absent. A replayed key fails instead of charging twice.
    ///
    /// # Errors
    /// - [`DomainError::PoolNotFound`] / [`DomainError::OptionNotFound`]
    /// - [`DomainError::PoolNotOpen`] if the pool is not open or past its closing date
    /// - [`DomainError::AmountBelowMinimum`] below the pool's minimum entry
    /// - [`DomainError::AlreadyJoined`] if the user already holds an entry
    /// - [`DomainError::DuplicateReference`] for a replayed reference
    /// - any [`WalletLedger::debit`] error
    pub fn join(
        &self,
        uow: &mut UnitOfWork<'_>,
        user_id: &UserId,
        pool_id: PoolId,
        option_id: OptionId,
        amount: Amount,
        reference: Option<Reference>,
    ) -> Result<JoinReceipt> {
        let amount = validate_amount(amount, self.policy.minor_units)?;
        let pool = pool_store::get_pool(uow.conn(), pool_id)?;
        ensure_open(&pool)?;

        let option = require_option(uow.conn(), pool_id, option_id)?;
        if option.status != OptionStatus::Active {
            return Err(DomainError::OptionNotFound {
                pool_id: pool_id.get(),
                option_id: option_id.get(),
            }
            .into());
        }
        if amount < pool.min_entry {
            return Err(DomainError::AmountBelowMinimum {
                amount,
                min_entry: pool.min_entry,
            }
            .into());
        }
        if pool_store::find_entry_for_user(uow.conn(), pool_id, user_id)?.is_some() {
            return Err(DomainError::AlreadyJoined {
                user_id: user_id.to_string(),
                pool_id: pool_id.get(),
            }
            .into());
        }

        let option_total = checked_add(option.total_stake, amount)?;
        let pool_stake = checked_add(pool.total_stake, amount)?;
        let pool_total = checked_add(pool.total_pool_amount, amount)?;

        let reference = reference.unwrap_or_else(|| Reference::generate("pool_entry"));
        self.guard
            .ensure_unique(uow, &reference, ReferenceScope::PoolEntry)?;

        let meta = TransactionMeta::with_reference(reference.clone())
            .describe(format!("Entry into pool {pool_id}"))
            .metadata(serde_json::json!({
                "pool_id": pool_id.get(),
                "option_id": option_id.get(),
            }));
        let change = self
            .wallet
            .debit(uow, user_id, amount, TransactionKind::PoolEntry, meta)?;

        let now = now_text();
        let entry_id = pool_store::insert_entry(
            uow.conn(),
            &NewEntryRow {
                pool_id: pool_id.get(),
                option_id: option_id.get(),
                user_id: user_id.to_string(),
                amount: decimal_text(amount),
                reference: reference.to_string(),
                status: EntryStatus::Active.as_str().to_string(),
                created_at: now.clone(),
                updated_at: now,
            },
        )?;
        pool_store::update_option_total(uow.conn(), option_id, option_total)?;
        pool_store::update_pool_totals(uow.conn(), pool_id, pool_stake, pool_total)?;
        pool_store::increment_participants(uow.conn(), pool_id, option_id)?;

        info!(
            %user_id,
            %pool_id,
            %option_id,
            %entry_id,
            %amount,
            %reference,
            "Pool joined"
        );
        uow.publish(Event::PoolJoined(JoinEvent {
            pool_id,
            option_id,
            entry_id,
            user_id: user_id.clone(),
            amount,
        }));

        Ok(JoinReceipt {
            entry_id,
            reference,
            balance_after: change.balance_after,
        })
    }
}

fn ensure_open(pool: &Pool) -> Result<()> {
    let reason = if pool.status != PoolStatus::Open {
        format!("status is {}", pool.status)
    } else if Utc::now() >= pool.closing_date {
        format!("closed at {}", pool.closing_date.to_rfc3339())
    } else {
        return Ok(());
    };
    Err(DomainError::PoolNotOpen {
        pool_id: pool.id.get(),
        reason,
    }
    .into())
}
