//! Wallet ledger: the single path through which balances move.
//!
//! Every debit or credit is a read-modify-write of the wallet row plus one
//! appended [`LedgerTransaction`], both inside the caller's unit of work.
//! The unit holds the database write lock from its first statement, so the
//! balance read here cannot go stale before the write.

use diesel::SqliteConnection;
use rust_decimal::Decimal;
use tracing::{debug, info};

use super::idempotency::{IdempotencyGuard, ReferenceScope};
use crate::adapter::outbound::sqlite::database::model::{decimal_text, now_text, NewTransactionRow};
use crate::adapter::outbound::sqlite::{ledger_store, unit::UnitOfWork};
use crate::domain::error::DomainError;
use crate::domain::id::{Reference, UserId};
use crate::domain::money::{validate_amount, Amount};
use crate::domain::policy::LedgerPolicy;
use crate::domain::wallet::{
    BalanceChange, Direction, LedgerTransaction, ReplayReport, TransactionKind, TransactionMeta,
    TransactionStatus, Wallet, WalletStatus,
};
use crate::error::Result;
use crate::port::outbound::notifier::{BalanceEvent, Event};

/// Atomic balance mutation and the append-only transaction log.
#[derive(Debug, Clone, Copy)]
pub struct WalletLedger {
    policy: LedgerPolicy,
    guard: IdempotencyGuard,
}

impl WalletLedger {
    #[must_use]
    pub const fn new(policy: LedgerPolicy) -> Self {
        Self {
            policy,
            guard: IdempotencyGuard::new(),
        }
    }

    #[must_use]
    pub const fn policy(&self) -> LedgerPolicy {
        self.policy
    }

    /// Get the user's wallet, creating an empty one on first use.
    ///
    /// # Errors
    /// Returns a store error if the lookup or insert fails.
    pub fn open(&self, uow: &mut UnitOfWork<'_>, owner: &UserId) -> Result<Wallet> {
        if let Some(wallet) = ledger_store::find_wallet(uow.conn(), owner)? {
            return Ok(wallet);
        }
        let wallet = ledger_store::insert_wallet(uow.conn(), owner)?;
        info!(user_id = %owner, wallet_id = %wallet.id, "Wallet opened");
        Ok(wallet)
    }

    /// Take `amount` out of the owner's wallet.
    ///
    /// # Errors
    /// - [`DomainError::InvalidAmount`] for a non-positive or over-precise amount
    /// - [`DomainError::WalletNotFound`] if the owner has no wallet
    /// - [`DomainError::WalletFrozen`] if the wallet is frozen
    /// - [`DomainError::InsufficientBalance`] if the balance cannot cover it
    /// - [`DomainError::DuplicateReference`] if the reference was used before
    pub fn debit(
        &self,
        uow: &mut UnitOfWork<'_>,
        owner: &UserId,
        amount: Amount,
        kind: TransactionKind,
        meta: TransactionMeta,
    ) -> Result<BalanceChange> {
        self.apply(uow, owner, amount, kind, Direction::Debit, meta)
    }

    /// Add `amount` to the owner's wallet. Frozen wallets still accept credits.
    ///
    /// # Errors
    /// Same as [`debit`](Self::debit), minus the balance and frozen checks.
    pub fn credit(
        &self,
        uow: &mut UnitOfWork<'_>,
        owner: &UserId,
        amount: Amount,
        kind: TransactionKind,
        meta: TransactionMeta,
    ) -> Result<BalanceChange> {
        self.apply(uow, owner, amount, kind, Direction::Credit, meta)
    }

    fn apply(
        &self,
        uow: &mut UnitOfWork<'_>,
        owner: &UserId,
        amount: Amount,
        kind: TransactionKind,
        direction: Direction,
        meta: TransactionMeta,
    ) -> Result<BalanceChange> {
        let amount = validate_amount(amount, self.policy.minor_units)?;
        let wallet = self.require_wallet(uow.conn(), owner)?;

        if direction == Direction::Debit {
            if wallet.is_frozen() {
                return Err(DomainError::WalletFrozen {
                    user_id: owner.to_string(),
                }
                .into());
            }
            if wallet.balance < amount {
                return Err(DomainError::InsufficientBalance {
                    available: wallet.balance,
                    requested: amount,
                }
                .into());
            }
        }

        let balance_before = wallet.balance;
        let balance_after = direction.apply(balance_before, amount)?;
        let reference = meta
            .reference
            .unwrap_or_else(|| Reference::generate(kind.as_str()));
        let metadata = meta
            .metadata
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        ledger_store::update_wallet_balance(uow.conn(), wallet.id, balance_after)?;
        let transaction_id = ledger_store::insert_transaction(
            uow.conn(),
            &NewTransactionRow {
                wallet_id: wallet.id.get(),
                kind: kind.as_str().to_string(),
                amount: decimal_text(amount),
                balance_before: decimal_text(balance_before),
                balance_after: decimal_text(balance_after),
                reference: reference.to_string(),
                status: TransactionStatus::Completed.as_str().to_string(),
                description: meta.description,
                metadata,
                created_at: now_text(),
            },
        )?;

        debug!(
            user_id = %owner,
            %kind,
            %amount,
            %balance_before,
            %balance_after,
            %reference,
            "Balance moved"
        );
        uow.publish(Event::BalanceChanged(BalanceEvent {
            user_id: owner.clone(),
            kind,
            amount,
            balance_after,
            reference: reference.clone(),
        }));

        Ok(BalanceChange {
            transaction_id,
            balance_before,
            balance_after,
            reference,
        })
    }

    /// Undo a completed deposit, withdrawal, or admin adjustment with an
    /// opposite `reversal` movement.
    ///
    /// # Errors
    /// - [`DomainError::TransactionNotFound`] for an unknown reference
    /// - [`DomainError::NotReversible`] for pool entries, payouts, refunds,
    ///   and reversals
    /// - [`DomainError::DuplicateReference`] if it was already reversed
    /// - [`DomainError::InsufficientBalance`] if reversing a credit would
    ///   overdraw the wallet
    pub fn reverse(
        &self,
        uow: &mut UnitOfWork<'_>,
        reference: &Reference,
        reason: &str,
    ) -> Result<BalanceChange> {
        let original = ledger_store::find_transaction(uow.conn(), reference)?.ok_or_else(|| {
            DomainError::TransactionNotFound {
                reference: reference.to_string(),
            }
        })?;
        if !original.kind.is_reversible() {
            return Err(DomainError::NotReversible {
                reference: reference.to_string(),
                kind: original.kind.to_string(),
            }
            .into());
        }
        if original.status == TransactionStatus::Reversed {
            return Err(DomainError::DuplicateReference {
                reference: reference.to_string(),
                scope: ReferenceScope::Reversal.to_string(),
            }
            .into());
        }
        self.guard
            .ensure_unique(uow, reference, ReferenceScope::Reversal)?;

        let wallet = ledger_store::find_wallet_by_id(uow.conn(), original.wallet_id)?.ok_or_else(
            || DomainError::WalletNotFound {
                user_id: original.wallet_id.to_string(),
            },
        )?;
        let meta = TransactionMeta::with_reference(Reference::new(format!("reversal-{reference}")))
            .describe(reason)
            .metadata(serde_json::json!({ "reverses": reference.as_str() }));

        let change = self.apply(
            uow,
            &wallet.user_id,
            original.amount,
            TransactionKind::Reversal,
            original.direction().opposite(),
            meta,
        )?;
        ledger_store::set_transaction_status(uow.conn(), original.id, TransactionStatus::Reversed)?;

        info!(%reference, user_id = %wallet.user_id, amount = %original.amount, reason, "Transaction reversed");
        Ok(change)
    }

    /// Freeze or unfreeze a wallet.
    ///
    /// # Errors
    /// Returns [`DomainError::WalletNotFound`] if the owner has no wallet.
    pub fn set_status(
        &self,
        uow: &mut UnitOfWork<'_>,
        owner: &UserId,
        status: WalletStatus,
    ) -> Result<()> {
        let wallet = self.require_wallet(uow.conn(), owner)?;
        ledger_store::set_wallet_status(uow.conn(), wallet.id, status)?;
        info!(user_id = %owner, %status, "Wallet status changed");
        Ok(())
    }

    /// Wallet of `owner`.
    ///
    /// # Errors
    /// Returns [`DomainError::WalletNotFound`] if the owner has no wallet.
    pub fn wallet(&self, conn: &mut SqliteConnection, owner: &UserId) -> Result<Wallet> {
        self.require_wallet(conn, owner)
    }

    /// Current balance of `owner`.
    ///
    /// # Errors
    /// Returns [`DomainError::WalletNotFound`] if the owner has no wallet.
    pub fn balance(&self, conn: &mut SqliteConnection, owner: &UserId) -> Result<Amount> {
        Ok(self.require_wallet(conn, owner)?.balance)
    }

    /// Most recent transactions, newest first.
    ///
    /// # Errors
    /// Returns [`DomainError::WalletNotFound`] if the owner has no wallet.
    pub fn history(
        &self,
        conn: &mut SqliteConnection,
        owner: &UserId,
        limit: i64,
    ) -> Result<Vec<LedgerTransaction>> {
        let wallet = self.require_wallet(conn, owner)?;
        ledger_store::recent_transactions(conn, wallet.id, limit)
    }

    /// Recompute the balance from the transaction log.
    ///
    /// # Errors
    /// Returns [`DomainError::WalletNotFound`] if the owner has no wallet.
    pub fn replay(&self, conn: &mut SqliteConnection, owner: &UserId) -> Result<ReplayReport> {
        let wallet = self.require_wallet(conn, owner)?;
        let transactions = ledger_store::list_transactions(conn, wallet.id)?;
        let replayed_balance = transactions
            .iter()
            .fold(Decimal::ZERO, |balance, txn| balance + txn.signed_amount());
        Ok(ReplayReport {
            stored_balance: wallet.balance,
            replayed_balance,
            transactions: transactions.len(),
        })
    }

    fn require_wallet(&self, conn: &mut SqliteConnection, owner: &UserId) -> Result<Wallet> {
        ledger_store::find_wallet(conn, owner)?.ok_or_else(|| {
            DomainError::WalletNotFound {
                user_id: owner.to_string(),
            }
            .into()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::db::TempDb;
    use rust_decimal_macros::dec;

    fn ledger() -> WalletLedger {
        WalletLedger::new(LedgerPolicy::default())
    }

    fn funded(db: &crate::adapter::outbound::sqlite::unit::Database, user: &str, amount: Amount) {
        let ledger = ledger();
        db.unit(|uow| {
            let owner = UserId::from(user);
            ledger.open(uow, &owner)?;
            ledger.credit(uow, &owner, amount, TransactionKind::Deposit, TransactionMeta::default())
        })
        .unwrap();
    }

    #[test]
    fn credit_then_debit_updates_balance_and_log() {
        let temp = TempDb::create("wallet-basic");
        let db = temp.database();
        let ledger = ledger();
        let alice = UserId::from("alice");
        funded(&db, "alice", dec!(100));

        let change = db
            .unit(|uow| {
                ledger.debit(
                    uow,
                    &alice,
                    dec!(30.25),
                    TransactionKind::PoolEntry,
                    TransactionMeta::default(),
                )
            })
            .unwrap();

        assert_eq!(change.balance_before, dec!(100));
        assert_eq!(change.balance_after, dec!(69.75));
        assert!(change.reference.as_str().starts_with("pool_entry-"));

        let history = db.read(|conn| ledger.history(conn, &alice, 10)).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].kind, TransactionKind::PoolEntry);
        assert_eq!(history[0].balance_after, dec!(69.75));
    }

    #[test]
    fn debit_beyond_balance_is_rejected_and_nothing_changes() {
        let temp = TempDb::create("wallet-insufficient");
        let db = temp.database();
        let ledger = ledger();
        let alice = UserId::from("alice");
        funded(&db, "alice", dec!(10));

        let err = db
            .unit(|uow| {
                ledger.debit(uow, &alice, dec!(10.01), TransactionKind::Withdrawal, TransactionMeta::default())
            })
            .unwrap_err();

        assert!(matches!(
            err.as_domain(),
            Some(DomainError::InsufficientBalance { available, requested })
                if *available == dec!(10) && *requested == dec!(10.01)
        ));
        assert_eq!(db.read(|conn| ledger.balance(conn, &alice)).unwrap(), dec!(10));
    }

    #[test]
    fn invalid_amounts_are_rejected() {
        let temp = TempDb::create("wallet-invalid");
        let db = temp.database();
        let ledger = ledger();
        let alice = UserId::from("alice");
        funded(&db, "alice", dec!(10));

        for amount in [Decimal::ZERO, dec!(-1), dec!(0.001)] {
            let err = db
                .unit(|uow| {
                    ledger.credit(uow, &alice, amount, TransactionKind::AdminCredit, TransactionMeta::default())
                })
                .unwrap_err();
            assert!(matches!(err.as_domain(), Some(DomainError::InvalidAmount { .. })));
        }
    }

    #[test]
    fn unknown_wallet_is_not_found() {
        let temp = TempDb::create("wallet-missing");
        let db = temp.database();
        let ledger = ledger();

        let err = db
            .unit(|uow| {
                ledger.credit(uow, &UserId::from("ghost"), dec!(1), TransactionKind::Deposit, TransactionMeta::default())
            })
            .unwrap_err();
        assert!(matches!(err.as_domain(), Some(DomainError::WalletNotFound { .. })));
    }

    #[test]
    fn frozen_wallet_blocks_debits_but_accepts_credits() {
        let temp = TempDb::create("wallet-frozen");
        let db = temp.database();
        let ledger = ledger();
        let alice = UserId::from("alice");
        funded(&db, "alice", dec!(50));
        db.unit(|uow| ledger.set_status(uow, &alice, WalletStatus::Frozen))
            .unwrap();

        let err = db
            .unit(|uow| {
                ledger.debit(uow, &alice, dec!(5), TransactionKind::Withdrawal, TransactionMeta::default())
            })
            .unwrap_err();
        assert!(matches!(err.as_domain(), Some(DomainError::WalletFrozen { .. })));

        db.unit(|uow| {
            ledger.credit(uow, &alice, dec!(5), TransactionKind::AdminCredit, TransactionMeta::default())
        })
        .unwrap();
        assert_eq!(db.read(|conn| ledger.balance(conn, &alice)).unwrap(), dec!(55));
    }

    #[test]
    fn reused_reference_is_a_duplicate() {
        let temp = TempDb::create("wallet-dup-ref");
        let db = temp.database();
        let ledger = ledger();
        let alice = UserId::from("alice");
        funded(&db, "alice", dec!(50));
        let meta = || TransactionMeta::with_reference(Reference::from("fixed-ref"));

        db.unit(|uow| ledger.credit(uow, &alice, dec!(1), TransactionKind::AdminCredit, meta()))
            .unwrap();
        let err = db
            .unit(|uow| ledger.credit(uow, &alice, dec!(1), TransactionKind::AdminCredit, meta()))
            .unwrap_err();

        assert!(matches!(err.as_domain(), Some(DomainError::DuplicateReference { .. })));
        assert_eq!(db.read(|conn| ledger.balance(conn, &alice)).unwrap(), dec!(51));
    }

    #[test]
    fn reverse_restores_balance_once() {
        let temp = TempDb::create("wallet-reverse");
        let db = temp.database();
        let ledger = ledger();
        let alice = UserId::from("alice");
        funded(&db, "alice", dec!(50));

        let debit = db
            .unit(|uow| {
                ledger.debit(uow, &alice, dec!(20), TransactionKind::AdminDebit, TransactionMeta::default())
            })
            .unwrap();
        let reversal = db
            .unit(|uow| ledger.reverse(uow, &debit.reference, "operator error"))
            .unwrap();
        assert_eq!(reversal.balance_after, dec!(50));

        let again = db
            .unit(|uow| ledger.reverse(uow, &debit.reference, "operator error"))
            .unwrap_err();
        assert!(matches!(again.as_domain(), Some(DomainError::DuplicateReference { .. })));

        let report = db.read(|conn| ledger.replay(conn, &alice)).unwrap();
        assert!(report.is_consistent());
        assert_eq!(report.transactions, 3);
    }

    #[test]
    fn pool_money_and_reversals_cannot_be_reversed() {
        let temp = TempDb::create("wallet-reverse-kinds");
        let db = temp.database();
        let ledger = ledger();
        let alice = UserId::from("alice");
        funded(&db, "alice", dec!(100));

        let entry = db
            .unit(|uow| {
                ledger.debit(uow, &alice, dec!(40), TransactionKind::PoolEntry, TransactionMeta::default())
            })
            .unwrap();
        let payout = db
            .unit(|uow| {
                ledger.credit(uow, &alice, dec!(15), TransactionKind::PoolPayout, TransactionMeta::default())
            })
            .unwrap();
        let refund = db
            .unit(|uow| {
                ledger.credit(uow, &alice, dec!(5), TransactionKind::Refund, TransactionMeta::default())
            })
            .unwrap();
        let adjustment = db
            .unit(|uow| {
                ledger.credit(uow, &alice, dec!(1), TransactionKind::AdminCredit, TransactionMeta::default())
            })
            .unwrap();
        let reversal = db
            .unit(|uow| ledger.reverse(uow, &adjustment.reference, "typo"))
            .unwrap();

        for reference in [entry.reference, payout.reference, refund.reference, reversal.reference] {
            let err = db
                .unit(|uow| ledger.reverse(uow, &reference, "chargeback"))
                .unwrap_err();
            assert!(
                matches!(err.as_domain(), Some(DomainError::NotReversible { .. })),
                "{reference}"
            );
        }
        assert_eq!(db.read(|conn| ledger.balance(conn, &alice)).unwrap(), dec!(80));
        assert!(db.read(|conn| ledger.replay(conn, &alice)).unwrap().is_consistent());
    }

    #[test]
    fn reverse_of_unknown_reference_is_not_found() {
        let temp = TempDb::create("wallet-reverse-missing");
        let db = temp.database();

        let err = db
            .unit(|uow| ledger().reverse(uow, &Reference::from("nope"), "x"))
            .unwrap_err();
        assert!(matches!(err.as_domain(), Some(DomainError::TransactionNotFound { .. })));
    }

    #[test]
    fn open_is_get_or_create() {
        let temp = TempDb::create("wallet-open");
        let db = temp.database();
        let ledger = ledger();
        let bob = UserId::from("bob");

        let first = db.unit(|uow| ledger.open(uow, &bob)).unwrap();
        let second = db.unit(|uow| ledger.open(uow, &bob)).unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(second.balance, Decimal::ZERO);
    }
}
