//! Wallets and the append-only transaction log.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use super::error::DomainError;
use super::id::{Reference, UserId, WalletId};
use super::money::{checked_add, Amount};

text_enum! {
    /// Wallet lifecycle state.
    pub enum WalletStatus {
        Active => "active",
        /// Debits are refused; credits still land.
        Frozen => "frozen",
    }
}

text_enum! {
    /// What a ledger transaction was for.
    pub enum TransactionKind {
        Deposit => "deposit",
        Withdrawal => "withdrawal",
        PoolEntry => "pool_entry",
        PoolPayout => "pool_payout",
        Refund => "refund",
        AdminCredit => "admin_credit",
        AdminDebit => "admin_debit",
        Reversal => "reversal",
    }
}

impl TransactionKind {
    /// Whether a wallet reversal may undo this movement. Pool money is
    /// tied to entry and payout rows and only moves back through a refund.
    #[must_use]
    pub fn is_reversible(self) -> bool {
        matches!(
            self,
            Self::Deposit | Self::Withdrawal | Self::AdminCredit | Self::AdminDebit
        )
    }
}

text_enum! {
    /// Transaction status. Only `Completed -> Reversed` is ever applied.
    pub enum TransactionStatus {
        Completed => "completed",
        Reversed => "reversed",
    }
}

/// Direction of a balance movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Debit,
    Credit,
}

impl Direction {
    /// Apply the movement to a balance.
    ///
    /// # Errors
    /// Returns [`DomainError::InvalidAmount`] if a credit would overflow.
    pub fn apply(self, balance: Amount, amount: Amount) -> Result<Amount, DomainError> {
        match self {
            Self::Debit => Ok(balance - amount),
            Self::Credit => checked_add(balance, amount),
        }
    }

    #[must_use]
    pub fn opposite(self) -> Self {
        match self {
            Self::Debit => Self::Credit,
            Self::Credit => Self::Debit,
        }
    }
}

/// A user's wallet.
#[derive(Debug, Clone, Serialize)]
pub struct Wallet {
    pub id: WalletId,
    pub user_id: UserId,
    pub balance: Amount,
    pub reserved_balance: Amount,
    pub status: WalletStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Wallet {
    #[must_use]
    pub fn is_frozen(&self) -> bool {
        self.status == WalletStatus::Frozen
    }
}

/// One immutable row of the wallet ledger.
#[derive(Debug, Clone, Serialize)]
pub struct LedgerTransaction {
    pub id: i64,
    pub wallet_id: WalletId,
    pub kind: TransactionKind,
    pub amount: Amount,
    pub balance_before: Amount,
    pub balance_after: Amount,
    pub reference: Reference,
    pub status: TransactionStatus,
    pub description: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

impl LedgerTransaction {
    /// Whether this row moved money into or out of the wallet.
    #[must_use]
    pub fn direction(&self) -> Direction {
        if self.balance_after >= self.balance_before {
            Direction::Credit
        } else {
            Direction::Debit
        }
    }

    /// Signed effect of this row on the wallet balance.
    #[must_use]
    pub fn signed_amount(&self) -> Decimal {
        self.balance_after - self.balance_before
    }
}

/// Optional caller context attached to a ledger movement.
#[derive(Debug, Clone, Default)]
pub struct TransactionMeta {
    /// Caller-supplied reference; generated when absent.
    pub reference: Option<Reference>,
    pub description: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

impl TransactionMeta {
    #[must_use]
    pub fn with_reference(reference: Reference) -> Self {
        Self {
            reference: Some(reference),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Result of a successful debit or credit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BalanceChange {
    pub transaction_id: i64,
    pub balance_before: Amount,
    pub balance_after: Amount,
    pub reference: Reference,
}

/// Outcome of replaying a wallet's transaction log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplayReport {
    pub stored_balance: Amount,
    pub replayed_balance: Amount,
    pub transactions: usize,
}

impl ReplayReport {
    /// Stored balance agrees with the log.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.stored_balance == self.replayed_balance
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn kinds_roundtrip_through_text() {
        for kind in [
            TransactionKind::Deposit,
            TransactionKind::PoolEntry,
            TransactionKind::PoolPayout,
            TransactionKind::Reversal,
        ] {
            assert_eq!(kind.as_str().parse::<TransactionKind>(), Ok(kind));
        }
        assert!("bogus".parse::<TransactionKind>().is_err());
    }

    #[test]
    fn direction_applies_and_flips() {
        assert_eq!(Direction::Debit.apply(dec!(10), dec!(4)).unwrap(), dec!(6));
        assert_eq!(Direction::Credit.apply(dec!(10), dec!(4)).unwrap(), dec!(14));
        assert!(Direction::Credit.apply(Decimal::MAX, dec!(4)).is_err());
        assert_eq!(Direction::Debit.opposite(), Direction::Credit);
    }

    #[test]
    fn transaction_meta_builder() {
        let meta = TransactionMeta::with_reference(Reference::from("ext-1"))
            .describe("gateway deposit")
            .metadata(serde_json::json!({"gateway": "test"}));

        assert_eq!(meta.reference.unwrap().as_str(), "ext-1");
        assert_eq!(meta.description.as_deref(), Some("gateway deposit"));
        assert!(meta.metadata.is_some());
    }
}
