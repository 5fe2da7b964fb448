//! Domain errors for money movement and pool lifecycle rules.
//!
//! These are the failures a caller can act on: bad input, a wallet that
//! cannot cover a stake, a pool in the wrong state, a reference that was
//! already spent. They abort the enclosing unit of work and surface to the
//! caller unchanged.
//!
//! # Examples
//!
//! ```
//! use parimutuel::domain::error::DomainError;
//! use parimutuel::domain::money::validate_amount;
//! use rust_decimal_macros::dec;
//!
//! let result = validate_amount(dec!(-5), 2);
//! assert!(matches!(result, Err(DomainError::InvalidAmount { .. })));
//! ```

use rust_decimal::Decimal;
use thiserror::Error;

use super::pool::PoolStatus;

/// Errors that occur when ledger or pool invariants would be violated.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Amount is zero, negative, or finer than the ledger's minor units.
    #[error("invalid amount {amount}: {reason}")]
    InvalidAmount {
        /// The rejected amount.
        amount: Decimal,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// Wallet balance cannot cover a debit.
    #[error("insufficient balance: available {available}, requested {requested}")]
    InsufficientBalance {
        /// Balance at the time of the debit.
        available: Decimal,
        /// Amount the caller tried to debit.
        requested: Decimal,
    },

    #[error("wallet not found for user {user_id}")]
    WalletNotFound { user_id: String },

    #[error("wallet for user {user_id} is frozen")]
    WalletFrozen { user_id: String },

    /// Reference was already consumed within the given scope.
    #[error("duplicate reference '{reference}' in scope {scope}")]
    DuplicateReference { reference: String, scope: String },

    #[error("user {user_id} already joined pool {pool_id}")]
    AlreadyJoined { user_id: String, pool_id: i64 },

    #[error("pool {pool_id} is not open for entries ({reason})")]
    PoolNotOpen { pool_id: i64, reason: String },

    #[error("amount {amount} is below the pool minimum entry {min_entry}")]
    AmountBelowMinimum { amount: Decimal, min_entry: Decimal },

    #[error("pool {pool_id} not found")]
    PoolNotFound { pool_id: i64 },

    #[error("option {option_id} not found in pool {pool_id}")]
    OptionNotFound { pool_id: i64, option_id: i64 },

    #[error("pool entry {entry_id} not found")]
    EntryNotFound { entry_id: i64 },

    #[error("transaction '{reference}' not found")]
    TransactionNotFound { reference: String },

    /// Only wallet-level movements can be reversed; pool money goes back
    /// through a refund.
    #[error("transaction '{reference}' of kind {kind} cannot be reversed")]
    NotReversible { reference: String, kind: String },

    /// Pool cannot move between the two states.
    #[error("pool {pool_id} cannot move from {from} to {to}")]
    InvalidTransition {
        pool_id: i64,
        from: PoolStatus,
        to: PoolStatus,
    },

    /// Pool definition rejected at creation time.
    #[error("invalid pool: {0}")]
    InvalidPool(String),
}
