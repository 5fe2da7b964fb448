//! Wallet, transaction-log, reference, and rollover tables.
//!
//! Callers are expected to hold the unit-of-work lock; these functions do
//! no locking of their own.

use diesel::prelude::*;
use diesel::SqliteConnection;
use rust_decimal::Decimal;

use super::database::model::{
    decimal_text, now_text, parse_decimal, NewReferenceRow, NewTransactionRow, NewWalletRow,
    RolloverRow, TransactionRow, WalletRow,
};
use super::database::schema::{ledger_transactions, rollover_balance, used_references, wallets};
use super::{is_unique_violation, last_insert_id};
use crate::domain::error::DomainError;
use crate::domain::id::{Reference, UserId, WalletId};
use crate::domain::wallet::{LedgerTransaction, TransactionStatus, Wallet, WalletStatus};
use crate::error::{Error, Result};

/// Row id of the rollover singleton.
const ROLLOVER_ROW_ID: i64 = 1;

pub fn find_wallet(conn: &mut SqliteConnection, user_id: &UserId) -> Result<Option<Wallet>> {
    let row: Option<WalletRow> = wallets::table
        .filter(wallets::user_id.eq(user_id.as_str()))
        .select(WalletRow::as_select())
        .first(conn)
        .optional()?;
    row.map(Wallet::try_from).transpose()
}

pub fn find_wallet_by_id(conn: &mut SqliteConnection, id: WalletId) -> Result<Option<Wallet>> {
    let row: Option<WalletRow> = wallets::table
        .find(id.get())
        .select(WalletRow::as_select())
        .first(conn)
        .optional()?;
    row.map(Wallet::try_from).transpose()
}

/// Insert an empty active wallet for `user_id`.
pub fn insert_wallet(conn: &mut SqliteConnection, user_id: &UserId) -> Result<Wallet> {
    let now = now_text();
    diesel::insert_into(wallets::table)
        .values(&NewWalletRow {
            user_id: user_id.to_string(),
            balance: "0".to_string(),
            reserved_balance: "0".to_string(),
            status: WalletStatus::Active.as_str().to_string(),
            created_at: now.clone(),
            updated_at: now,
        })
        .execute(conn)?;
    let id = last_insert_id(conn)?;
    find_wallet_by_id(conn, WalletId::new(id))?.ok_or_else(|| {
        DomainError::WalletNotFound {
            user_id: user_id.to_string(),
        }
        .into()
    })
}

pub fn update_wallet_balance(
    conn: &mut SqliteConnection,
    id: WalletId,
    balance: Decimal,
) -> Result<()> {
    diesel::update(wallets::table.find(id.get()))
        .set((
            wallets::balance.eq(decimal_text(balance)),
            wallets::updated_at.eq(now_text()),
        ))
        .execute(conn)?;
    Ok(())
}

pub fn set_wallet_status(
    conn: &mut SqliteConnection,
    id: WalletId,
    status: WalletStatus,
) -> Result<()> {
    diesel::update(wallets::table.find(id.get()))
        .set((
            wallets::status.eq(status.as_str()),
            wallets::updated_at.eq(now_text()),
        ))
        .execute(conn)?;
    Ok(())
}

/// Append a transaction row; the reference column is globally unique.
pub fn insert_transaction(conn: &mut SqliteConnection, row: &NewTransactionRow) -> Result<i64> {
    diesel::insert_into(ledger_transactions::table)
        .values(row)
        .execute(conn)
        .map_err(|e| {
            if is_unique_violation(&e) {
                Error::from(DomainError::DuplicateReference {
                    reference: row.reference.clone(),
                    scope: "ledger_transactions".to_string(),
                })
            } else {
                Error::from(e)
            }
        })?;
    last_insert_id(conn)
}

pub fn find_transaction(
    conn: &mut SqliteConnection,
    reference: &Reference,
) -> Result<Option<LedgerTransaction>> {
    let row: Option<TransactionRow> = ledger_transactions::table
        .filter(ledger_transactions::reference.eq(reference.as_str()))
        .select(TransactionRow::as_select())
        .first(conn)
        .optional()?;
    row.map(LedgerTransaction::try_from).transpose()
}

pub fn set_transaction_status(
    conn: &mut SqliteConnection,
    id: i64,
    status: TransactionStatus,
) -> Result<()> {
    diesel::update(ledger_transactions::table.find(id))
        .set(ledger_transactions::status.eq(status.as_str()))
        .execute(conn)?;
    Ok(())
}

/// Transactions for a wallet, oldest first.
pub fn list_transactions(
    conn: &mut SqliteConnection,
    wallet_id: WalletId,
) -> Result<Vec<LedgerTransaction>> {
    let rows: Vec<TransactionRow> = ledger_transactions::table
        .filter(ledger_transactions::wallet_id.eq(wallet_id.get()))
        .order(ledger_transactions::id.asc())
        .select(TransactionRow::as_select())
        .load(conn)?;
    rows.into_iter().map(LedgerTransaction::try_from).collect()
}

/// Most recent transactions for a wallet, newest first.
pub fn recent_transactions(
    conn: &mut SqliteConnection,
    wallet_id: WalletId,
    limit: i64,
) -> Result<Vec<LedgerTransaction>> {
    let rows: Vec<TransactionRow> = ledger_transactions::table
        .filter(ledger_transactions::wallet_id.eq(wallet_id.get()))
        .order(ledger_transactions::id.desc())
        .limit(limit)
        .select(TransactionRow::as_select())
        .load(conn)?;
    rows.into_iter().map(LedgerTransaction::try_from).collect()
}

/// Insert a (scope, reference) pair.
///
/// Returns the raw Diesel error so the caller can tell a unique violation
/// apart from other failures.
pub fn insert_reference(
    conn: &mut SqliteConnection,
    scope: &str,
    reference: &str,
) -> std::result::Result<(), diesel::result::Error> {
    diesel::insert_into(used_references::table)
        .values(&NewReferenceRow {
            scope: scope.to_string(),
            reference: reference.to_string(),
            created_at: now_text(),
        })
        .execute(conn)
        .map(|_| ())
}

pub fn reference_exists(conn: &mut SqliteConnection, scope: &str, reference: &str) -> Result<bool> {
    let count: i64 = used_references::table
        .filter(used_references::scope.eq(scope))
        .filter(used_references::reference.eq(reference))
        .count()
        .get_result(conn)?;
    Ok(count > 0)
}

/// Current rollover balance, or `None` before first use.
pub fn load_rollover_balance(conn: &mut SqliteConnection) -> Result<Option<Decimal>> {
    let row: Option<RolloverRow> = rollover_balance::table
        .find(ROLLOVER_ROW_ID)
        .select(RolloverRow::as_select())
        .first(conn)
        .optional()?;
    row.map(|r| parse_decimal("rollover_balance.balance", &r.balance))
        .transpose()
}

/// Write the rollover singleton, creating it on first use.
pub fn store_rollover_balance(conn: &mut SqliteConnection, balance: Decimal) -> Result<()> {
    diesel::replace_into(rollover_balance::table)
        .values(&RolloverRow {
            id: ROLLOVER_ROW_ID,
            balance: decimal_text(balance),
            updated_at: now_text(),
        })
        .execute(conn)?;
    Ok(())
}
