//! Database model types for Diesel ORM.
//!
//! Money is stored as canonical decimal text and timestamps as RFC 3339
//! text; conversion into domain types happens here and fails with
//! [`Error::Parse`] on malformed rows.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use rust_decimal::Decimal;

use super::schema::{
    ledger_transactions, pool_entries, pool_ledgers, pool_options, pool_participants,
    pool_payouts, pools, rollover_balance, settlement_jobs, used_references, wallets,
};
use crate::domain::id::{EntryId, JobId, OptionId, PoolId, Reference, UserId, WalletId};
use crate::domain::job::SettlementJob;
use crate::domain::pool::{Pool, PoolEntry, PoolLedger, PoolOption, PoolPayout};
use crate::domain::wallet::{LedgerTransaction, Wallet};
use crate::error::{Error, Result};

/// Parse a stored decimal column.
pub fn parse_decimal(column: &'static str, value: &str) -> Result<Decimal> {
    Decimal::from_str(value).map_err(|e| Error::Parse(format!("{column}: {e}")))
}

/// Parse a stored RFC 3339 timestamp column.
pub fn parse_timestamp(column: &'static str, value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| Error::Parse(format!("{column}: {e}")))
}

/// Parse a stored text enum column.
pub fn parse_enum<T: FromStr<Err = String>>(value: &str) -> Result<T> {
    value.parse().map_err(Error::Parse)
}

/// Canonical text form for a decimal column.
#[must_use]
pub fn decimal_text(value: Decimal) -> String {
    value.normalize().to_string()
}

/// Current time in the stored timestamp format.
#[must_use]
pub fn now_text() -> String {
    Utc::now().to_rfc3339()
}

/// Database row for a wallet.
#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = wallets)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct WalletRow {
    pub id: i64,
    pub user_id: String,
    pub balance: String,
    pub reserved_balance: String,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = wallets)]
pub struct NewWalletRow {
    pub user_id: String,
    pub balance: String,
    pub reserved_balance: String,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

impl TryFrom<WalletRow> for Wallet {
    type Error = Error;

    fn try_from(row: WalletRow) -> Result<Self> {
        Ok(Self {
            id: WalletId::new(row.id),
            user_id: UserId::from(row.user_id),
            balance: parse_decimal("wallets.balance", &row.balance)?,
            reserved_balance: parse_decimal("wallets.reserved_balance", &row.reserved_balance)?,
            status: parse_enum(&row.status)?,
            created_at: parse_timestamp("wallets.created_at", &row.created_at)?,
            updated_at: parse_timestamp("wallets.updated_at", &row.updated_at)?,
        })
    }
}

/// Database row for a ledger transaction.
#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = ledger_transactions)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct TransactionRow {
    pub id: i64,
    pub wallet_id: i64,
    pub kind: String,
    pub amount: String,
    pub balance_before: String,
    pub balance_after: String,
    pub reference: String,
    pub status: String,
    pub description: Option<String>,
    pub metadata: Option<String>,
    pub created_at: String,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = ledger_transactions)]
pub struct NewTransactionRow {
    pub wallet_id: i64,
    pub kind: String,
    pub amount: String,
    pub balance_before: String,
    pub balance_after: String,
    pub reference: String,
    pub status: String,
    pub description: Option<String>,
    pub metadata: Option<String>,
    pub created_at: String,
}

impl TryFrom<TransactionRow> for LedgerTransaction {
    type Error = Error;

    fn try_from(row: TransactionRow) -> Result<Self> {
        let metadata = row
            .metadata
            .as_deref()
            .map(serde_json::from_str::<serde_json::Value>)
            .transpose()?;
        Ok(Self {
            id: row.id,
            wallet_id: WalletId::new(row.wallet_id),
            kind: parse_enum(&row.kind)?,
            amount: parse_decimal("ledger_transactions.amount", &row.amount)?,
            balance_before: parse_decimal(
                "ledger_transactions.balance_before",
                &row.balance_before,
            )?,
            balance_after: parse_decimal("ledger_transactions.balance_after", &row.balance_after)?,
            reference: Reference::from(row.reference),
            status: parse_enum(&row.status)?,
            description: row.description,
            metadata,
            created_at: parse_timestamp("ledger_transactions.created_at", &row.created_at)?,
        })
    }
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = used_references)]
pub struct NewReferenceRow {
    pub scope: String,
    pub reference: String,
    pub created_at: String,
}

/// Database row for a pool.
#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = pools)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct PoolRow {
    pub id: i64,
    pub title: String,
    pub status: String,
    pub total_stake: String,
    pub total_pool_amount: String,
    pub rollover_seed: String,
    pub min_entry: String,
    pub company_cut_percent: Option<String>,
    pub closing_date: String,
    pub created_at: String,
    pub updated_at: String,
    pub settled_at: Option<String>,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = pools)]
pub struct NewPoolRow {
    pub title: String,
    pub status: String,
    pub total_stake: String,
    pub total_pool_amount: String,
    pub rollover_seed: String,
    pub min_entry: String,
    pub company_cut_percent: Option<String>,
    pub closing_date: String,
    pub created_at: String,
    pub updated_at: String,
}

impl TryFrom<PoolRow> for Pool {
    type Error = Error;

    fn try_from(row: PoolRow) -> Result<Self> {
        Ok(Self {
            id: PoolId::new(row.id),
            title: row.title,
            status: parse_enum(&row.status)?,
            total_stake: parse_decimal("pools.total_stake", &row.total_stake)?,
            total_pool_amount: parse_decimal("pools.total_pool_amount", &row.total_pool_amount)?,
            rollover_seed: parse_decimal("pools.rollover_seed", &row.rollover_seed)?,
            min_entry: parse_decimal("pools.min_entry", &row.min_entry)?,
            company_cut_percent: row
                .company_cut_percent
                .as_deref()
                .map(|v| parse_decimal("pools.company_cut_percent", v))
                .transpose()?,
            closing_date: parse_timestamp("pools.closing_date", &row.closing_date)?,
            created_at: parse_timestamp("pools.created_at", &row.created_at)?,
            updated_at: parse_timestamp("pools.updated_at", &row.updated_at)?,
            settled_at: row
                .settled_at
                .as_deref()
                .map(|v| parse_timestamp("pools.settled_at", v))
                .transpose()?,
        })
    }
}

/// Database row for a pool option.
#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = pool_options)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct OptionRow {
    pub id: i64,
    pub pool_id: i64,
    pub label: String,
    pub total_stake: String,
    pub status: String,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = pool_options)]
pub struct NewOptionRow {
    pub pool_id: i64,
    pub label: String,
    pub total_stake: String,
    pub status: String,
}

impl TryFrom<OptionRow> for PoolOption {
    type Error = Error;

    fn try_from(row: OptionRow) -> Result<Self> {
        Ok(Self {
            id: OptionId::new(row.id),
            pool_id: PoolId::new(row.pool_id),
            label: row.label,
            total_stake: parse_decimal("pool_options.total_stake", &row.total_stake)?,
            status: parse_enum(&row.status)?,
        })
    }
}

/// Database row for a pool entry.
#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = pool_entries)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct EntryRow {
    pub id: i64,
    pub pool_id: i64,
    pub option_id: i64,
    pub user_id: String,
    pub amount: String,
    pub reference: String,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = pool_entries)]
pub struct NewEntryRow {
    pub pool_id: i64,
    pub option_id: i64,
    pub user_id: String,
    pub amount: String,
    pub reference: String,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

impl TryFrom<EntryRow> for PoolEntry {
    type Error = Error;

    fn try_from(row: EntryRow) -> Result<Self> {
        Ok(Self {
            id: EntryId::new(row.id),
            pool_id: PoolId::new(row.pool_id),
            option_id: OptionId::new(row.option_id),
            user_id: UserId::from(row.user_id),
            amount: parse_decimal("pool_entries.amount", &row.amount)?,
            reference: Reference::from(row.reference),
            status: parse_enum(&row.status)?,
            created_at: parse_timestamp("pool_entries.created_at", &row.created_at)?,
            updated_at: parse_timestamp("pool_entries.updated_at", &row.updated_at)?,
        })
    }
}

/// Participant-count summary row.
#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = pool_participants)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ParticipantRow {
    pub pool_id: i64,
    pub option_id: i64,
    pub participant_count: i32,
}

/// Database row for a settlement snapshot.
#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = pool_ledgers)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct PoolLedgerRow {
    pub pool_id: i64,
    pub outcome: String,
    pub total_pool: String,
    pub company_cut_percent: String,
    pub company_cut: String,
    pub payout_pool: String,
    pub winning_option_id: Option<i64>,
    pub total_winning_stake: String,
    pub total_winners: i32,
    pub total_payouts: String,
    pub rollover_amount: String,
    pub created_at: String,
}

impl From<&PoolLedger> for PoolLedgerRow {
    fn from(ledger: &PoolLedger) -> Self {
        Self {
            pool_id: ledger.pool_id.get(),
            outcome: ledger.outcome.as_str().to_string(),
            total_pool: decimal_text(ledger.total_pool),
            company_cut_percent: decimal_text(ledger.company_cut_percent),
            company_cut: decimal_text(ledger.company_cut),
            payout_pool: decimal_text(ledger.payout_pool),
            winning_option_id: ledger.winning_option_id.map(OptionId::get),
            total_winning_stake: decimal_text(ledger.total_winning_stake),
            total_winners: ledger.total_winners,
            total_payouts: decimal_text(ledger.total_payouts),
            rollover_amount: decimal_text(ledger.rollover_amount),
            created_at: ledger.created_at.to_rfc3339(),
        }
    }
}

impl TryFrom<PoolLedgerRow> for PoolLedger {
    type Error = Error;

    fn try_from(row: PoolLedgerRow) -> Result<Self> {
        Ok(Self {
            pool_id: PoolId::new(row.pool_id),
            outcome: parse_enum(&row.outcome)?,
            total_pool: parse_decimal("pool_ledgers.total_pool", &row.total_pool)?,
            company_cut_percent: parse_decimal(
                "pool_ledgers.company_cut_percent",
                &row.company_cut_percent,
            )?,
            company_cut: parse_decimal("pool_ledgers.company_cut", &row.company_cut)?,
            payout_pool: parse_decimal("pool_ledgers.payout_pool", &row.payout_pool)?,
            winning_option_id: row.winning_option_id.map(OptionId::new),
            total_winning_stake: parse_decimal(
                "pool_ledgers.total_winning_stake",
                &row.total_winning_stake,
            )?,
            total_winners: row.total_winners,
            total_payouts: parse_decimal("pool_ledgers.total_payouts", &row.total_payouts)?,
            rollover_amount: parse_decimal("pool_ledgers.rollover_amount", &row.rollover_amount)?,
            created_at: parse_timestamp("pool_ledgers.created_at", &row.created_at)?,
        })
    }
}

/// Database row for a payout or refund trace.
#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = pool_payouts)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct PayoutRow {
    pub id: i64,
    pub pool_id: i64,
    pub entry_id: i64,
    pub user_id: String,
    pub kind: String,
    pub amount: String,
    pub txn_ref: String,
    pub status: String,
    pub reason: Option<String>,
    pub created_at: String,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = pool_payouts)]
pub struct NewPayoutRow {
    pub pool_id: i64,
    pub entry_id: i64,
    pub user_id: String,
    pub kind: String,
    pub amount: String,
    pub txn_ref: String,
    pub status: String,
    pub reason: Option<String>,
    pub created_at: String,
}

impl TryFrom<PayoutRow> for PoolPayout {
    type Error = Error;

    fn try_from(row: PayoutRow) -> Result<Self> {
        Ok(Self {
            id: row.id,
            pool_id: PoolId::new(row.pool_id),
            entry_id: EntryId::new(row.entry_id),
            user_id: UserId::from(row.user_id),
            kind: parse_enum(&row.kind)?,
            amount: parse_decimal("pool_payouts.amount", &row.amount)?,
            txn_ref: Reference::from(row.txn_ref),
            status: parse_enum(&row.status)?,
            reason: row.reason,
            created_at: parse_timestamp("pool_payouts.created_at", &row.created_at)?,
        })
    }
}

/// Singleton rollover row.
#[derive(Queryable, Selectable, Insertable, AsChangeset, Debug, Clone)]
#[diesel(table_name = rollover_balance)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct RolloverRow {
    pub id: i64,
    pub balance: String,
    pub updated_at: String,
}

/// Database row for a settlement job.
#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = settlement_jobs)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct JobRow {
    pub id: i64,
    pub pool_id: i64,
    pub kind: String,
    pub status: String,
    pub attempts: i32,
    pub last_error: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = settlement_jobs)]
pub struct NewJobRow {
    pub pool_id: i64,
    pub kind: String,
    pub status: String,
    pub attempts: i32,
    pub created_at: String,
    pub updated_at: String,
}

impl TryFrom<JobRow> for SettlementJob {
    type Error = Error;

    fn try_from(row: JobRow) -> Result<Self> {
        Ok(Self {
            id: JobId::new(row.id),
            pool_id: PoolId::new(row.pool_id),
            kind: parse_enum(&row.kind)?,
            status: parse_enum(&row.status)?,
            attempts: row.attempts,
            last_error: row.last_error,
            created_at: parse_timestamp("settlement_jobs.created_at", &row.created_at)?,
            updated_at: parse_timestamp("settlement_jobs.updated_at", &row.updated_at)?,
        })
    }
}
