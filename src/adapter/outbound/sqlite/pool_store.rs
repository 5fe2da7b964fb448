//! Pool, option, entry, participant, snapshot, and payout tables.

use diesel::prelude::*;
use diesel::SqliteConnection;
use rust_decimal::Decimal;

use super::database::model::{
    decimal_text, now_text, EntryRow, NewEntryRow, NewOptionRow, NewPayoutRow, NewPoolRow,
    OptionRow, ParticipantRow, PayoutRow, PoolLedgerRow, PoolRow,
};
use super::database::schema::{
    pool_entries, pool_ledgers, pool_options, pool_participants, pool_payouts, pools,
};
use super::{is_unique_violation, last_insert_id, violation_mentions};
use crate::domain::error::DomainError;
use crate::domain::id::{EntryId, OptionId, PoolId, UserId};
use crate::domain::pool::{
    EntryStatus, OptionStatus, Pool, PoolEntry, PoolLedger, PoolOption, PoolPayout, PoolStatus,
};
use crate::error::{Error, Result};

pub fn insert_pool(conn: &mut SqliteConnection, row: &NewPoolRow) -> Result<PoolId> {
    diesel::insert_into(pools::table).values(row).execute(conn)?;
    Ok(PoolId::new(last_insert_id(conn)?))
}

pub fn find_pool(conn: &mut SqliteConnection, pool_id: PoolId) -> Result<Option<Pool>> {
    let row: Option<PoolRow> = pools::table
        .find(pool_id.get())
        .select(PoolRow::as_select())
        .first(conn)
        .optional()?;
    row.map(Pool::try_from).transpose()
}

/// Like [`find_pool`] but a missing pool is [`DomainError::PoolNotFound`].
pub fn get_pool(conn: &mut SqliteConnection, pool_id: PoolId) -> Result<Pool> {
    find_pool(conn, pool_id)?.ok_or_else(|| {
        DomainError::PoolNotFound {
            pool_id: pool_id.get(),
        }
        .into()
    })
}

pub fn list_pools(conn: &mut SqliteConnection) -> Result<Vec<Pool>> {
    let rows: Vec<PoolRow> = pools::table
        .order(pools::id.asc())
        .select(PoolRow::as_select())
        .load(conn)?;
    rows.into_iter().map(Pool::try_from).collect()
}

pub fn set_pool_status(
    conn: &mut SqliteConnection,
    pool_id: PoolId,
    status: PoolStatus,
) -> Result<()> {
    let now = now_text();
    let settled_at = status.is_settled().then(|| now.clone());
    diesel::update(pools::table.find(pool_id.get()))
        .set((
            pools::status.eq(status.as_str()),
            pools::updated_at.eq(&now),
            pools::settled_at.eq(settled_at),
        ))
        .execute(conn)?;
    Ok(())
}

/// Overwrite the running totals of a pool.
pub fn update_pool_totals(
    conn: &mut SqliteConnection,
    pool_id: PoolId,
    total_stake: Decimal,
    total_pool_amount: Decimal,
) -> Result<()> {
    diesel::update(pools::table.find(pool_id.get()))
        .set((
            pools::total_stake.eq(decimal_text(total_stake)),
            pools::total_pool_amount.eq(decimal_text(total_pool_amount)),
            pools::updated_at.eq(now_text()),
        ))
        .execute(conn)?;
    Ok(())
}

/// Record that the pool seed was handed back, shrinking the pool total.
pub fn clear_rollover_seed(conn: &mut SqliteConnection, pool: &Pool) -> Result<()> {
    diesel::update(pools::table.find(pool.id.get()))
        .set((
            pools::rollover_seed.eq("0"),
            pools::total_pool_amount.eq(decimal_text(pool.total_pool_amount - pool.rollover_seed)),
            pools::updated_at.eq(now_text()),
        ))
        .execute(conn)?;
    Ok(())
}

pub fn insert_option(
    conn: &mut SqliteConnection,
    pool_id: PoolId,
    label: &str,
) -> Result<OptionId> {
    diesel::insert_into(pool_options::table)
        .values(&NewOptionRow {
            pool_id: pool_id.get(),
            label: label.to_string(),
            total_stake: "0".to_string(),
            status: OptionStatus::Active.as_str().to_string(),
        })
        .execute(conn)
        .map_err(|e| {
            if is_unique_violation(&e) {
                Error::from(DomainError::InvalidPool(format!(
                    "duplicate option label '{label}'"
                )))
            } else {
                Error::from(e)
            }
        })?;
    Ok(OptionId::new(last_insert_id(conn)?))
}

/// Option scoped to its pool; an option of another pool is not found.
pub fn find_option(
    conn: &mut SqliteConnection,
    pool_id: PoolId,
    option_id: OptionId,
) -> Result<Option<PoolOption>> {
    let row: Option<OptionRow> = pool_options::table
        .filter(pool_options::id.eq(option_id.get()))
        .filter(pool_options::pool_id.eq(pool_id.get()))
        .select(OptionRow::as_select())
        .first(conn)
        .optional()?;
    row.map(PoolOption::try_from).transpose()
}

pub fn list_options(conn: &mut SqliteConnection, pool_id: PoolId) -> Result<Vec<PoolOption>> {
    let rows: Vec<OptionRow> = pool_options::table
        .filter(pool_options::pool_id.eq(pool_id.get()))
        .order(pool_options::id.asc())
        .select(OptionRow::as_select())
        .load(conn)?;
    rows.into_iter().map(PoolOption::try_from).collect()
}

pub fn update_option_total(
    conn: &mut SqliteConnection,
    option_id: OptionId,
    total_stake: Decimal,
) -> Result<()> {
    diesel::update(pool_options::table.find(option_id.get()))
        .set(pool_options::total_stake.eq(decimal_text(total_stake)))
        .execute(conn)?;
    Ok(())
}

/// Mark every option of the pool except `winner` as eliminated.
pub fn eliminate_other_options(
    conn: &mut SqliteConnection,
    pool_id: PoolId,
    winner: OptionId,
) -> Result<usize> {
    let updated = diesel::update(
        pool_options::table
            .filter(pool_options::pool_id.eq(pool_id.get()))
            .filter(pool_options::id.ne(winner.get())),
    )
    .set(pool_options::status.eq(OptionStatus::Eliminated.as_str()))
    .execute(conn)?;
    Ok(updated)
}

/// Insert a stake row.
///
/// The (pool, user) and reference unique indexes map to
/// [`DomainError::AlreadyJoined`] and [`DomainError::DuplicateReference`].
pub fn insert_entry(conn: &mut SqliteConnection, row: &NewEntryRow) -> Result<EntryId> {
    diesel::insert_into(pool_entries::table)
        .values(row)
        .execute(conn)
        .map_err(|e| {
            if !is_unique_violation(&e) {
                return Error::from(e);
            }
            if violation_mentions(&e, "pool_entries.reference") {
                DomainError::DuplicateReference {
                    reference: row.reference.clone(),
                    scope: "pool_entry".to_string(),
                }
                .into()
            } else {
                DomainError::AlreadyJoined {
                    user_id: row.user_id.clone(),
                    pool_id: row.pool_id,
                }
                .into()
            }
        })?;
    Ok(EntryId::new(last_insert_id(conn)?))
}

pub fn find_entry_for_user(
    conn: &mut SqliteConnection,
    pool_id: PoolId,
    user_id: &UserId,
) -> Result<Option<PoolEntry>> {
    let row: Option<EntryRow> = pool_entries::table
        .filter(pool_entries::pool_id.eq(pool_id.get()))
        .filter(pool_entries::user_id.eq(user_id.as_str()))
        .select(EntryRow::as_select())
        .first(conn)
        .optional()?;
    row.map(PoolEntry::try_from).transpose()
}

/// All entries of a pool, oldest first.
pub fn list_entries(conn: &mut SqliteConnection, pool_id: PoolId) -> Result<Vec<PoolEntry>> {
    let rows: Vec<EntryRow> = pool_entries::table
        .filter(pool_entries::pool_id.eq(pool_id.get()))
        .order(pool_entries::id.asc())
        .select(EntryRow::as_select())
        .load(conn)?;
    rows.into_iter().map(PoolEntry::try_from).collect()
}

pub fn list_entries_with_status(
    conn: &mut SqliteConnection,
    pool_id: PoolId,
    status: EntryStatus,
) -> Result<Vec<PoolEntry>> {
    let rows: Vec<EntryRow> = pool_entries::table
        .filter(pool_entries::pool_id.eq(pool_id.get()))
        .filter(pool_entries::status.eq(status.as_str()))
        .order(pool_entries::id.asc())
        .select(EntryRow::as_select())
        .load(conn)?;
    rows.into_iter().map(PoolEntry::try_from).collect()
}

/// Entries of the pool whose ids are in `ids`; foreign ids are ignored.
pub fn find_entries(
    conn: &mut SqliteConnection,
    pool_id: PoolId,
    ids: &[EntryId],
) -> Result<Vec<PoolEntry>> {
    let raw: Vec<i64> = ids.iter().map(|id| id.get()).collect();
    let rows: Vec<EntryRow> = pool_entries::table
        .filter(pool_entries::pool_id.eq(pool_id.get()))
        .filter(pool_entries::id.eq_any(raw))
        .order(pool_entries::id.asc())
        .select(EntryRow::as_select())
        .load(conn)?;
    rows.into_iter().map(PoolEntry::try_from).collect()
}

pub fn count_entries_with_status(
    conn: &mut SqliteConnection,
    pool_id: PoolId,
    status: EntryStatus,
) -> Result<i64> {
    let count = pool_entries::table
        .filter(pool_entries::pool_id.eq(pool_id.get()))
        .filter(pool_entries::status.eq(status.as_str()))
        .count()
        .get_result(conn)?;
    Ok(count)
}

pub fn set_entry_status(
    conn: &mut SqliteConnection,
    entry_id: EntryId,
    status: EntryStatus,
) -> Result<()> {
    diesel::update(pool_entries::table.find(entry_id.get()))
        .set((
            pool_entries::status.eq(status.as_str()),
            pool_entries::updated_at.eq(now_text()),
        ))
        .execute(conn)?;
    Ok(())
}

/// Move every active entry of the pool to `status`.
pub fn settle_active_entries(
    conn: &mut SqliteConnection,
    pool_id: PoolId,
    status: EntryStatus,
) -> Result<usize> {
    let updated = diesel::update(
        pool_entries::table
            .filter(pool_entries::pool_id.eq(pool_id.get()))
            .filter(pool_entries::status.eq(EntryStatus::Active.as_str())),
    )
    .set((
        pool_entries::status.eq(status.as_str()),
        pool_entries::updated_at.eq(now_text()),
    ))
    .execute(conn)?;
    Ok(updated)
}

/// Count one more participant on an option, creating the summary row.
pub fn increment_participants(
    conn: &mut SqliteConnection,
    pool_id: PoolId,
    option_id: OptionId,
) -> Result<()> {
    diesel::insert_into(pool_participants::table)
        .values(&ParticipantRow {
            pool_id: pool_id.get(),
            option_id: option_id.get(),
            participant_count: 1,
        })
        .on_conflict((pool_participants::pool_id, pool_participants::option_id))
        .do_update()
        .set(pool_participants::participant_count.eq(pool_participants::participant_count + 1))
        .execute(conn)?;
    Ok(())
}

/// Count one fewer participant on an option, never going below zero.
pub fn decrement_participants(
    conn: &mut SqliteConnection,
    pool_id: PoolId,
    option_id: OptionId,
) -> Result<()> {
    diesel::update(
        pool_participants::table
            .filter(pool_participants::pool_id.eq(pool_id.get()))
            .filter(pool_participants::option_id.eq(option_id.get()))
            .filter(pool_participants::participant_count.gt(0)),
    )
    .set(pool_participants::participant_count.eq(pool_participants::participant_count - 1))
    .execute(conn)?;
    Ok(())
}

/// Participant summary rows of a pool.
pub fn participant_counts(
    conn: &mut SqliteConnection,
    pool_id: PoolId,
) -> Result<Vec<ParticipantRow>> {
    let rows = pool_participants::table
        .filter(pool_participants::pool_id.eq(pool_id.get()))
        .select(ParticipantRow::as_select())
        .load(conn)?;
    Ok(rows)
}

pub fn insert_ledger(conn: &mut SqliteConnection, ledger: &PoolLedger) -> Result<()> {
    diesel::insert_into(pool_ledgers::table)
        .values(&PoolLedgerRow::from(ledger))
        .execute(conn)?;
    Ok(())
}

pub fn find_ledger(conn: &mut SqliteConnection, pool_id: PoolId) -> Result<Option<PoolLedger>> {
    let row: Option<PoolLedgerRow> = pool_ledgers::table
        .find(pool_id.get())
        .select(PoolLedgerRow::as_select())
        .first(conn)
        .optional()?;
    row.map(PoolLedger::try_from).transpose()
}

pub fn insert_payout(conn: &mut SqliteConnection, row: &NewPayoutRow) -> Result<i64> {
    diesel::insert_into(pool_payouts::table)
        .values(row)
        .execute(conn)?;
    last_insert_id(conn)
}

pub fn list_payouts(conn: &mut SqliteConnection, pool_id: PoolId) -> Result<Vec<PoolPayout>> {
    let rows: Vec<PayoutRow> = pool_payouts::table
        .filter(pool_payouts::pool_id.eq(pool_id.get()))
        .order(pool_payouts::id.asc())
        .select(PayoutRow::as_select())
        .load(conn)?;
    rows.into_iter().map(PoolPayout::try_from).collect()
}
