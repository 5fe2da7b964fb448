//! Settlement job tracker table.

use diesel::prelude::*;
use diesel::SqliteConnection;

use super::database::model::{now_text, JobRow, NewJobRow};
use super::database::schema::settlement_jobs;
use super::last_insert_id;
use crate::domain::id::{JobId, PoolId};
use crate::domain::job::{JobKind, JobStatus, SettlementJob};
use crate::error::Result;

/// Record a new job in the `queued` state.
pub fn insert_job(conn: &mut SqliteConnection, pool_id: PoolId, kind: JobKind) -> Result<JobId> {
    let now = now_text();
    diesel::insert_into(settlement_jobs::table)
        .values(&NewJobRow {
            pool_id: pool_id.get(),
            kind: kind.as_str().to_string(),
            status: JobStatus::Queued.as_str().to_string(),
            attempts: 0,
            created_at: now.clone(),
            updated_at: now,
        })
        .execute(conn)?;
    Ok(JobId::new(last_insert_id(conn)?))
}

/// Start an attempt: `running`, attempts + 1.
pub fn mark_running(conn: &mut SqliteConnection, id: JobId) -> Result<()> {
    diesel::update(settlement_jobs::table.find(id.get()))
        .set((
            settlement_jobs::status.eq(JobStatus::Running.as_str()),
            settlement_jobs::attempts.eq(settlement_jobs::attempts + 1),
            settlement_jobs::updated_at.eq(now_text()),
        ))
        .execute(conn)?;
    Ok(())
}

pub fn mark_completed(conn: &mut SqliteConnection, id: JobId) -> Result<()> {
    diesel::update(settlement_jobs::table.find(id.get()))
        .set((
            settlement_jobs::status.eq(JobStatus::Completed.as_str()),
            settlement_jobs::last_error.eq(None::<String>),
            settlement_jobs::updated_at.eq(now_text()),
        ))
        .execute(conn)?;
    Ok(())
}

/// Record an attempt error; `terminal` moves the job to `failed`, otherwise
/// it goes back to `queued` for the next attempt.
pub fn record_error(
    conn: &mut SqliteConnection,
    id: JobId,
    error: &str,
    terminal: bool,
) -> Result<()> {
    let status = if terminal {
        JobStatus::Failed
    } else {
        JobStatus::Queued
    };
    diesel::update(settlement_jobs::table.find(id.get()))
        .set((
            settlement_jobs::status.eq(status.as_str()),
            settlement_jobs::last_error.eq(Some(error)),
            settlement_jobs::updated_at.eq(now_text()),
        ))
        .execute(conn)?;
    Ok(())
}

pub fn find_job(conn: &mut SqliteConnection, id: JobId) -> Result<Option<SettlementJob>> {
    let row: Option<JobRow> = settlement_jobs::table
        .find(id.get())
        .select(JobRow::as_select())
        .first(conn)
        .optional()?;
    row.map(SettlementJob::try_from).transpose()
}

/// Jobs for a pool, oldest first.
pub fn list_jobs(conn: &mut SqliteConnection, pool_id: PoolId) -> Result<Vec<SettlementJob>> {
    let rows: Vec<JobRow> = settlement_jobs::table
        .filter(settlement_jobs::pool_id.eq(pool_id.get()))
        .order(settlement_jobs::id.asc())
        .select(JobRow::as_select())
        .load(conn)?;
    rows.into_iter().map(SettlementJob::try_from).collect()
}
