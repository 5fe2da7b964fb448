//! SQLite persistence adapters.
//!
//! Table access for the ledger core using Diesel ORM. The store modules
//! expose plain functions over `&mut SqliteConnection`; callers get that
//! connection from a [`unit::UnitOfWork`] so every write lands inside the
//! caller's transaction.

pub mod database;
pub mod job_store;
pub mod ledger_store;
pub mod pool_store;
pub mod unit;

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel::sql_types::BigInt;
use diesel::{QueryableByName, RunQueryDsl, SqliteConnection};

use crate::error::Result;

#[derive(QueryableByName)]
struct LastInsertRowId {
    #[diesel(sql_type = BigInt)]
    #[diesel(column_name = "id")]
    id: i64,
}

/// Row id assigned by the most recent INSERT on this connection.
pub(crate) fn last_insert_id(conn: &mut SqliteConnection) -> Result<i64> {
    let row: LastInsertRowId =
        diesel::sql_query("SELECT last_insert_rowid() AS id").get_result(conn)?;
    Ok(row.id)
}

/// Unique-constraint violation reported by SQLite.
pub fn is_unique_violation(err: &DieselError) -> bool {
    matches!(
        err,
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)
    )
}

/// Constraint message mentions the given column.
pub(crate) fn violation_mentions(err: &DieselError, column: &str) -> bool {
    match err {
        DieselError::DatabaseError(_, info) => info.message().contains(column),
        _ => false,
    }
}
