//! Unit of work over a serializing SQLite transaction.
//!
//! Every money-moving operation runs inside exactly one [`UnitOfWork`].
//! [`Database::unit`] opens it with `BEGIN IMMEDIATE`, which takes the
//! database write lock before the first read. That gives the same guarantee
//! as `SELECT ... FOR UPDATE` on every row the unit touches: no other writer
//! can read a balance or pool total between our read and our write.
//!
//! Components receive `&mut UnitOfWork` and never open transactions of their
//! own, so composing them (join = guard + debit + entry + totals) stays one
//! atomic unit. Events queued with [`UnitOfWork::publish`] are dispatched
//! only after commit and dropped on rollback.

use std::sync::Arc;

use diesel::r2d2::{ConnectionManager, PooledConnection};
use diesel::SqliteConnection;
use tracing::trace;

use super::database::connection::DbPool;
use crate::error::{Error, Result};
use crate::port::outbound::notifier::{Event, NotifierRegistry};

/// Pooled SQLite connection.
pub type DbConnection = PooledConnection<ConnectionManager<SqliteConnection>>;

/// Handle to one in-flight atomic unit.
pub struct UnitOfWork<'c> {
    conn: &'c mut SqliteConnection,
    outbox: Vec<Event>,
}

impl<'c> UnitOfWork<'c> {
    /// Wrap a connection that already has a transaction open.
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        Self {
            conn,
            outbox: Vec::new(),
        }
    }

    /// Connection bound to the open transaction.
    pub fn conn(&mut self) -> &mut SqliteConnection {
        &mut *self.conn
    }

    /// Queue an event for delivery after commit.
    pub fn publish(&mut self, event: Event) {
        self.outbox.push(event);
    }

    /// Events queued so far.
    #[must_use]
    pub fn pending_events(&self) -> &[Event] {
        &self.outbox
    }

    fn into_events(self) -> Vec<Event> {
        self.outbox
    }
}

/// Connection pool plus the post-commit notifier registry.
#[derive(Clone)]
pub struct Database {
    pool: DbPool,
    notifiers: Arc<NotifierRegistry>,
}

impl Database {
    /// Create a database handle with no notifiers.
    #[must_use]
    pub fn new(pool: DbPool) -> Self {
        Self::with_notifiers(pool, NotifierRegistry::new())
    }

    /// Create a database handle that dispatches committed events.
    #[must_use]
    pub fn with_notifiers(pool: DbPool, notifiers: NotifierRegistry) -> Self {
        Self {
            pool,
            notifiers: Arc::new(notifiers),
        }
    }

    /// Underlying connection pool.
    #[must_use]
    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// Check out a connection for read-only queries.
    ///
    /// # Errors
    /// Returns [`Error::Connection`] when the pool is exhausted.
    pub fn connection(&self) -> Result<DbConnection> {
        self.pool
            .get()
            .map_err(|e| Error::Connection(e.to_string()))
    }

    /// Run `f` as one atomic unit.
    ///
    /// Commits when `f` returns `Ok`, then dispatches the queued events.
    /// Any error rolls back every write made through the unit.
    ///
    /// # Errors
    /// Propagates the error returned by `f`, or a store error from
    /// begin/commit.
    pub fn unit<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut UnitOfWork<'_>) -> Result<T>,
    {
        let mut conn = self.connection()?;
        let (value, events) = conn.immediate_transaction(|conn| {
            let mut uow = UnitOfWork::new(conn);
            let value = f(&mut uow)?;
            Ok::<_, Error>((value, uow.into_events()))
        })?;

        trace!(events = events.len(), "Unit of work committed");
        self.notifiers.dispatch(&events);
        Ok(value)
    }

    /// Run a read-only query on a pooled connection.
    ///
    /// # Errors
    /// Propagates the error returned by `f`.
    pub fn read<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut SqliteConnection) -> Result<T>,
    {
        let mut conn = self.connection()?;
        f(&mut conn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::outbound::sqlite::ledger_store;
    use crate::domain::id::UserId;
    use crate::testkit::db::TempDb;
    use crate::testkit::notifier::RecordingNotifier;
    use rust_decimal_macros::dec;

    #[test]
    fn committed_unit_dispatches_events() {
        let recorder = RecordingNotifier::new();
        let temp = TempDb::create("unit-commit");
        let db = temp.database_with(recorder.registry());

        db.unit(|uow| {
            uow.publish(Event::RolloverChanged { balance: dec!(1) });
            assert_eq!(uow.pending_events().len(), 1);
            Ok(())
        })
        .unwrap();

        assert_eq!(recorder.events().len(), 1);
    }

    #[test]
    fn failed_unit_rolls_back_writes_and_drops_events() {
        let recorder = RecordingNotifier::new();
        let temp = TempDb::create("unit-rollback");
        let db = temp.database_with(recorder.registry());

        let result: Result<()> = db.unit(|uow| {
            ledger_store::insert_wallet(uow.conn(), &UserId::from("alice"))?;
            uow.publish(Event::RolloverChanged { balance: dec!(1) });
            Err(Error::Database("boom".into()))
        });

        assert!(result.is_err());
        assert!(recorder.events().is_empty());
        let wallet = db
            .read(|conn| ledger_store::find_wallet(conn, &UserId::from("alice")))
            .unwrap();
        assert!(wallet.is_none());
    }
}
