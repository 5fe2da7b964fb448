//! Throwaway SQLite databases.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::adapter::outbound::sqlite::database::connection::{
    create_pool, enable_wal, run_migrations, DbPool,
};
use crate::adapter::outbound::sqlite::unit::Database;
use crate::port::outbound::notifier::NotifierRegistry;

/// Temporary file-backed SQLite database, migrated and in WAL mode.
///
/// File-backed rather than `:memory:` so several pooled connections (and
/// threads) share one database. The file is removed on drop.
pub struct TempDb {
    path: PathBuf,
    pool: DbPool,
}

impl TempDb {
    pub fn create(name: &str) -> Self {
        let mut path = std::env::temp_dir();
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        path.push(format!("parimutuel-{name}-{nanos}.db"));

        let pool = create_pool(&path.display().to_string()).expect("create sqlite pool");
        run_migrations(&pool).expect("run migrations");
        enable_wal(&pool).expect("enable WAL mode");

        Self { path, pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Database handle with no notifiers.
    pub fn database(&self) -> Database {
        Database::new(self.pool.clone())
    }

    pub fn database_with(&self, notifiers: NotifierRegistry) -> Database {
        Database::with_notifiers(self.pool.clone(), notifiers)
    }
}

impl Drop for TempDb {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
        let _ = std::fs::remove_file(self.path.with_extension("db-wal"));
        let _ = std::fs::remove_file(self.path.with_extension("db-shm"));
    }
}
