//! Cached pool summaries.
//!
//! Summaries are read far more often than pools change. The cache is a
//! [`Notifier`], so registering it on the database's notifier registry drops
//! a pool's entry as soon as a unit touching that pool commits. Readers never
//! see totals older than the last committed join, refund or settlement.
//!
//! Each invalidation bumps a per-pool generation. A miss records the
//! generation before reading and only stores its summary if no invalidation
//! landed in between, so a summary read before a commit is never written
//! back after it.

use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use diesel::SqliteConnection;
use tracing::trace;

use super::super::pool_admin::pool_summary;
use crate::domain::id::PoolId;
use crate::domain::pool::{PoolStatus, PoolSummary};
use crate::error::Result;
use crate::port::outbound::notifier::{Event, Notifier};

/// Thread-safe pool summary cache.
///
/// Cheap to clone; clones share one map.
#[derive(Debug, Clone, Default)]
pub struct PoolViewCache {
    views: Arc<DashMap<PoolId, PoolSummary>>,
    generations: Arc<DashMap<PoolId, u64>>,
}

impl PoolViewCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached summary for `pool_id`, loading it on a miss.
    ///
    /// `accepting_entries` is recomputed on every hit, since the closing
    /// date can pass without any event.
    ///
    /// # Errors
    /// Returns [`DomainError::PoolNotFound`](crate::domain::DomainError::PoolNotFound)
    /// or a store error on a miss.
    pub fn get_or_load(&self, conn: &mut SqliteConnection, pool_id: PoolId) -> Result<PoolSummary> {
        if let Some(view) = self.views.get(&pool_id) {
            let mut summary = view.clone();
            summary.accepting_entries =
                summary.status == PoolStatus::Open && Utc::now() < summary.closing_date;
            return Ok(summary);
        }

        let seen = self.generation(pool_id);
        let summary = pool_summary(conn, pool_id)?;
        self.store_if_current(pool_id, seen, &summary);
        Ok(summary)
    }

    /// Drop the cached summary for `pool_id`.
    pub fn invalidate(&self, pool_id: PoolId) {
        // Generation entry first, then views; same order as the store path.
        let mut generation = self.generations.entry(pool_id).or_insert(0);
        *generation += 1;
        if self.views.remove(&pool_id).is_some() {
            trace!(%pool_id, "Pool view invalidated");
        }
    }

    fn generation(&self, pool_id: PoolId) -> u64 {
        self.generations.get(&pool_id).map_or(0, |g| *g)
    }

    /// Cache `summary` unless `pool_id` was invalidated after generation
    /// `seen` was observed. Returns whether it was stored.
    fn store_if_current(&self, pool_id: PoolId, seen: u64, summary: &PoolSummary) -> bool {
        let generation = self.generations.entry(pool_id).or_insert(0);
        if *generation != seen {
            trace!(%pool_id, "Discarding pool view read before an invalidation");
            return false;
        }
        self.views.insert(pool_id, summary.clone());
        true
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.views.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }
}

impl Notifier for PoolViewCache {
    fn notify(&self, event: &Event) -> Result<()> {
        if let Some(pool_id) = event.pool_id() {
            self.invalidate(pool_id);
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "pool_view_cache"
    }
}
