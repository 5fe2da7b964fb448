//! Background settlement and refund jobs with retry.
//!
//! A [`JobRunner`] wraps one settlement or refund unit in a tracked job row.
//! Each attempt runs on the blocking thread pool, because Diesel is
//! synchronous. Transient store errors are retried with exponential backoff;
//! domain errors fail the job on the first attempt. At most one job per pool
//! runs at a time across every runner sharing one [`PoolClaims`].

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use super::refund::{RefundEngine, RefundReport};
use super::settlement::{SettlementEngine, SettlementOutcome};
use crate::adapter::outbound::sqlite::{job_store, pool_store, unit::Database};
use crate::domain::id::{JobId, PoolId};
use crate::domain::job::{JobKind, JobRequest};
use crate::domain::policy::LedgerPolicy;
use crate::error::{Error, Result};
use crate::infrastructure::config::jobs::JobsConfig;
use crate::port::outbound::notifier::Event;

/// Result of the unit a job ran.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "job", rename_all = "snake_case")]
pub enum JobOutcome {
    Settled(SettlementOutcome),
    Refunded(RefundReport),
}

/// A completed job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobReport {
    pub job_id: JobId,
    pub pool_id: PoolId,
    pub kind: JobKind,
    pub attempts: u32,
    pub outcome: JobOutcome,
}

/// Pools with a job in flight. Clones share one set.
#[derive(Debug, Clone, Default)]
pub struct PoolClaims {
    held: Arc<Mutex<HashSet<PoolId>>>,
}

impl PoolClaims {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a job currently holds `pool_id`.
    #[must_use]
    pub fn is_claimed(&self, pool_id: PoolId) -> bool {
        self.held.lock().contains(&pool_id)
    }

    fn claim(&self, pool_id: PoolId) -> Result<Claim> {
        if !self.held.lock().insert(pool_id) {
            return Err(Error::JobInProgress { pool_id });
        }
        Ok(Claim {
            pool_id,
            held: Arc::clone(&self.held),
        })
    }
}

/// Releases a pool claim when the job ends, however it ends.
struct Claim {
    pool_id: PoolId,
    held: Arc<Mutex<HashSet<PoolId>>>,
}

impl Drop for Claim {
    fn drop(&mut self) {
        self.held.lock().remove(&self.pool_id);
    }
}

/// Runs settlement and refund jobs against a [`Database`].
#[derive(Clone)]
pub struct JobRunner {
    db: Database,
    policy: LedgerPolicy,
    config: JobsConfig,
    claims: PoolClaims,
}

impl JobRunner {
    /// Runner with its own claim set.
    #[must_use]
    pub fn new(db: Database, policy: LedgerPolicy, config: JobsConfig) -> Self {
        Self::with_claims(db, policy, config, PoolClaims::new())
    }

    /// Runner that excludes jobs held by any other runner sharing `claims`.
    #[must_use]
    pub fn with_claims(
        db: Database,
        policy: LedgerPolicy,
        config: JobsConfig,
        claims: PoolClaims,
    ) -> Self {
        Self {
            db,
            policy,
            config,
            claims,
        }
    }

    /// Run a settle or refund request to completion.
    ///
    /// # Errors
    /// - [`Error::JobInProgress`] when another job holds the pool
    /// - [`DomainError::PoolNotFound`](crate::domain::DomainError::PoolNotFound)
    ///   before any job row is written
    /// - [`Error::SettlementFailed`] wrapping the last cause once the job
    ///   fails terminally
    pub async fn run(&self, request: JobRequest) -> Result<JobReport> {
        let policy = self.policy;
        let pool_id = request.pool_id();
        let kind = request.kind();
        self.run_with(pool_id, kind, move |db| execute(db, policy, &request))
            .await
    }

    /// Run `work` as a tracked job for `pool_id`.
    ///
    /// `work` must perform one complete unit of work per call; it is called
    /// again on transient failure.
    ///
    /// # Errors
    /// See [`JobRunner::run`].
    pub async fn run_with<F>(&self, pool_id: PoolId, kind: JobKind, work: F) -> Result<JobReport>
    where
        F: Fn(&Database) -> Result<JobOutcome> + Send + Sync + 'static,
    {
        let _claim = self.claim(pool_id)?;
        let work = Arc::new(work);

        let job_id = self
            .blocking(move |db| {
                db.unit(|uow| {
                    pool_store::get_pool(uow.conn(), pool_id)?;
                    job_store::insert_job(uow.conn(), pool_id, kind)
                })
            })
            .await?;
        info!(%job_id, %pool_id, %kind, "Job queued");

        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            let work = Arc::clone(&work);
            let result = self
                .blocking(move |db| {
                    db.unit(|uow| job_store::mark_running(uow.conn(), job_id))?;
                    work(db)
                })
                .await;

            match result {
                Ok(outcome) => {
                    self.blocking(move |db| {
                        db.unit(|uow| job_store::mark_completed(uow.conn(), job_id))
                    })
                    .await?;
                    info!(%job_id, %pool_id, %kind, attempts = attempt, "Job completed");
                    return Ok(JobReport {
                        job_id,
                        pool_id,
                        kind,
                        attempts: attempt,
                        outcome,
                    });
                }
                Err(e) if e.is_transient() && attempt < max_attempts => {
                    let delay = self.config.delay_for(attempt);
                    warn!(
                        %job_id,
                        %pool_id,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Job attempt failed, retrying"
                    );
                    let message = e.to_string();
                    if let Err(record) = self
                        .blocking(move |db| {
                            db.unit(|uow| job_store::record_error(uow.conn(), job_id, &message, false))
                        })
                        .await
                    {
                        debug!(%job_id, error = %record, "Could not record job error");
                    }
                    sleep(delay).await;
                }
                Err(e) => {
                    error!(%job_id, %pool_id, %kind, attempts = attempt, error = %e, "Job failed");
                    let message = e.to_string();
                    let attempts = i32::try_from(attempt).unwrap_or(i32::MAX);
                    if let Err(record) = self
                        .blocking(move |db| {
                            db.unit(|uow| {
                                job_store::record_error(uow.conn(), job_id, &message, true)?;
                                uow.publish(Event::JobFailed {
                                    pool_id,
                                    kind,
                                    attempts,
                                    error: message.clone(),
                                });
                                Ok(())
                            })
                        })
                        .await
                    {
                        warn!(%job_id, error = %record, "Could not mark job failed");
                    }
                    return Err(Error::SettlementFailed {
                        pool_id,
                        attempts,
                        source: Box::new(e),
                    });
                }
            }
        }
    }

    fn claim(&self, pool_id: PoolId) -> Result<Claim> {
        self.claims.claim(pool_id)
    }

    async fn blocking<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Database) -> Result<T> + Send + 'static,
    {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || f(&db))
            .await
            .map_err(|e| Error::Connection(format!("job task aborted: {e}")))?
    }
}

fn execute(db: &Database, policy: LedgerPolicy, request: &JobRequest) -> Result<JobOutcome> {
    match request {
        JobRequest::Settle {
            pool_id,
            winning_option_id,
        } => {
            let engine = SettlementEngine::new(policy);
            db.unit(|uow| engine.settle(uow, *pool_id, *winning_option_id))
                .map(JobOutcome::Settled)
        }
        JobRequest::Refund {
            pool_id,
            entry_ids,
            reason,
        } => {
            let engine = RefundEngine::new(policy);
            db.unit(|uow| engine.refund(uow, *pool_id, entry_ids.as_deref(), reason))
                .map(JobOutcome::Refunded)
        }
    }
}
