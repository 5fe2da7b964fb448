//! Settlement and refund job tracking.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::id::{EntryId, JobId, OptionId, PoolId};

text_enum! {
    pub enum JobKind {
        Settle => "settle",
        Refund => "refund",
    }
}

text_enum! {
    pub enum JobStatus {
        Queued => "queued",
        Running => "running",
        Completed => "completed",
        Failed => "failed",
    }
}

/// Work handed to the job runner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobRequest {
    Settle {
        pool_id: PoolId,
        winning_option_id: Option<OptionId>,
    },
    Refund {
        pool_id: PoolId,
        entry_ids: Option<Vec<EntryId>>,
        reason: String,
    },
}

impl JobRequest {
    #[must_use]
    pub fn pool_id(&self) -> PoolId {
        match self {
            Self::Settle { pool_id, .. } | Self::Refund { pool_id, .. } => *pool_id,
        }
    }

    #[must_use]
    pub fn kind(&self) -> JobKind {
        match self {
            Self::Settle { .. } => JobKind::Settle,
            Self::Refund { .. } => JobKind::Refund,
        }
    }
}

/// Tracker row for one job.
#[derive(Debug, Clone, Serialize)]
pub struct SettlementJob {
    pub id: JobId,
    pub pool_id: PoolId,
    pub kind: JobKind,
    pub status: JobStatus,
    pub attempts: i32,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
