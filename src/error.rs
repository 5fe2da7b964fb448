use thiserror::Error;

use crate::domain::error::DomainError;
use crate::domain::id::PoolId;

/// Configuration-related errors with structured variants.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[source] toml::de::Error),
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Domain(#[from] DomainError),

    /// A settlement or refund job exhausted its attempts.
    #[error("settlement of pool {pool_id} failed after {attempts} attempt(s): {source}")]
    SettlementFailed {
        pool_id: PoolId,
        attempts: i32,
        #[source]
        source: Box<Error>,
    },

    #[error("a job for pool {pool_id} is already running")]
    JobInProgress { pool_id: PoolId },

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("parse error: {0}")]
    Parse(String),

    /// Stored state contradicts itself; retrying cannot help.
    #[error("ledger integrity error: {0}")]
    Integrity(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Caller mistakes that must not be retried automatically.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(self, Error::Domain(_))
    }

    /// Store failures a job runner may retry with backoff.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Database(_) | Error::Connection(_))
    }

    /// The domain error underneath, if any.
    #[must_use]
    pub fn as_domain(&self) -> Option<&DomainError> {
        match self {
            Error::Domain(e) => Some(e),
            Error::SettlementFailed { source, .. } => source.as_domain(),
            _ => None,
        }
    }
}

impl From<diesel::result::Error> for Error {
    fn from(err: diesel::result::Error) -> Self {
        Error::Database(err.to_string())
    }
}
