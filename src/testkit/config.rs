//! Canonical test configurations.
//!
//! Single source of truth for config structs used across tests.

use crate::infrastructure::config::jobs::JobsConfig;
use crate::infrastructure::config::settings::Config;

/// Job retry config with zero delays, no waiting in tests.
pub fn jobs(max_attempts: u32) -> JobsConfig {
    JobsConfig {
        max_attempts,
        initial_delay_ms: 0,
        max_delay_ms: 0,
        backoff_multiplier: 1.0,
    }
}

/// Full config pointing at `database`, with fast job retries.
pub fn config(database: &str) -> Config {
    Config {
        database: database.to_string(),
        jobs: jobs(3),
        ..Config::default()
    }
}
