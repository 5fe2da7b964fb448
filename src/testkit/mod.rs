//! Shared test utilities available to both unit and integration tests.
//!
//! Enabled via `#[cfg(test)]` (unit tests) or the `testkit` feature
//! (integration tests).
//!
//! # Modules
//!
//! - [`db`]: `TempDb`, a migrated file-backed SQLite database removed on drop.
//! - [`notifier`]: `RecordingNotifier` for asserting on post-commit events.
//! - [`fixtures`]: Builders for funded wallets, open pools, and entries.
//! - [`config`]: Canonical test configurations.

pub mod config;
pub mod db;
pub mod fixtures;
pub mod notifier;
