//! Parimutuel - ledger and settlement core for pari-mutuel wagering pools.
//!
//! Users hold wallet balances, stake on one option of a pool, and the pool is
//! later settled: the company cut comes off the top, the rest is shared
//! among the winning stakes in proportion, and a pool nobody won rolls its
//! payout into the next pool that opts in.
//!
//! # Architecture
//!
//! - [`domain`] - Storage-agnostic types, state machines, payout arithmetic
//! - [`application`] - Wallet ledger, pool engines, job runner, facade
//! - [`port`] - The notifier port for post-commit events
//! - [`adapter`] - SQLite storage, notifiers, and the CLI
//! - [`infrastructure`] - Configuration loading and logging setup
//! - [`error`] - Error types for the crate
//!
//! Every money-moving operation runs inside one
//! [`UnitOfWork`](adapter::outbound::sqlite::unit::UnitOfWork): a
//! `BEGIN IMMEDIATE` SQLite transaction that either commits every ledger
//! row it wrote or none.
//!
//! # Example
//!
//! ```no_run
//! use parimutuel::application::Ledger;
//! use parimutuel::domain::UserId;
//! use parimutuel::infrastructure::config::settings::Config;
//!
//! fn main() -> parimutuel::error::Result<()> {
//!     let config = Config::load("parimutuel.toml")?;
//!     let ledger = Ledger::open(&config)?;
//!     let balance = ledger.balance(&UserId::from("alice"))?;
//!     println!("{balance}");
//!     Ok(())
//! }
//! ```

pub mod adapter;
pub mod application;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod port;

#[cfg(any(test, feature = "testkit"))]
pub mod testkit;
