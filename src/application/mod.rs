//! Application services (use cases).
//!
//! Every money-moving component takes a `&mut UnitOfWork` and never opens a
//! transaction of its own, so callers can compose them into one atomic unit.
//!
//! - [`wallet`] - Wallet balances and the append-only transaction log
//! - [`idempotency`] - Reference claims that make retries safe
//! - [`rollover`] - Carry-over balance between pools
//! - [`pool_admin`] - Pool creation and lifecycle transitions
//! - [`join`] - Staking on a pool option
//! - [`winmeter`] - Advisory payout estimates
//! - [`settlement`] - Company cut, proportional payouts, rollover
//! - [`refund`] - Returning stakes for some or all entries
//! - [`deposit`] - Confirmed external deposits
//! - [`job`] - Tracked settlement and refund jobs with retry
//! - [`cache`] - Pool summary cache
//! - [`ledger`] - Facade over all of the above

pub mod cache;
pub mod deposit;
pub mod idempotency;
pub mod job;
pub mod join;
pub mod ledger;
pub mod pool_admin;
pub mod refund;
pub mod rollover;
pub mod settlement;
pub mod wallet;
pub mod winmeter;

pub use ledger::Ledger;
