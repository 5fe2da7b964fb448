//! Notification adapters.
//!
//! Implements the `port::outbound::notifier::Notifier` trait for the
//! available backends.

pub mod log;

pub use log::LogNotifier;
