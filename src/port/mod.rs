//! Trait definitions (hexagonal ports). Depend only on domain.
//!
//! The ledger core publishes committed events through the
//! [`outbound::notifier::Notifier`] port; adapters decide what to do with
//! them (log, invalidate caches, notify users).

pub mod outbound;

pub use outbound::notifier::{
    BalanceEvent, Event, JoinEvent, Notifier, NotifierRegistry, SettlementEvent,
};
