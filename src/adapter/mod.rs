//! Adapters at the edges of the ledger core.
//!
//! - [`inbound`] drives the core: the command-line interface.
//! - [`outbound`] is driven by it: SQLite storage and event notifiers.

pub mod inbound;
pub mod outbound;
