//! Infrastructure configuration modules.

pub mod jobs;
pub mod ledger;
pub mod logging;
pub mod settings;
