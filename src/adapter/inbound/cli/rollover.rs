//! Handler for the `rollover` command group.

use serde_json::json;

use super::command::RolloverCommand;
use super::output;
use crate::application::Ledger;
use crate::error::Result;

/// Execute a `rollover` subcommand.
pub fn execute(command: RolloverCommand, ledger: &Ledger) -> Result<()> {
    match command {
        RolloverCommand::Balance => {
            let balance = ledger.rollover_balance()?;
            output::json_output(json!({ "command": "rollover.balance", "balance": balance }));
            output::section("Rollover");
            output::field("Balance", balance);
            if !balance.is_zero() {
                output::hint("create a pool with --include-rollover to seed it");
            }
            Ok(())
        }
    }
}
