//! Handler for the `config` command group and `migrate`.

use serde_json::json;

use super::command::ConfigCommand;
use super::output;
use crate::application::Ledger;
use crate::error::Result;
use crate::infrastructure::config::settings::Config;

/// Execute a `config` subcommand.
///
/// The configuration was already loaded and validated by the time this runs,
/// so `validate` only has to report success.
pub fn execute(command: ConfigCommand, config: &Config) -> Result<()> {
    match command {
        ConfigCommand::Validate => {
            output::json_output(json!({ "command": "config.validate", "valid": true }));
            output::success("Configuration is valid");
            Ok(())
        }
        ConfigCommand::Show => {
            output::json_output(json!({
                "command": "config.show",
                "database": config.database,
                "logging": { "level": config.logging.level, "format": config.logging.format },
                "ledger": config.ledger.policy(),
                "jobs": {
                    "max_attempts": config.jobs.max_attempts,
                    "initial_delay_ms": config.jobs.initial_delay_ms,
                    "max_delay_ms": config.jobs.max_delay_ms,
                    "backoff_multiplier": config.jobs.backoff_multiplier,
                },
            }));

            output::section("Effective Configuration");
            output::field("Database", &config.database);

            output::section("Logging");
            output::field("Level", &config.logging.level);
            output::field("Format", &config.logging.format);

            output::section("Ledger");
            output::field("Minor units", config.ledger.minor_units);
            output::field(
                "Company cut",
                format!("{}%", config.ledger.default_company_cut_percent),
            );

            output::section("Jobs");
            output::field("Max attempts", config.jobs.max_attempts);
            output::field(
                "Backoff",
                format!(
                    "{}ms x{} up to {}ms",
                    config.jobs.initial_delay_ms,
                    config.jobs.backoff_multiplier,
                    config.jobs.max_delay_ms
                ),
            );
            Ok(())
        }
    }
}

/// Execute `migrate`.
pub fn migrate(config: &Config) -> Result<()> {
    Ledger::open(config)?;
    output::json_output(json!({ "command": "migrate", "database": config.database }));
    output::success(&format!("Database ready at {}", config.database));
    Ok(())
}
