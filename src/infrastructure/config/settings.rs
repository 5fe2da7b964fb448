//! Application configuration loading and validation.
//!
//! Provides the main [`Config`] struct that aggregates all settings.
//! Configuration is loaded from a TOML file; the database location can be
//! overridden with the `PARIMUTUEL_DATABASE` environment variable.
//!
//! # Example
//!
//! ```no_run
//! use parimutuel::infrastructure::config::settings::Config;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load("config.toml")?;
//!     config.init_logging();
//!     Ok(())
//! }
//! ```

use std::path::Path;

use rust_decimal::Decimal;
use serde::Deserialize;

use super::jobs::JobsConfig;
use super::ledger::LedgerConfig;
use super::logging::LoggingConfig;
use crate::error::{ConfigError, Result};

/// Environment variable overriding [`Config::database`].
pub const DATABASE_ENV: &str = "PARIMUTUEL_DATABASE";

/// Largest supported number of currency decimal places.
const MAX_MINOR_UNITS: u32 = 8;

/// Main application configuration.
///
/// Load from a TOML file using [`Config::load`] or parse directly with
/// [`Config::parse_toml`]. Every section is optional.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Path to the SQLite database file.
    ///
    /// Defaults to "parimutuel.db" in the current directory.
    #[serde(default = "default_database_path")]
    pub database: String,

    /// Logging and tracing configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Currency precision and default company cut.
    #[serde(default)]
    pub ledger: LedgerConfig,

    /// Settlement job retry policy.
    #[serde(default)]
    pub jobs: JobsConfig,
}

fn default_database_path() -> String {
    "parimutuel.db".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: default_database_path(),
            logging: LoggingConfig::default(),
            ledger: LedgerConfig::default(),
            jobs: JobsConfig::default(),
        }
    }
}

impl Config {
    /// Parse configuration from TOML content.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The TOML content is malformed
    /// - Validation fails (e.g., a company cut above 100%)
    #[allow(clippy::result_large_err)]
    pub fn parse_toml(content: &str) -> Result<Self> {
        let mut config: Self = toml::from_str(content).map_err(ConfigError::Parse)?;

        if let Ok(database) = std::env::var(DATABASE_ENV) {
            if !database.trim().is_empty() {
                config.database = database;
            }
        }

        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file cannot be read
    /// - The TOML content is malformed
    /// - Validation fails
    #[allow(clippy::result_large_err)]
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        Self::parse_toml(&content)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    /// Returns [`ConfigError::MissingField`] or [`ConfigError::InvalidValue`]
    /// naming the first offending field.
    #[allow(clippy::result_large_err)]
    pub fn validate(&self) -> Result<()> {
        if self.database.trim().is_empty() {
            return Err(ConfigError::MissingField { field: "database" }.into());
        }

        if !matches!(self.logging.format.as_str(), "pretty" | "json") {
            return Err(ConfigError::InvalidValue {
                field: "format",
                reason: "must be \"pretty\" or \"json\"".to_string(),
            }
            .into());
        }

        if self.ledger.minor_units > MAX_MINOR_UNITS {
            return Err(ConfigError::InvalidValue {
                field: "minor_units",
                reason: format!("must be at most {MAX_MINOR_UNITS}"),
            }
            .into());
        }
        let cut = self.ledger.default_company_cut_percent;
        if cut < Decimal::ZERO || cut > Decimal::ONE_HUNDRED {
            return Err(ConfigError::InvalidValue {
                field: "default_company_cut_percent",
                reason: "must be between 0 and 100".to_string(),
            }
            .into());
        }

        if self.jobs.max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_attempts",
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }
        if self.jobs.initial_delay_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "initial_delay_ms",
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }
        if self.jobs.max_delay_ms < self.jobs.initial_delay_ms {
            return Err(ConfigError::InvalidValue {
                field: "max_delay_ms",
                reason: "must be >= initial_delay_ms".to_string(),
            }
            .into());
        }
        if self.jobs.backoff_multiplier < 1.0 {
            return Err(ConfigError::InvalidValue {
                field: "backoff_multiplier",
                reason: "must be >= 1.0".to_string(),
            }
            .into());
        }

        Ok(())
    }

    /// Initialize logging with the configured settings.
    pub fn init_logging(&self) {
        self.logging.init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use rust_decimal_macros::dec;

    #[test]
    fn empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        config.validate().unwrap();
        assert_eq!(config.database, "parimutuel.db");
        assert_eq!(config.ledger.minor_units, 2);
        assert_eq!(config.ledger.default_company_cut_percent, dec!(10));
        assert_eq!(config.jobs.max_attempts, 5);
        assert_eq!(config.logging.format, "pretty");
    }

    #[test]
    fn sections_override_defaults() {
        let config: Config = toml::from_str(
            r#"
database = "/var/lib/parimutuel/ledger.db"

[ledger]
minor_units = 0
default_company_cut_percent = "12.5"

[jobs]
max_attempts = 3
initial_delay_ms = 50
max_delay_ms = 500
backoff_multiplier = 3.0
"#,
        )
        .unwrap();
        config.validate().unwrap();

        let policy = config.ledger.policy();
        assert_eq!(policy.minor_units, 0);
        assert_eq!(policy.default_company_cut_percent, dec!(12.5));
        assert_eq!(config.jobs.max_attempts, 3);
    }

    #[test]
    fn cut_above_one_hundred_is_rejected() {
        let config: Config =
            toml::from_str("[ledger]\ndefault_company_cut_percent = \"150\"\n").unwrap();
        assert!(matches!(
            config.validate(),
            Err(Error::Config(ConfigError::InvalidValue {
                field: "default_company_cut_percent",
                ..
            }))
        ));
    }

    #[test]
    fn shrinking_backoff_is_rejected() {
        let config: Config = toml::from_str("[jobs]\nbackoff_multiplier = 0.5\n").unwrap();
        assert!(matches!(
            config.validate(),
            Err(Error::Config(ConfigError::InvalidValue {
                field: "backoff_multiplier",
                ..
            }))
        ));
    }

    #[test]
    fn unknown_log_format_is_rejected() {
        let config: Config = toml::from_str("[logging]\nformat = \"xml\"\n").unwrap();
        assert!(config.validate().is_err());
    }
}
