//! Command-line interface.
//!
//! [`run`] dispatches a parsed [`command::Commands`] to its handler. Each
//! handler goes through the [`Ledger`] facade, so the CLI never touches the
//! store directly.

pub mod command;
pub mod config;
pub mod output;
pub mod pool;
pub mod rollover;
pub mod wallet;

use std::path::Path;

use crate::application::Ledger;
use crate::error::Result;
use crate::infrastructure::config::settings::Config;
use command::Commands;

/// Config file read when `--config` is not given and it exists.
pub const DEFAULT_CONFIG_FILE: &str = "parimutuel.toml";

/// Load the effective configuration.
///
/// An explicit path must exist. Without one, `parimutuel.toml` in the
/// working directory is used when present and defaults otherwise. A
/// `--database` flag wins over both the file and the environment.
///
/// # Errors
/// Returns a config error for an unreadable, malformed, or invalid file.
pub fn load_config(path: Option<&Path>, database: Option<&str>) -> Result<Config> {
    let mut config = match path {
        Some(path) => Config::load(path)?,
        None if Path::new(DEFAULT_CONFIG_FILE).exists() => Config::load(DEFAULT_CONFIG_FILE)?,
        None => Config::parse_toml("")?,
    };
    if let Some(database) = database {
        config.database = database.to_string();
        config.validate()?;
    }
    Ok(config)
}

/// Run one command to completion.
///
/// # Errors
/// Propagates the handler's error; the binary prints it and exits 1.
pub async fn run(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Migrate => config::migrate(config),
        Commands::Config(cmd) => config::execute(cmd, config),
        Commands::Wallet(cmd) => wallet::execute(cmd, &Ledger::open(config)?),
        Commands::Pool(cmd) => pool::execute(cmd, &Ledger::open(config)?, config).await,
        Commands::Rollover(cmd) => rollover::execute(cmd, &Ledger::open(config)?),
    }
}
