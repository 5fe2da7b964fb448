use clap::Parser;
use tracing::debug;

use parimutuel::adapter::inbound::cli::command::Cli;
use parimutuel::adapter::inbound::cli::output::{self, OutputConfig};
use parimutuel::adapter::inbound::cli::{load_config, run};

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    output::configure(OutputConfig::new(cli.json, cli.quiet));

    let mut config = match load_config(cli.config.as_deref(), cli.database.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            output::error(&format!("Failed to load config: {e}"));
            std::process::exit(1);
        }
    };

    match cli.verbose {
        0 => {}
        1 => config.logging.level = "debug".into(),
        _ => config.logging.level = "trace".into(),
    }
    config.init_logging();
    debug!(database = %config.database, "parimutuel starting");

    if let Err(e) = run(cli.command, &config).await {
        output::error(&e.to_string());
        std::process::exit(1);
    }
}
