//! Romscope - Offline ROM, save and game-file identification
//!
//! Detects file formats from content and extension and prints the
//! metadata fields, properties and images they carry.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use romscope::cli::{self, Cli};
use romscope::config::Config;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // An explicit --config must parse; the default location falls back to defaults.
    let (config, config_err) = match &cli.config {
        Some(path) => (Config::load_from(path)?, None),
        None => {
            let path = Config::default_path();
            if path.exists() {
                match Config::load_from(&path) {
                    Ok(config) => (config, None),
                    Err(e) => (Config::default(), Some(e)),
                }
            } else {
                (Config::default(), None)
            }
        }
    };

    // Initialize logging
    let level = if cli.verbose { "debug" } else { config.general.log_level.as_str() };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(format!("romscope={level}")))
        .or_else(|_| EnvFilter::try_new("romscope=info"))?;
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr).compact())
        .with(filter)
        .init();

    if let Some(e) = config_err {
        tracing::warn!("Ignoring config: {:#}", e);
    }

    cli::commands::run(cli.command, &config)
}
