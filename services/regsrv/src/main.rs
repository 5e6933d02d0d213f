//! regsrv - Modbus endpoint registry
//!
//! Operator CLI over the connection, slave and register store.

use anyhow::{Context, Result};
use clap::Parser;
use std::process::ExitCode;
use tracing::{debug, error};

use regsrv::cli::{self, Cli};
use regsrv::{AppState, RegsrvConfig};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let mut config =
        RegsrvConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(db) = cli.db.clone() {
        config.database.path = db;
    }
    if cli.verbose {
        config.logging.level = "debug".to_string();
    }

    common::logging::init_with_config(config.log_config())
        .context("Failed to initialize logging")?;
    debug!("Using database {}", config.database.path);

    let state = AppState::open(&config).await?;

    match cli::execute(cli.command, &state).await {
        Ok(output) => {
            println!("{}", serde_json::to_string_pretty(&output)?);
            Ok(ExitCode::SUCCESS)
        },
        Err(e) => {
            error!("{}", e);
            eprintln!("{}", serde_json::to_string_pretty(&e.to_info())?);
            Ok(ExitCode::FAILURE)
        },
    }
}
