//! Command-line front-end for the inventory store.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use inventory_store::{open_store, BackendKind, StoreConfig, StoreResult};

mod args;
mod commands;
mod logging;

use args::Cli;

const DEFAULT_STORE_FILE: &str = "data/products.json";

/// Layers flags and environment (already merged by clap) over the config
/// file, then defaults.
fn resolve_config(cli: &Cli) -> StoreResult<StoreConfig> {
    let mut config = match &cli.config {
        Some(path) => StoreConfig::from_file(path)?,
        None => StoreConfig::default(),
    };
    if let Some(backend) = cli.store {
        config.backend = backend;
    }
    if let Some(path) = &cli.store_file {
        config.path = Some(path.clone());
    }
    if config.backend == BackendKind::File && config.path.is_none() {
        config.path = Some(PathBuf::from(DEFAULT_STORE_FILE));
    }
    Ok(config)
}

fn run(cli: Cli) -> StoreResult<()> {
    let config = resolve_config(&cli)?;
    let store = open_store(&config)?;
    let timeout = cli.timeout_ms.map(Duration::from_millis);
    commands::execute(store.as_ref(), cli.command, timeout)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init_logging(&cli.log_level);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
