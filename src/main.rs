use std::process::ExitCode;

use anyhow::Context;
use clap::{CommandFactory, Parser};
use tracing::{debug, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use ultrathink::{
    cli::{self, Cli},
    config::{Config, LogFormat},
    storage::FileStorage,
    ThinkingEngine,
};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let args = Cli::parse();

    if args.wants_help() {
        Cli::command().print_help().context("failed to print help")?;
        return Ok(ExitCode::SUCCESS);
    }

    // Load configuration
    let mut config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            let result = cli::CliResult::failure(&e);
            eprintln!("{}", result.output);
            return Ok(ExitCode::from(result.exit_code));
        }
    };
    if let Some(dir) = &args.sessions_dir {
        config.storage.sessions_dir = dir.clone();
    }

    // Initialize logging
    init_logging(&config);

    info!(version = env!("CARGO_PKG_VERSION"), "UltraThink starting");

    let storage = FileStorage::new(&config.storage);
    debug!(path = %storage.root().display(), "Session storage initialized");

    let engine = ThinkingEngine::new(storage);
    let result = cli::execute(args, &engine).await;

    if result.is_error() {
        eprintln!("{}", result.output);
    } else {
        println!("{}", result.output);
    }

    Ok(ExitCode::from(result.exit_code))
}

/// Initialize tracing/logging; stdout is reserved for the JSON response.
fn init_logging(config: &Config) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}
