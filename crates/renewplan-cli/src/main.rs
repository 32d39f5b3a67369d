//! renewplan - admin command line for the renewal plan recommendation service.
//!
//! Browse the B1 → B2 → B3 hierarchy, override recommendation percentages
//! with automatic or manual balancing, manage phone brands and import
//! spreadsheets.

mod cli;
mod commands;
mod format;

use std::io;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::Args;
use commands::Context;
use renewplan_core::Config;

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    init_tracing();
    let args = Args::parse();
    info!(command = ?args.command, "renewplan starting");

    let config = Config::load()?;
    let mut ctx = Context::new(config, args.api_url)?;
    commands::run(&mut ctx, args.command).await
}
