//! Uplift CLI - upload files with per-file cancellation, retry, and progress
//!
//! ## Quick Start
//!
//! ```bash
//! # Upload files
//! uplift upload report.pdf photo.png
//!
//! # Point at a different server
//! uplift config set transport.endpoint http://files.local:3030/api/file
//! ```

#![allow(clippy::doc_markdown)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::unused_async)]

use anyhow::Result;
use clap::Parser;

mod commands;

use commands::{Cli, Command};

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let cli = Cli::parse();

    match cli.command {
        Command::Upload(args) => commands::upload::run(args).await,
        Command::Config(args) => commands::config::run(args).await,
    }
}

/// Initialize the tracing subscriber for CLI output
fn init_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,uplift=info,uplift_core=info"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).without_time())
        .with(filter)
        .init();
}
