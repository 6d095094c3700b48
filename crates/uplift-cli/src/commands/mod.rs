//! CLI command definitions and dispatch

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use uplift_core::config::Config;

pub mod config;
pub mod upload;

/// Uplift - upload files to a remote store
#[derive(Parser)]
#[command(name = "uplift")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand)]
pub enum Command {
    /// Upload one or more files to the configured endpoint
    Upload(UploadArgs),

    /// Manage configuration
    Config(ConfigArgs),
}

/// Arguments for the upload command
#[derive(Parser)]
pub struct UploadArgs {
    /// Files to upload
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Endpoint URL (overrides the configured endpoint)
    #[arg(short, long)]
    pub endpoint: Option<String>,

    /// Accepted file extensions, comma separated (e.g. "pdf,png")
    #[arg(long, value_delimiter = ',')]
    pub accept: Vec<String>,

    /// Print the final slot set as JSON
    #[arg(long)]
    pub json: bool,

    /// Suppress per-file status output
    #[arg(short, long)]
    pub quiet: bool,
}

/// Arguments for the config command
#[derive(Parser)]
pub struct ConfigArgs {
    /// Configuration action to perform
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Configuration actions
#[derive(Subcommand)]
pub enum ConfigAction {
    /// Get a configuration value
    Get {
        /// Configuration key (e.g. "transport.endpoint")
        key: String,
    },

    /// Set a configuration value
    Set {
        /// Configuration key (e.g. "transport.endpoint")
        key: String,

        /// Value to set
        value: String,
    },

    /// Show the full configuration
    Show,

    /// Reset the configuration to defaults
    Reset,
}

/// Load the configuration, falling back to defaults on any error
pub fn load_config() -> Config {
    match Config::load() {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!("Failed to load config, using defaults: {}", e);
            Config::default()
        }
    }
}
