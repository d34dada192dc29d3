//! # Telemorph CLI Module
//!
//! This module implements the CLI interface for Telemorph.
//!
//! ## Available Commands
//!
//! - `server` - Start the HTTP server
//! - `translate` - Translate notifications from a file
//! - `translators` - List translators and their output paths
//! - `check-config` - Validate the configuration file

mod commands;

use crate::config::{DEFAULT_CONFIG_FILE, TelemorphConfig};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use telemorph_core::TelemorphError;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Telemorph - streaming telemetry translation
///
/// Turns vendor-native telemetry notifications into vendor-neutral ones.
#[derive(Parser, Debug)]
#[command(name = "telemorph")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to the TOML configuration file
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start HTTP server
    Server {
        /// Host to bind to (overrides the config file)
        #[arg(short = 'H', long)]
        host: Option<String>,

        /// Port to bind to (overrides the config file)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Translate notifications from a file (JSON array or JSON lines)
    Translate {
        /// Path to the input file
        #[arg(short, long)]
        file: PathBuf,

        /// Device vendor (overrides the config file)
        #[arg(long)]
        vendor: Option<String>,

        /// Device model (overrides the config file)
        #[arg(long)]
        model: Option<String>,

        /// Device software version (overrides the config file)
        #[arg(long = "os-version")]
        os_version: Option<String>,
    },

    /// List translators and their output paths
    Translators,

    /// Validate the configuration file
    CheckConfig,
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments and loaded configuration.
pub async fn execute(cli: Cli, config: TelemorphConfig) -> Result<(), TelemorphError> {
    let json_mode = cli.json_mode;

    match cli.command {
        Some(Commands::Server { host, port }) => {
            let host = host.unwrap_or_else(|| config.server.host.clone());
            let port = port.unwrap_or(config.server.port);
            cmd_server(&config, &host, port).await
        }
        Some(Commands::Translate {
            file,
            vendor,
            model,
            os_version,
        }) => {
            let mut device = config.device.clone();
            if let Some(vendor) = vendor {
                device.vendor = vendor;
            }
            if let Some(model) = model {
                device.model = model;
            }
            if let Some(version) = os_version {
                device.version = version;
            }
            cmd_translate(&config, &device, &file, cli.quiet)
        }
        Some(Commands::Translators) | None => cmd_translators(&config, json_mode),
        Some(Commands::CheckConfig) => cmd_check_config(&cli.config, &config, json_mode),
    }
}
