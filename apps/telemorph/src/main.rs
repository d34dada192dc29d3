//! # Telemorph - Streaming Telemetry Translation
//!
//! The main binary for the Telemorph translation engine.
//!
//! This application provides:
//! - HTTP REST API server (axum-based)
//! - CLI interface for offline translation
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                apps/telemorph (THE BINARY)              │
//! │                                                         │
//! │   ┌─────────────┐   ┌─────────────┐   ┌─────────────┐   │
//! │   │    CLI      │   │  HTTP API   │   │   Config    │   │
//! │   │   (clap)    │   │   (axum)    │   │   (toml)    │   │
//! │   └──────┬──────┘   └──────┬──────┘   └──────┬──────┘   │
//! │          └─────────────────┼─────────────────┘          │
//! │                            ▼                            │
//! │                  ┌──────────────────┐                   │
//! │                  │  telemorph-core  │                   │
//! │                  │   (THE LOGIC)    │                   │
//! │                  └──────────────────┘                   │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Start the HTTP server
//! telemorph server --host 0.0.0.0 --port 8080
//!
//! # Offline translation
//! telemorph translate -f notifications.jsonl --vendor Arista --os-version 4.28.1F
//! telemorph translators
//! telemorph check-config -c telemorph.toml
//! ```

use clap::Parser;
use telemorph::cli;
use telemorph::config::{LogFormat, TelemorphConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    let cli = cli::Cli::parse();

    // Config is loaded before tracing so `[log] format` can take effect.
    let config = match TelemorphConfig::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    init_tracing(config.log.format.with_env_override());

    if !cli.quiet {
        print_banner();
    }

    if let Err(e) = cli::execute(cli, config).await {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Install the global subscriber. TELEMORPH_LOG_FORMAT=json enables machine-parseable output.
fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "telemorph=info,telemorph_core=info,tower_http=debug".into());

    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}

/// Print the startup banner.
fn print_banner() {
    eprintln!(
        r#"
  ┌┬┐┌─┐┬  ┌─┐┌┬┐┌─┐┬─┐┌─┐┬ ┬
   │ ├┤ │  ├┤ │││││ │├┬┘├─┘├─┤
   ┴ └─┘┴─┘└─┘┴ ┴└─┘┴└─┴  ┴ ┴

  Telemetry Translation v{}
"#,
        env!("CARGO_PKG_VERSION")
    );
}
