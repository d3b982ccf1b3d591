//! Sky protocol server.
//!
//! ```text
//!     Client ──TLS──▶ net::listener ──▶ session::connection ──▶ content resolver
//!                                               │
//!                                               └──(DRIFT)──▶ upload store
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;

use sky_server::config::{load_config, LogFormat, ServerConfig};
use sky_server::lifecycle::{wait_for_signal, Shutdown};
use sky_server::observability::{logging, metrics};
use sky_server::{build_context, SkyServer};

#[derive(Parser, Debug)]
#[command(name = "sky-server", version, about = "Serve the Sky protocol over TLS")]
struct Cli {
    /// TOML configuration file. Built-in defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override listener.bind_address.
    #[arg(long)]
    bind: Option<String>,

    /// Override observability.log_level.
    #[arg(long)]
    log_level: Option<String>,

    /// Override observability.log_format (text or json).
    #[arg(long)]
    log_format: Option<LogFormat>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ServerConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }
    if let Some(level) = cli.log_level {
        config.observability.log_level = level;
    }
    if let Some(format) = cli.log_format {
        config.observability.log_format = format;
    }
    sky_server::config::validate_config(&config)
        .map_err(sky_server::config::ConfigError::Validation)?;

    logging::init_logging(&config.observability.log_level, config.observability.log_format)?;

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "sky-server starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        max_connections = config.listener.max_connections,
        read_timeout_secs = config.limits.read_timeout_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        let addr: SocketAddr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr)?;
    }

    let ctx = build_context(&config)?;
    let server = SkyServer::bind(&config, ctx).await?;

    let shutdown = Shutdown::new();
    let stop = shutdown.subscribe();
    let signals = shutdown.clone();
    tokio::spawn(async move {
        match wait_for_signal().await {
            Ok(signal) => tracing::info!(signal, "Shutdown signal received"),
            Err(err) => tracing::error!(error = %err, "Signal handler failed, shutting down"),
        }
        signals.trigger();
    });

    server.run(stop).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
