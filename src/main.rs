//! uid-proxy
//!
//! Reverse proxy that flags users sending more than `MAXREQUESTS` requests
//! within `DURATION` seconds.
//!
//! ```text
//!                  ┌──────────────────────────────────────────────────────┐
//!   request ──────▶│ dispatcher ──event──▶ traffic monitor                │
//!                  │     │                     │ threshold crossed        │
//!                  │     │ snapshot()          ▼                          │
//!                  │     ◀──────────────── route table actor              │
//!                  │     │                                                │
//!                  │     ▼ X-Lb-Uid (+ suffix when flagged)               │
//!   response ◀─────│ forward ─────────────────────────────────────────────┼──▶ default backend
//!                  └──────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use uid_proxy::config::{
    apply_env_overrides, load_config, loader::ENV_LOG_LEVEL, validation::validate_config,
    ConfigError, ProxyConfig,
};
use uid_proxy::observability::{logging, metrics};
use uid_proxy::{HttpServer, RedirectLists, Shutdown};

#[derive(Parser)]
#[command(name = "uid-proxy")]
#[command(about = "Traffic-aware reverse proxy", long_about = None)]
struct Cli {
    /// Optional TOML configuration file; environment variables override it.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ProxyConfig::default(),
    };

    let log_level = std::env::var(ENV_LOG_LEVEL)
        .unwrap_or_else(|_| config.observability.log_level.clone());
    logging::init(&log_level);

    tracing::info!("uid-proxy v{} starting", env!("CARGO_PKG_VERSION"));

    apply_env_overrides(&mut config);
    validate_config(&config).map_err(ConfigError::Validation)?;

    tracing::info!(
        max_requests = config.traffic.max_requests,
        window_secs = config.traffic.window_secs,
        ban_period_secs = config.traffic.ban_period_secs,
        stats_period_secs = config.observability.stats_period_secs,
        "Traffic limits configured"
    );

    let lists = RedirectLists::load(&config.lists)?;

    if config.observability.metrics_enabled {
        // Address was checked by validate_config.
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    shutdown.trigger_on_signal();

    let server = HttpServer::new(config, lists)?;
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
