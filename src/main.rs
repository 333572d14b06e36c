//! rate-gate
//!
//! ```text
//!     Client Request
//!     ──────────────▶ TraceLayer ─▶ intercept ──(429 Rate limit exceeded)──▶ client
//!                                      │
//!                                      ▼ admitted, record = now
//!                                  [timeout] ─▶ request id ─▶ routes
//!                                      │
//!     Client Response                  ▼
//!     ◀────────────── X-Process-Time (+ X-Request-ID) added on the way out
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use rate_gate::config::{load_config, validate_config, ConfigError, GateConfig};
use rate_gate::observability::{logging, metrics};
use rate_gate::{HttpServer, Shutdown};

#[derive(Parser)]
#[command(name = "rate-gate")]
#[command(about = "HTTP front end with per-client rate limiting and request timing", long_about = None)]
struct Cli {
    /// TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override listener.bind_address.
    #[arg(short, long)]
    bind: Option<String>,
}

fn resolve_config(cli: &Cli) -> Result<GateConfig, ConfigError> {
    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => GateConfig::default(),
    };
    if let Some(bind) = &cli.bind {
        config.listener.bind_address = bind.clone();
        validate_config(&config).map_err(ConfigError::Validation)?;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = resolve_config(&cli)?;

    logging::init(&config.observability.log_level);

    tracing::info!("rate-gate v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        window_ms = config.rate_limit.window_ms,
        request_timeout_secs = ?config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        let addr: SocketAddr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr);
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    shutdown.trigger_on_signal();

    HttpServer::new(config).run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
