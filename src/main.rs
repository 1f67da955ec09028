//! ft-admin gateway
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ─────────────▶  http (axum router, tower-http layers)
//!                        │
//!                        ▼
//!                     service (signer policy, one session per request)
//!                        │
//!           ┌────────────┼─────────────────┐
//!           ▼            ▼                 ▼
//!     chain::identity  chain::messages  chain::client
//!     (BIP-39/44 key)  (asset/ft msgs)  (HTTPS REST gateway)
//!           └────────────┼─────────────────┘
//!                        ▼
//!                 chain::transaction
//!        (simulate → sign → broadcast → confirm)
//! ```

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use ft_admin::chain::RestConnect;
use ft_admin::config::{load_config, AppConfig, SignerSecrets};
use ft_admin::observability::{logging, metrics};
use ft_admin::{AdminService, HttpServer, Shutdown};

#[derive(Parser)]
#[command(name = "ft-admin")]
#[command(about = "Fungible token administration gateway", long_about = None)]
struct Args {
    /// Path to the TOML configuration file. Defaults apply when omitted.
    #[arg(short, long, env = "FT_ADMIN_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => AppConfig::default(),
    };

    logging::init_logging(&config.observability);
    tracing::info!("ft-admin v{} starting", env!("CARGO_PKG_VERSION"));

    // Fail fast: the gateway is useless without both signers.
    let secrets = SignerSecrets::from_env()?;

    tracing::info!(
        bind_address = %config.listener.bind_address,
        endpoint = %config.chain.endpoint,
        chain_id = %config.chain.chain_id,
        tls = config.listener.tls.is_some(),
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let connect = Arc::new(RestConnect::new(config.chain.clone()));
    let service = AdminService::new(config.chain.clone(), secrets, connect)
        .with_request_budget(Duration::from_secs(config.timeouts.request_secs));

    let shutdown = Shutdown::new();
    shutdown.trigger_on_signal();

    let server = HttpServer::new(config, service);
    server.run(shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
