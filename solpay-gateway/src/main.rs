//! Solana Pay checkout gateway HTTP server.
//!
//! # Usage
//!
//! ```bash
//! # Run with default config (config.toml in current directory)
//! cargo run -p solpay-gateway --release
//!
//! # Run with custom config path
//! solpay-gateway --config /path/to/config.toml
//!
//! # Configure logging level
//! RUST_LOG=debug solpay-gateway
//! ```
//!
//! # Environment Variables
//!
//! - `CONFIG` - Path to TOML configuration file (default: `config.toml`)
//! - `HOST` - Override bind address (default: `0.0.0.0`)
//! - `PORT` - Override port (default: `4021`)
//! - `RUST_LOG` - Log level filter (default: `info`)
//!
//! A `.env` file in the working directory is loaded first.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::Method;
use clap::Parser;
use solpay::{MemorySessionStore, SessionManager};
use tower_http::cors;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use solpay_gateway::config::GatewayConfig;
use solpay_gateway::handlers::{AppState, GatewayState, gateway_router};
use solpay_gateway::util::SigDown;

/// Solana Pay checkout gateway.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(long, env = "CONFIG", default_value = "config.toml")]
    config: String,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    if let Err(e) = run(&args).await {
        tracing::error!("Gateway failed: {e}");
        std::process::exit(1);
    }
}

async fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = GatewayConfig::load_from(&args.config)?;
    let settings = config.checkout_settings()?;
    let confirmer = config.confirmer()?;
    tracing::info!(
        host = %config.host,
        port = config.port,
        enabled = config.enabled,
        cluster = ?config.cluster(),
        rpc = %config.rpc_endpoint(),
        currency = %config.currency,
        "Loaded configuration"
    );

    if !settings.enabled {
        tracing::warn!("Gateway disabled: session requests will be refused");
    }
    if settings.merchant.is_none() {
        tracing::warn!("merchant_wallet not set (missing env var?): session requests will be refused");
    }

    let store = MemorySessionStore::with_ttl(config.session_ttl()?);
    let sessions = SessionManager::new(Arc::new(store));
    let state: GatewayState = Arc::new(AppState::new(sessions, confirmer, settings));

    let app = gateway_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(
            cors::CorsLayer::new()
                .allow_origin(cors::Any)
                .allow_methods([Method::GET, Method::POST])
                .allow_headers(cors::Any),
        );

    let sig_down = SigDown::try_new()?;
    let shutdown = sig_down.cancellation_token();

    let addr = SocketAddr::new(config.host, config.port);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Gateway listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    sig_down.recv().await;
    tracing::info!("Gateway shut down gracefully");
    Ok(())
}
