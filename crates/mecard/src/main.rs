//! mecard - Vehicle accessory bridge daemon
//!
//! Polls the vehicle data API for every configured vehicle and exposes the
//! resulting lock, battery, door, window and light state as host accessories.
//!
//! Usage:
//!   mecard [OPTIONS]
//!
//! Options:
//!   -f, --config <path>  Config file (default: mecard.toml)
//!
//! The `MECAR_TOKEN` environment variable overrides `api.token`.

mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use mecar_accessory::VehicleAccessory;
use mecar_api::{create_router, AppState};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{DaemonConfig, ServerConfig};

const DEFAULT_CONFIG_PATH: &str = "mecard.toml";
const TOKEN_ENV: &str = "MECAR_TOKEN";

/// Parsed command-line arguments
struct Args {
    config_path: String,
}

fn parse_args() -> anyhow::Result<Args> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let mut config_path = String::from(DEFAULT_CONFIG_PATH);

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-f" => {
                if i + 1 < args.len() {
                    config_path = args[i + 1].clone();
                    i += 2;
                } else {
                    anyhow::bail!("Missing argument for --config");
                }
            }
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            _ => {
                tracing::warn!("Unknown argument: {}", args[i]);
                i += 1;
            }
        }
    }

    Ok(Args { config_path })
}

fn print_help() {
    eprintln!(
        r#"mecard - Vehicle accessory bridge daemon

Usage: mecard [OPTIONS]

Options:
  -f, --config <path>  Config file (default: mecard.toml)
  -h, --help           Print this help message

Environment:
  MECAR_TOKEN          Bearer token for the vehicle API (overrides api.token)
  RUST_LOG             Log filter (default: mecard=info,mecar_accessory=info,...)

Examples:
  # Run with ./mecard.toml
  mecard

  # Run with an explicit config and a token from the environment
  MECAR_TOKEN=... mecard --config /etc/mecard/mecard.toml
"#
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "mecard=info,mecar_accessory=info,mecar_client=info,mecar_api=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting mecard (vehicle accessory bridge)");

    let args = parse_args()?;
    tracing::info!("Loading config from: {}", args.config_path);
    let mut config = DaemonConfig::load(&args.config_path)?;
    config.override_token(std::env::var(TOKEN_ENV).ok());
    config.validate()?;

    let client = Arc::new(config.api.client()?);
    tracing::info!(base_url = %client.base_url(), "Vehicle API client ready");

    let mut vehicles = Vec::with_capacity(config.vehicles.len());
    for vehicle in &config.vehicles {
        let accessory = VehicleAccessory::start(vehicle.clone(), client.clone())
            .with_context(|| format!("Failed to start accessory for {}", vehicle.vin))?;
        vehicles.push(accessory);
    }
    tracing::info!("Polling {} vehicle(s)", vehicles.len());

    let shutdown = CancellationToken::new();
    let server = match &config.server {
        Some(server) => {
            let listener = bind(server).await?;
            let state = AppState::new(vehicles.iter().map(|v| v.accessory().clone()));
            Some(tokio::spawn(serve(listener, state, shutdown.clone())))
        }
        None => {
            tracing::info!("No [server] section, HTTP surface disabled");
            None
        }
    };

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    tracing::info!("Shutting down");

    shutdown.cancel();
    for vehicle in vehicles {
        vehicle.teardown().await;
    }
    if let Some(server) = server {
        server.await??;
    }

    Ok(())
}

/// Bind the bridge API address
async fn bind(server: &ServerConfig) -> anyhow::Result<TcpListener> {
    let addr: SocketAddr = format!("{}:{}", server.host, server.port)
        .parse()
        .with_context(|| format!("Invalid server address {}:{}", server.host, server.port))?;

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("Listening on http://{}", addr);
    Ok(listener)
}

/// Serve the bridge API until `shutdown` fires
async fn serve(listener: TcpListener, state: AppState, shutdown: CancellationToken) -> anyhow::Result<()> {
    let app = create_router(state);
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;
    Ok(())
}
