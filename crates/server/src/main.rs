//! Sluice server binary.

use anyhow::{Context, Result};
use clap::Parser;
use figment::Figment;
use figment::providers::{Env, Format, Toml};
use sluice_core::config::AppConfig;
use sluice_server::{AppState, create_router};
use std::net::SocketAddr;
use std::path::Path;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Sluice - serves documents in size-capped partial-content fragments
#[derive(Parser, Debug)]
#[command(name = "sluiced")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(
        short,
        long,
        env = "SLUICE_CONFIG",
        default_value = "config/server.toml"
    )]
    config: String,
}

/// Load configuration from an optional TOML file overlaid with `SLUICE_`
/// environment variables (`SLUICE_SERVER__BIND=0.0.0.0:8080`).
fn load_config(config_path: &str) -> Result<AppConfig> {
    let mut figment = Figment::new();

    if Path::new(config_path).exists() {
        tracing::info!(config_path = %config_path, "Loading configuration from file");
        figment = figment.merge(Toml::file(config_path));
    } else {
        tracing::info!(
            config_path = %config_path,
            "No config file found, using defaults and environment variables"
        );
    }

    let config: AppConfig = figment
        .merge(Env::prefixed("SLUICE_").split("__").ignore(&["config"]))
        .extract()
        .context("failed to load configuration")?;

    config
        .validate()
        .map_err(anyhow::Error::msg)
        .context("invalid configuration")?;

    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Sluice v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config(&args.config)?;

    sluice_server::metrics::register_metrics();
    if config.server.metrics_enabled {
        tracing::info!("Prometheus metrics enabled at /metrics");
    }

    let storage = sluice_storage::from_config(&config.storage)
        .await
        .context("failed to initialize storage")?;

    // Fail fast instead of answering every request with a storage error
    storage
        .health_check()
        .await
        .context("storage health check failed")?;
    tracing::info!(backend = storage.backend_name(), "Storage backend ready");

    match config.content.cache_object.as_deref() {
        Some(name) => tracing::info!(
            cache_object = %name,
            search_subpaths = config.content.search_subpaths,
            "Archive cache enabled, loading on first request"
        ),
        None => tracing::info!("No archive cache configured, serving from storage only"),
    }

    let addr: SocketAddr = config.server.bind.parse().context("invalid bind address")?;
    let state = AppState::new(config, storage);
    tracing::info!(
        max_fragment_bytes = state.fragments.limit(),
        "Fragment size limit"
    );

    let app = create_router(state);

    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;
    axum::serve(listener, app).await?;

    Ok(())
}
