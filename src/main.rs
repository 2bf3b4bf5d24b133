// =============================================================================
// Momentum Pick — Main Entry Point
// =============================================================================
//
// Daily momentum screener for the Korean equity market. Each request to
// `/api/stock-analysis` screens the whole listing of one market and returns
// five ranked/filtered screens. Nothing is persisted between requests.
// =============================================================================

// ── Module declarations ──────────────────────────────────────────────────────
mod api;
mod app_state;
mod indicators;
mod market_data;
mod ranking;
mod runtime_config;
mod screener;
mod types;

use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::app_state::AppState;
use crate::market_data::krx::KrxClient;
use crate::market_data::{PriceHistorySource, RequestPacer};
use crate::runtime_config::RuntimeConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Momentum Pick starting up");

    let config_path =
        std::env::var("MOMENTUM_CONFIG").unwrap_or_else(|_| "runtime_config.json".into());
    let mut config = RuntimeConfig::load(&config_path).unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        RuntimeConfig::default()
    });
    config.apply_env_overrides();
    config.validate().context("invalid runtime config")?;

    info!(
        market = %config.market,
        top_n = config.top_n,
        max_concurrency = config.max_concurrency,
        min_request_interval_ms = config.min_request_interval_ms,
        sample_fallback = config.sample_fallback,
        "Screening configuration"
    );

    // ── 2. Price-history source ──────────────────────────────────────────
    let pacer = Arc::new(RequestPacer::new(
        config.max_concurrency,
        config.min_request_interval(),
    ));
    let source: Arc<dyn PriceHistorySource> = Arc::new(
        KrxClient::new(config.krx_base_url.clone(), config.http_timeout(), pacer.clone())
            .context("failed to build KRX client")?,
    );

    // ── 3. Shared state & API server ─────────────────────────────────────
    let bind_addr = config.bind_addr.clone();
    let state = Arc::new(AppState::new(config, source, pacer));
    let app = api::rest::router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind API server on {bind_addr}"))?;
    info!(addr = %bind_addr, "API server listening");

    // ── 4. Serve until Ctrl+C ────────────────────────────────────────────
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            warn!("Shutdown signal received, stopping gracefully");
        })
        .await
        .context("API server failed")?;

    info!("Momentum Pick shut down complete.");
    Ok(())
}
