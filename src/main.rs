// =============================================================================
// Ticker Dashboard — Main Entry Point
// =============================================================================
//
// Serves the login-gated chart API.  Users register and log in against the
// local SQLite user table; an authenticated session can request candlestick
// charts with MA, Bollinger, RSI and MACD overlays for any ticker.
// =============================================================================

// ── Module declarations ──────────────────────────────────────────────────────
mod api;
mod app_state;
mod chart;
mod credential_store;
mod dashboard;
mod indicators;
mod market_data;
mod runtime_config;
mod session;
mod types;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::app_state::AppState;
use crate::market_data::{MarketDataSource, YahooClient};
use crate::runtime_config::RuntimeConfig;

const CONFIG_PATH: &str = "dashboard_config.json";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("╔══════════════════════════════════════════════════════════╗");
    info!("║        Ticker Dashboard — Starting Up                    ║");
    info!("╚══════════════════════════════════════════════════════════╝");

    let mut config = RuntimeConfig::load(CONFIG_PATH).unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        let defaults = RuntimeConfig::default();
        if !Path::new(CONFIG_PATH).exists() {
            if let Err(e) = defaults.save(CONFIG_PATH) {
                warn!(error = %e, "Failed to write default config");
            }
        }
        defaults
    });
    config.apply_env_overrides();

    info!(
        bind_addr = %config.bind_addr,
        db_path = %config.db_path.display(),
        data_url = %config.data_base_url,
        "Configuration resolved"
    );

    // ── 2. Shared state & credential store ──────────────────────────────
    let market_data: Arc<dyn MarketDataSource> = Arc::new(YahooClient::new(
        config.data_base_url.clone(),
        Duration::from_secs(config.request_timeout_secs),
    )?);
    let state = Arc::new(AppState::new(config, market_data));

    state
        .credentials
        .ensure_schema()
        .context("failed to prepare user table")?;
    match state.credentials.user_count() {
        Ok(n) => info!(users = n, path = %state.credentials.path().display(), "User table ready"),
        Err(e) => warn!(error = %e, "Could not count registered users"),
    }

    // ── 3. Session pruning (every 10 minutes) ────────────────────────────
    let prune_state = state.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(600));
        loop {
            interval.tick().await;
            let removed = prune_state.sessions.prune_expired();
            if removed > 0 {
                info!(removed, remaining = prune_state.sessions.len(), "expired sessions pruned");
            }
        }
    });

    // ── 4. API server ────────────────────────────────────────────────────
    let bind_addr = state.config.bind_addr.clone();
    let app = api::rest::router(state.clone());
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind API server to {bind_addr}"))?;
    info!(addr = %bind_addr, "API server listening. Press Ctrl+C to stop.");

    // ── 5. Graceful shutdown ─────────────────────────────────────────────
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "Failed to listen for shutdown signal");
            }
            warn!("Shutdown signal received — stopping gracefully");
        })
        .await;

    if let Err(e) = served {
        error!(error = %e, "API server failed");
        return Err(e.into());
    }

    info!(uptime_secs = state.uptime_secs(), "Ticker Dashboard shut down complete.");
    Ok(())
}
