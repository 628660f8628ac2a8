// =============================================================================
// Outcome Oracle — Main Entry Point
// =============================================================================
//
// Serves the signal-ensemble forecasting engine over HTTP. Learning state
// (performance ledger, drift detector) lives for the life of the process;
// configuration is loaded from disk and saved back on shutdown.
// =============================================================================

// ── Module declarations ──────────────────────────────────────────────────────
mod api;
mod app_state;
mod decision_envelope;
mod drift_detector;
mod engine;
mod external;
mod feedback;
mod indicators;
mod performance;
mod regime;
mod runtime_config;
mod signals;
mod types;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::app_state::AppState;
use crate::engine::PredictionEngine;
use crate::runtime_config::EngineConfig;

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
    info!("║        Outcome Oracle — Starting Up                     ║");
    info!("╚══════════════════════════════════════════════════════════╝");

    let config_path = PathBuf::from(
        std::env::var("ORACLE_CONFIG_PATH").unwrap_or_else(|_| "engine_config.json".into()),
    );

    let config = EngineConfig::load(&config_path).unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        EngineConfig::default()
    });

    let admin_token = std::env::var("ORACLE_ADMIN_TOKEN").ok();
    if admin_token.as_deref().map_or(true, str::is_empty) {
        warn!("ORACLE_ADMIN_TOKEN not set; all authenticated endpoints will reject requests");
    }

    info!(
        min_history = config.decision.min_confirmed_history,
        min_signals = config.decision.min_signals,
        forced_uncertainty = config.decision.forced_uncertainty,
        "Engine configuration ready"
    );

    // ── 2. Build shared state ────────────────────────────────────────────
    let state = Arc::new(AppState::new(
        config,
        Some(config_path.clone()),
        PredictionEngine::default(),
        admin_token,
    ));

    // ── 3. Start the API server ──────────────────────────────────────────
    let bind_addr =
        std::env::var("ORACLE_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3001".into());

    let app = api::rest::router(state.clone());
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind API server to {bind_addr}"))?;
    info!(addr = %bind_addr, "API server listening. Press Ctrl+C to stop.");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("API server failed")?;

    // ── 4. Graceful shutdown ─────────────────────────────────────────────
    if let Err(e) = state.config.read().save(&config_path) {
        error!(error = %e, "Failed to save engine config on shutdown");
    }

    info!("Outcome Oracle shut down complete.");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for Ctrl+C");
        return;
    }
    warn!("Shutdown signal received, stopping gracefully");
}
