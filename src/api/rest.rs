// =============================================================================
// REST API Endpoints — Axum 0.8
// =============================================================================
//
// All endpoints live under `/api/v1/`. Health is public. Everything else
// requires a valid Bearer token checked via the `AuthBearer` extractor.
//
// CORS is configured permissively; tighten `allow_origin` in production.
// =============================================================================

use std::sync::Arc;

use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde::Serialize;
use serde_json::Value;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::api::auth::AuthBearer;
use crate::app_state::AppState;
use crate::engine::PredictionRequest;
use crate::runtime_config::EngineConfig;

// =============================================================================
// Router construction
// =============================================================================

/// Build the full REST API router with CORS middleware and shared state.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // ── Public ──────────────────────────────────────────────────
        .route("/api/v1/health", get(health))
        // ── Authenticated ───────────────────────────────────────────
        .route("/api/v1/predict", post(predict))
        .route("/api/v1/decisions", get(decisions))
        .route("/api/v1/performance", get(performance))
        .route("/api/v1/drift", get(drift))
        .route("/api/v1/config", get(get_config).post(update_config))
        .route("/api/v1/control/reset", post(control_reset))
        // ── Middleware & State ───────────────────────────────────────
        .layer(cors)
        .with_state(state)
}

// =============================================================================
// Health (public)
// =============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    state_version: u64,
    uptime_seconds: u64,
    server_time: i64,
}

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let resp = HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        state_version: state.current_state_version(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        server_time: chrono::Utc::now().timestamp_millis(),
    };
    Json(resp)
}

// =============================================================================
// Prediction (authenticated)
// =============================================================================

async fn predict(
    _auth: AuthBearer,
    State(state): State<Arc<AppState>>,
    Json(request): Json<PredictionRequest>,
) -> impl IntoResponse {
    // The pipeline is CPU-bound; keep it off the async workers.
    let worker = state.clone();
    match tokio::task::spawn_blocking(move || worker.predict(&request)).await {
        Ok(envelope) => Json(envelope).into_response(),
        Err(e) => {
            warn!(error = %e, "prediction task failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": "prediction failed" })),
            )
                .into_response()
        }
    }
}

// =============================================================================
// Audit & learning state (authenticated)
// =============================================================================

async fn decisions(
    _auth: AuthBearer,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let decisions = state.recent_decisions.read().clone();
    Json(decisions)
}

async fn performance(
    _auth: AuthBearer,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let snapshot = state.context.ledger.lock().snapshot();
    Json(snapshot)
}

async fn drift(
    _auth: AuthBearer,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let snapshot = state.context.drift.lock().snapshot();
    Json(snapshot)
}

// =============================================================================
// Configuration (authenticated)
// =============================================================================

async fn get_config(
    _auth: AuthBearer,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let config = state.config.read().clone();
    Json(config)
}

/// Recursively overlay `patch` onto `base`. Objects merge key by key; any
/// other value replaces what was there.
fn merge_json(base: &mut Value, patch: Value) {
    match (base, patch) {
        (Value::Object(base_map), Value::Object(patch_map)) => {
            for (key, value) in patch_map {
                match base_map.get_mut(&key) {
                    Some(slot) => merge_json(slot, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

/// Apply a partial JSON update on top of `current`, validating the result.
fn apply_config_patch(current: &EngineConfig, patch: Value) -> Result<EngineConfig, String> {
    if !patch.is_object() {
        return Err("config update must be a JSON object".to_string());
    }
    let mut merged = serde_json::to_value(current).map_err(|e| e.to_string())?;
    merge_json(&mut merged, patch);
    serde_json::from_value(merged).map_err(|e| format!("invalid config: {e}"))
}

async fn update_config(
    _auth: AuthBearer,
    State(state): State<Arc<AppState>>,
    Json(patch): Json<Value>,
) -> Result<impl IntoResponse, (StatusCode, Json<Value>)> {
    let updated = {
        let mut config = state.config.write();
        let updated = apply_config_patch(&config, patch).map_err(|e| {
            (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({ "error": e })),
            )
        })?;
        *config = updated.clone();
        updated
    };

    // Save to disk (best-effort).
    if let Some(path) = &state.config_path {
        if let Err(e) = updated.save(path) {
            warn!(error = %e, "Failed to save engine config to disk");
        }
    }

    state.increment_version();
    info!("Engine config updated via API");

    Ok(Json(updated))
}

// =============================================================================
// Control (authenticated)
// =============================================================================

async fn control_reset(
    _auth: AuthBearer,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    state.reset_learning();
    warn!("Learning state RESET via API");

    Json(serde_json::json!({
        "status": "ok",
        "message": "Performance ledger and drift detector reset",
        "state_version": state.current_state_version(),
    }))
}
