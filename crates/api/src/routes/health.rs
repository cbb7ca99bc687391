use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;
use serde_json::{json, Value};

use crate::AppState;

pub fn health_router() -> Router<AppState> {
    Router::new()
        .route("/", get(alive))
        .route("/healthz", get(healthz))
}

/// Plain-text liveness probe for hosting platforms.
async fn alive() -> &'static str {
    "StreakBot is alive"
}

/// JSON health report with uptime and the last finished cycle.
async fn healthz(State(state): State<AppState>) -> Json<Value> {
    let last_cycle = state.last_cycle.read().await.clone();
    Json(json!({
        "status": "ok",
        "uptime_secs": (Utc::now() - state.started_at).num_seconds(),
        "last_cycle": last_cycle,
    }))
}
