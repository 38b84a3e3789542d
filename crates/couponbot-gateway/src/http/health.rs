use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::app::AppState;

/// Fixed body returned to uptime monitors.
pub const ALIVE_BODY: &str = "Server is alive";

/// GET /: liveness probe for external uptime monitors. Always 200.
pub async fn alive_handler() -> (StatusCode, &'static str) {
    (StatusCode::OK, ALIVE_BODY)
}

/// GET /health: same guarantee as `/`, with process metadata.
///
/// Does not probe the coupon table, the cursor file or the Graph API.
pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_secs": state.started_at.elapsed().as_secs(),
        "schedule": state.config.scheduler.schedule.to_string(),
    }))
}
