use std::sync::Arc;
use std::time::Instant;

use axum::{routing::get, Router};
use couponbot_core::config::CouponConfig;

/// Shared state handed to the HTTP handlers. Read-only after startup.
pub struct AppState {
    pub config: CouponConfig,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(config: CouponConfig) -> Self {
        Self {
            config,
            started_at: Instant::now(),
        }
    }
}

/// Assemble the Axum router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(crate::http::health::alive_handler))
        .route("/health", get(crate::http::health::health_handler))
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}
