use axum::{
    middleware as axum_mw,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::handlers;
use crate::metrics::stream;
use crate::middleware::timing;
use crate::AppState;

/// Builds the full Axum `Router` with all routes and middleware.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // ── Event ingestion (collaborator reports) ──────────────
        .route("/api/events/command", post(handlers::events::record_command))
        .route("/api/events/external", post(handlers::events::record_external))
        .route("/api/events/error", post(handlers::events::record_error))
        // ── Simulation control ──────────────────────────────────
        .route("/api/simulate/start", post(handlers::simulate::start_simulation))
        .route("/api/simulate/stop", post(handlers::simulate::stop_simulation))
        .route("/api/simulate/status", get(handlers::simulate::simulation_status))
        // ── Read surface ────────────────────────────────────────
        .route("/api/status", get(handlers::status::get_status))
        .route("/api/metrics", get(stream::get_metrics))
        .route("/api/metrics/stream", get(stream::metrics_stream))
        // ── Provide shared state to all routes above ────────────
        .with_state(state)
        // ── Global middleware (applied bottom-up) ───────────────
        .layer(axum_mw::from_fn(timing::timing_middleware))
        .layer(CorsLayer::permissive())
}
