use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use crate::AppState;

/// Headline figures for a quick `curl /api/status` — the full detail
/// lives at `/api/metrics`.
#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub started_at: String,
    pub uptime_seconds: f64,
    pub commands_total: u64,
    pub command_success_rate_percent: f64,
    pub commands_per_second: f64,
    pub external_requests_total: u64,
    pub average_response_time_ms: f64,
    pub simulation_running: bool,
}

// ─── GET /api/status ─────────────────────────────────────────────

pub async fn get_status(State(state): State<Arc<AppState>>) -> Json<StatusReport> {
    let s = state.metrics.snapshot();
    Json(StatusReport {
        started_at: s.started_at,
        uptime_seconds: s.uptime_seconds,
        commands_total: s.commands_total,
        command_success_rate_percent: s.command_success_rate_percent,
        commands_per_second: s.commands_per_second,
        external_requests_total: s.external_requests_total,
        average_response_time_ms: s.average_response_time_ms,
        simulation_running: state.sim_running.load(Ordering::SeqCst),
    })
}
