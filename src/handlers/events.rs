use axum::{extract::State, Json};
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

use crate::errors::ErrorCategory;
use crate::AppState;

use super::Ack;

// ─── Request types ───────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct CommandEvent {
    pub successful: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExternalEvent {
    pub successful: bool,
    /// Clamped to zero if a buggy reporter sends a negative value.
    pub response_time_ms: i64,
}

/// Either an explicit category or an HTTP-like status code to
/// classify. An explicit category wins; with neither present the
/// event lands in `internal`.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorEvent {
    #[serde(default)]
    pub category: Option<ErrorCategory>,
    #[serde(default)]
    pub status_code: Option<u16>,
}

// ─── POST /api/events/command ────────────────────────────────────

pub async fn record_command(
    State(state): State<Arc<AppState>>,
    Json(event): Json<CommandEvent>,
) -> Json<Ack> {
    state.metrics.record_command(event.successful);
    Json(Ack::recorded())
}

// ─── POST /api/events/external ───────────────────────────────────

pub async fn record_external(
    State(state): State<Arc<AppState>>,
    Json(event): Json<ExternalEvent>,
) -> Json<Ack> {
    state
        .metrics
        .record_external_request(event.successful, event.response_time_ms);
    Json(Ack::recorded())
}

// ─── POST /api/events/error ──────────────────────────────────────

pub async fn record_error(
    State(state): State<Arc<AppState>>,
    Json(event): Json<ErrorEvent>,
) -> Json<Ack> {
    let category = resolve_category(&event);
    debug!(%category, "error reported");
    state.metrics.record_error(category);
    Json(Ack::recorded())
}

fn resolve_category(event: &ErrorEvent) -> ErrorCategory {
    match (event.category, event.status_code) {
        (Some(category), _) => category,
        (None, Some(status)) => ErrorCategory::from_status(status),
        (None, None) => ErrorCategory::Internal,
    }
}
