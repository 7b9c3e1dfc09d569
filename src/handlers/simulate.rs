use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

use crate::errors::RelayError;
use crate::AppState;

// ─── Request / response types ────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct SimulationConfig {
    /// Number of concurrent Tokio tasks emulating command traffic
    #[serde(default = "default_concurrency")]
    pub concurrency: u32,

    /// How long the simulation runs (seconds)
    #[serde(default = "default_duration")]
    pub duration_secs: u64,

    /// Percentage of simulated commands that fail (0–100)
    #[serde(default = "default_error_pct")]
    pub error_pct: u8,
}

fn default_concurrency() -> u32 {
    8
}
fn default_duration() -> u64 {
    30
}
fn default_error_pct() -> u8 {
    10
}

#[derive(Debug, Serialize)]
pub struct SimulationStatus {
    pub running: bool,
    pub message: String,
}

// ─── POST /api/simulate/start ────────────────────────────────────

pub async fn start_simulation(
    State(state): State<Arc<AppState>>,
    Json(config): Json<SimulationConfig>,
) -> Result<Json<SimulationStatus>, RelayError> {
    // Guard: only one simulation at a time
    if state.sim_running.load(Ordering::SeqCst) {
        return Err(RelayError::SimulationRunning);
    }

    if config.concurrency == 0 || config.concurrency > 200 {
        return Err(RelayError::Validation(
            "concurrency must be between 1 and 200".into(),
        ));
    }
    if config.duration_secs == 0 || config.duration_secs > 300 {
        return Err(RelayError::Validation(
            "duration_secs must be between 1 and 300".into(),
        ));
    }
    if config.error_pct > 100 {
        return Err(RelayError::Validation("error_pct must be at most 100".into()));
    }

    // Flip the flag BEFORE spawning so workers see it immediately.
    // Counters are monotonic for the process lifetime, so a new run
    // adds to the existing totals rather than resetting them.
    state.sim_running.store(true, Ordering::SeqCst);

    let msg = format!(
        "Started: {} workers × {}s, {}% induced failures",
        config.concurrency, config.duration_secs, config.error_pct,
    );
    info!(
        concurrency = config.concurrency,
        duration_secs = config.duration_secs,
        error_pct = config.error_pct,
        "simulation started"
    );

    let running = state.sim_running.clone();
    let metrics = state.metrics.clone();
    let SimulationConfig {
        concurrency,
        duration_secs,
        error_pct,
    } = config;

    let handle = tokio::spawn(async move {
        crate::load_generator::run(running, metrics, concurrency, duration_secs, error_pct)
            .await;
    });

    // Stash the handle so `stop` can await clean shutdown
    let mut guard = state.sim_handle.lock().await;
    *guard = Some(handle);

    Ok(Json(SimulationStatus {
        running: true,
        message: msg,
    }))
}

// ─── POST /api/simulate/stop ─────────────────────────────────────

pub async fn stop_simulation(
    State(state): State<Arc<AppState>>,
) -> Json<SimulationStatus> {
    if !state.sim_running.load(Ordering::SeqCst) {
        return Json(SimulationStatus {
            running: false,
            message: "No simulation is running".into(),
        });
    }

    // Signal all workers to stop
    state.sim_running.store(false, Ordering::SeqCst);

    // Await the generator task so we know it is fully stopped
    let mut guard = state.sim_handle.lock().await;
    if let Some(handle) = guard.take() {
        // Ignore JoinError — the task may have already finished
        let _ = handle.await;
    }
    info!("simulation stopped");

    Json(SimulationStatus {
        running: false,
        message: "Simulation stopped".into(),
    })
}

// ─── GET /api/simulate/status ────────────────────────────────────

pub async fn simulation_status(
    State(state): State<Arc<AppState>>,
) -> Json<SimulationStatus> {
    let running = state.sim_running.load(Ordering::SeqCst);
    Json(SimulationStatus {
        running,
        message: if running {
            "Simulation in progress".into()
        } else {
            "Idle".into()
        },
    })
}
