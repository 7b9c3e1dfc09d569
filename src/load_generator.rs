use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::errors::RelayError;
use crate::metrics::MetricsRegistry;

/// Commands the simulated relay "dispatches".
const COMMANDS: &[&str] = &["ping", "help", "stats", "roll", "weather", "quote"];

/// Upstream status codes a failing external call can come back with.
const FAILURE_STATUS_CODES: &[u16] = &[400, 404, 429, 500, 502, 503];

// ─── Public entry point ──────────────────────────────────────────

/// Spawns `concurrency` Tokio tasks that emulate chat-command traffic
/// against the registry until the deadline or the `running` flag is
/// set to false.
pub async fn run(
    running: Arc<AtomicBool>,
    metrics: Arc<MetricsRegistry>,
    concurrency: u32,
    duration_secs: u64,
    error_pct: u8,
) {
    let deadline = Instant::now() + Duration::from_secs(duration_secs);

    let mut handles = Vec::with_capacity(concurrency as usize);

    for worker_id in 0..concurrency {
        let running = running.clone();
        let metrics = metrics.clone();

        handles.push(tokio::spawn(async move {
            worker(worker_id, running, metrics, deadline, error_pct).await;
        }));
    }

    // Wait for all workers to finish
    for h in handles {
        let _ = h.await;
    }

    // Mark the simulation as finished
    running.store(false, Ordering::SeqCst);
    debug!("all simulation workers drained");
}

// ─── Worker loop ─────────────────────────────────────────────────

async fn worker(
    id: u32,
    running: Arc<AtomicBool>,
    metrics: Arc<MetricsRegistry>,
    deadline: Instant,
    error_pct: u8,
) {
    // Each worker gets its own deterministic RNG seeded uniquely.
    let mut rng = StdRng::seed_from_u64(1000 + u64::from(id));

    while running.load(Ordering::Relaxed) && Instant::now() < deadline {
        dispatch_one(&mut rng, &metrics, error_pct).await;

        // Pacing: a relay sees bursts, not a busy loop.
        let idle_ms = rng.gen_range(5..40u64);
        tokio::time::sleep(Duration::from_millis(idle_ms)).await;
    }
}

/// Emulate one command execution: local handling latency, an optional
/// upstream call, and a failure at the configured rate. Every outcome
/// is reported through the same record operations real handlers use.
async fn dispatch_one(rng: &mut StdRng, metrics: &Arc<MetricsRegistry>, error_pct: u8) {
    let command = COMMANDS[rng.gen_range(0..COMMANDS.len())];
    let fails = rng.gen_range(0u8..100) < error_pct;

    // Local handler work
    tokio::time::sleep(Duration::from_millis(rng.gen_range(1..8))).await;

    // Commands past the trivial ones hit a simulated upstream API.
    let needs_upstream = !matches!(command, "ping" | "help");
    if needs_upstream {
        let latency_ms = rng.gen_range(5..120i64);
        metrics.record_external_request(!fails, latency_ms);
    }

    if fails {
        let err = if needs_upstream {
            let status =
                FAILURE_STATUS_CODES[rng.gen_range(0..FAILURE_STATUS_CODES.len())];
            RelayError::from_http_status(status, format!("{command} upstream failed"))
        } else {
            RelayError::Protocol(format!("{command} session dropped"))
        };
        metrics.record_error(err.category());
        metrics.record_command(false);
    } else {
        metrics.record_command(true);
    }
}
