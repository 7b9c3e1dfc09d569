use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod config;
mod errors;
mod handlers;
mod load_generator;
mod metrics;
mod middleware;
mod server;

/// Shared application state available to every handler via `State<Arc<AppState>>`.
pub struct AppState {
    /// Central metrics registry — handlers record events, the read
    /// surface takes snapshots.
    pub metrics: Arc<metrics::MetricsRegistry>,

    /// Flag checked by every simulation worker on each iteration.
    pub sim_running: Arc<AtomicBool>,

    /// Handle to the spawned simulation task so we can await clean shutdown.
    pub sim_handle: tokio::sync::Mutex<Option<tokio::task::JoinHandle<()>>>,
}

#[tokio::main]
async fn main() {
    // ── 1. Load configuration ────────────────────────────────────
    let cfg = match config::Config::from_env() {
        Ok(cfg) => cfg,
        Err(err) => {
            eprintln!("invalid configuration: {err}");
            std::process::exit(1);
        }
    };

    // ── 2. Initialize logging ────────────────────────────────────
    let filter = EnvFilter::try_new(&cfg.log_filter)
        .unwrap_or_else(|_| EnvFilter::new("relay_metrics=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // ── 3. Initialize metrics (exactly once, process-wide) ───────
    let registry = metrics::init(cfg.rate_window);
    info!(
        rate_window_secs = cfg.rate_window.as_secs(),
        started_at = %registry.started_at().to_rfc3339(),
        "metrics registry initialized"
    );

    // ── 4. Build shared state and router ─────────────────────────
    let state = Arc::new(AppState {
        metrics: registry.clone(),
        sim_running: Arc::new(AtomicBool::new(false)),
        sim_handle: tokio::sync::Mutex::new(None),
    });
    let app = server::create_router(state);

    // ── 5. Bind & serve ──────────────────────────────────────────
    let listener = match tokio::net::TcpListener::bind(&cfg.bind_addr).await {
        Ok(listener) => listener,
        Err(err) => {
            error!(addr = %cfg.bind_addr, %err, "failed to bind — is the port already in use?");
            std::process::exit(1);
        }
    };

    info!(addr = %cfg.bind_addr, "chat-relay metrics observatory listening");
    info!("snapshot JSON  → /api/metrics");
    info!("snapshot SSE   → /api/metrics/stream");
    info!("status         → /api/status");

    if let Err(err) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!(%err, "server exited with error");
        std::process::exit(1);
    }

    // Final read of the registry before the process goes away.
    let summary = registry.snapshot();
    info!(
        commands_total = summary.commands_total,
        command_success_rate_percent = summary.command_success_rate_percent,
        external_requests_total = summary.external_requests_total,
        average_response_time_ms = summary.average_response_time_ms,
        uptime_seconds = summary.uptime_seconds,
        "shutdown snapshot"
    );
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(%err, "failed to listen for shutdown signal");
        return;
    }
    info!("shutdown signal received");
}
