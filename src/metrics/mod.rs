pub mod registry;
pub mod stream;
pub mod window;

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use crate::errors::ErrorCategory;

pub use registry::{MetricsRegistry, Summary};
pub use window::RateWindow;

/// Canonical trailing window for the per-second rate figures.
pub const DEFAULT_RATE_WINDOW: Duration = Duration::from_secs(60);

static GLOBAL: OnceLock<Arc<MetricsRegistry>> = OnceLock::new();

/// Construct the process-wide registry on first call and return a
/// handle to it. Safe under concurrent first access: exactly one
/// registry is ever built, and callers after the first get that
/// instance regardless of the window they ask for. `main` calls this
/// once with the configured window and threads the handle through
/// `AppState`; nothing else should need the global directly.
pub fn init(rate_window: Duration) -> Arc<MetricsRegistry> {
    GLOBAL
        .get_or_init(|| Arc::new(MetricsRegistry::new(rate_window)))
        .clone()
}

/// The process-wide registry with the default 60 s rate window.
pub fn global() -> Arc<MetricsRegistry> {
    init(DEFAULT_RATE_WINDOW)
}

// ── Convenience recorders ────────────────────────────────────────
// For call sites that only ever touch the global instance.

pub fn record_command(successful: bool) {
    global().record_command(successful);
}

pub fn record_external_request(successful: bool, response_time_ms: i64) {
    global().record_external_request(successful, response_time_ms);
}

pub fn record_error(category: ErrorCategory) {
    global().record_error(category);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    #[test]
    fn concurrent_first_access_yields_one_shared_instance() {
        let mut handles = Vec::new();
        for _ in 0..16 {
            handles.push(thread::spawn(global));
        }
        let instances: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        let first = &instances[0];
        for other in &instances[1..] {
            assert!(Arc::ptr_eq(first, other));
            assert_eq!(first.started_at(), other.started_at());
        }
        // Later init calls with a different window still return the
        // existing instance.
        assert!(Arc::ptr_eq(&init(Duration::from_secs(5)), first));
    }

    #[test]
    fn once_guard_runs_the_constructor_exactly_once() {
        // Same construction pattern as `init`, instrumented with a
        // counter so a double construction would be visible.
        static CELL: OnceLock<Arc<MetricsRegistry>> = OnceLock::new();
        static BUILDS: AtomicUsize = AtomicUsize::new(0);

        let mut handles = Vec::new();
        for _ in 0..16 {
            handles.push(thread::spawn(|| {
                CELL.get_or_init(|| {
                    BUILDS.fetch_add(1, Ordering::SeqCst);
                    Arc::new(MetricsRegistry::new(DEFAULT_RATE_WINDOW))
                })
                .clone()
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(BUILDS.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn free_recorders_hit_the_global_registry() {
        let before = global().snapshot().commands_total;
        record_command(true);
        record_external_request(true, 12);
        record_error(ErrorCategory::Network);
        let after = global().snapshot();
        assert!(after.commands_total >= before + 1);
        assert!(after.errors_by_category[&ErrorCategory::Network] >= 1);
    }
}
