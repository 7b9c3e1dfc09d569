use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use hdrhistogram::Histogram;
use parking_lot::Mutex;
use serde::Serialize;

use crate::errors::ErrorCategory;

use super::window::RateWindow;

// ─── Configuration ───────────────────────────────────────────────

/// Response-time histogram range: 1 ms → 1 h, 3 significant figures
const HIST_LOW: u64 = 1;
const HIST_HIGH: u64 = 3_600_000;
const HIST_SIGFIG: u8 = 3;

// ─── Public types ────────────────────────────────────────────────

/// Process-wide metrics engine. Handlers and the simulator call the
/// `record_*` operations; the status command and the SSE stream call
/// `snapshot()`. All recording is infallible: malformed input is
/// normalized, never rejected, so misreporting can never abort the
/// caller's real work.
pub struct MetricsRegistry {
    inner: Mutex<Inner>,
    command_window: RateWindow,
    external_window: RateWindow,
    start_instant: Instant,
    started_at: DateTime<Utc>,
}

/// Percentile breakdown of external-call response times, in
/// milliseconds. Zeroed until the first request is recorded.
#[derive(Debug, Clone, Serialize)]
pub struct ResponseTimePercentiles {
    pub min_ms: u64,
    pub max_ms: u64,
    pub mean_ms: f64,
    pub p50_ms: u64,
    pub p95_ms: u64,
    pub p99_ms: u64,
    pub count: u64,
}

/// Point-in-time consistent copy of every metric. All counters and
/// derived figures come out of a single critical section, so
/// `succeeded + failed == total` and every success rate lies in
/// [0, 100] no matter how many writers are mid-flight.
#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    // Command statistics
    pub commands_total: u64,
    pub commands_succeeded: u64,
    pub commands_failed: u64,
    pub commands_per_second: f64,
    pub command_success_rate_percent: f64,

    // External-call statistics
    pub external_requests_total: u64,
    pub external_requests_succeeded: u64,
    pub external_requests_failed: u64,
    pub external_requests_per_second: f64,
    pub external_success_rate_percent: f64,
    pub average_response_time_ms: f64,
    pub response_times: ResponseTimePercentiles,

    // Error statistics: every category is always present, zeros
    // included, so the output shape is deterministic.
    pub errors_by_category: BTreeMap<ErrorCategory, u64>,

    // Process statistics
    pub uptime_seconds: f64,
    pub started_at: String,
}

// ─── Internal state ──────────────────────────────────────────────

struct Inner {
    commands_total: u64,
    commands_succeeded: u64,
    commands_failed: u64,
    commands_per_second: f64,

    external_total: u64,
    external_succeeded: u64,
    external_failed: u64,
    external_per_second: f64,

    response_time_sum_ms: u64,
    response_time_count: u64,
    response_time_hist: Histogram<u64>,

    errors_by_category: [u64; ErrorCategory::ALL.len()],
}

// ─── MetricsRegistry impl ────────────────────────────────────────

impl MetricsRegistry {
    pub fn new(rate_window: Duration) -> Self {
        Self {
            inner: Mutex::new(Inner::new()),
            command_window: RateWindow::new(rate_window),
            external_window: RateWindow::new(rate_window),
            start_instant: Instant::now(),
            started_at: Utc::now(),
        }
    }

    /// Record one command execution attempt. The cached
    /// commands-per-second figure is refreshed in the same call; it may
    /// trail the counters by one record cycle, which is acceptable for
    /// an informational rate.
    pub fn record_command(&self, successful: bool) {
        self.command_window.record(Instant::now());
        let rate = self.command_window.rate();

        let mut inner = self.inner.lock();
        inner.commands_total += 1;
        if successful {
            inner.commands_succeeded += 1;
        } else {
            inner.commands_failed += 1;
        }
        inner.commands_per_second = rate;
    }

    /// Record one outbound call. A negative response time is a caller
    /// bug, not a reason to fail: it is clamped to zero.
    pub fn record_external_request(&self, successful: bool, response_time_ms: i64) {
        let ms = response_time_ms.max(0) as u64;

        self.external_window.record(Instant::now());
        let rate = self.external_window.rate();

        let mut inner = self.inner.lock();
        inner.external_total += 1;
        if successful {
            inner.external_succeeded += 1;
        } else {
            inner.external_failed += 1;
        }
        inner.response_time_sum_ms += ms;
        inner.response_time_count += 1;
        // Histogram floor is 1 ms; sub-millisecond calls still count.
        let _ = inner.response_time_hist.record(ms.max(HIST_LOW));
        inner.external_per_second = rate;
    }

    /// Bump one error-category counter. Categories start at zero and
    /// are a closed set, so there is no "unknown category" path.
    pub fn record_error(&self, category: ErrorCategory) {
        self.inner.lock().errors_by_category[category.index()] += 1;
    }

    /// Mean external-call latency in milliseconds, `0.0` before the
    /// first recorded request.
    pub fn average_response_time(&self) -> f64 {
        let inner = self.inner.lock();
        Inner::average(inner.response_time_sum_ms, inner.response_time_count)
    }

    pub fn uptime(&self) -> Duration {
        self.start_instant.elapsed()
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Build a consistent snapshot. Everything derived from the
    /// counters is computed while the lock is held, so related fields
    /// always describe the same instant.
    pub fn snapshot(&self) -> Summary {
        let inner = self.inner.lock();

        let errors_by_category = ErrorCategory::ALL
            .iter()
            .map(|&cat| (cat, inner.errors_by_category[cat.index()]))
            .collect();

        Summary {
            commands_total: inner.commands_total,
            commands_succeeded: inner.commands_succeeded,
            commands_failed: inner.commands_failed,
            commands_per_second: inner.commands_per_second,
            command_success_rate_percent: Inner::success_rate(
                inner.commands_succeeded,
                inner.commands_total,
            ),

            external_requests_total: inner.external_total,
            external_requests_succeeded: inner.external_succeeded,
            external_requests_failed: inner.external_failed,
            external_requests_per_second: inner.external_per_second,
            external_success_rate_percent: Inner::success_rate(
                inner.external_succeeded,
                inner.external_total,
            ),
            average_response_time_ms: Inner::average(
                inner.response_time_sum_ms,
                inner.response_time_count,
            ),
            response_times: ResponseTimePercentiles::from_histogram(
                &inner.response_time_hist,
            ),

            errors_by_category,

            uptime_seconds: self.start_instant.elapsed().as_secs_f64(),
            started_at: self.started_at.to_rfc3339(),
        }
    }
}

// ─── Inner impl ──────────────────────────────────────────────────

impl Inner {
    fn new() -> Self {
        Self {
            commands_total: 0,
            commands_succeeded: 0,
            commands_failed: 0,
            commands_per_second: 0.0,
            external_total: 0,
            external_succeeded: 0,
            external_failed: 0,
            external_per_second: 0.0,
            response_time_sum_ms: 0,
            response_time_count: 0,
            response_time_hist: Histogram::<u64>::new_with_bounds(
                HIST_LOW, HIST_HIGH, HIST_SIGFIG,
            )
            .expect("histogram creation"),
            errors_by_category: [0; ErrorCategory::ALL.len()],
        }
    }

    fn success_rate(succeeded: u64, total: u64) -> f64 {
        if total == 0 {
            return 0.0;
        }
        succeeded as f64 / total as f64 * 100.0
    }

    fn average(sum: u64, count: u64) -> f64 {
        if count == 0 {
            return 0.0;
        }
        sum as f64 / count as f64
    }
}

impl ResponseTimePercentiles {
    fn from_histogram(hist: &Histogram<u64>) -> Self {
        if hist.len() == 0 {
            return Self {
                min_ms: 0,
                max_ms: 0,
                mean_ms: 0.0,
                p50_ms: 0,
                p95_ms: 0,
                p99_ms: 0,
                count: 0,
            };
        }
        Self {
            min_ms: hist.min(),
            max_ms: hist.max(),
            mean_ms: hist.mean(),
            p50_ms: hist.value_at_percentile(50.0),
            p95_ms: hist.value_at_percentile(95.0),
            p99_ms: hist.value_at_percentile(99.0),
            count: hist.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn registry() -> MetricsRegistry {
        MetricsRegistry::new(Duration::from_secs(60))
    }

    #[test]
    fn command_counters_always_sum_to_total() {
        let m = registry();
        for i in 0..50 {
            m.record_command(i % 3 != 0);
            let s = m.snapshot();
            assert_eq!(s.commands_total, s.commands_succeeded + s.commands_failed);
        }
        let s = m.snapshot();
        assert_eq!(s.commands_total, 50);
        assert_eq!(s.commands_failed, 17);
    }

    #[test]
    fn average_response_time_handles_empty_and_known_inputs() {
        let m = registry();
        assert_eq!(m.average_response_time(), 0.0);

        for ms in [10, 20, 30] {
            m.record_external_request(true, ms);
        }
        assert_eq!(m.average_response_time(), 20.0);
        assert_eq!(m.snapshot().average_response_time_ms, 20.0);
    }

    #[test]
    fn negative_response_time_is_clamped_to_zero() {
        let m = registry();
        m.record_external_request(true, -500);
        m.record_external_request(true, 100);
        let s = m.snapshot();
        assert_eq!(s.external_requests_total, 2);
        assert_eq!(s.average_response_time_ms, 50.0);
    }

    #[test]
    fn error_counts_accumulate_per_category_only() {
        let m = registry();
        for _ in 0..7 {
            m.record_error(ErrorCategory::RateLimit);
        }
        m.record_error(ErrorCategory::Network);

        let s = m.snapshot();
        assert_eq!(s.errors_by_category[&ErrorCategory::RateLimit], 7);
        assert_eq!(s.errors_by_category[&ErrorCategory::Network], 1);
        assert_eq!(s.errors_by_category[&ErrorCategory::Api], 0);
        // Deterministic shape: all eight categories always present.
        assert_eq!(s.errors_by_category.len(), ErrorCategory::ALL.len());
    }

    #[test]
    fn concurrent_recording_loses_no_updates() {
        let m = Arc::new(registry());
        let mut handles = Vec::new();
        for t in 0..10 {
            let m = Arc::clone(&m);
            handles.push(thread::spawn(move || {
                for _ in 0..100 {
                    m.record_command(true);
                    m.record_command(false);
                    m.record_external_request(t % 2 == 0, 5);
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }

        let s = m.snapshot();
        assert_eq!(s.commands_total, 2000);
        assert_eq!(s.commands_succeeded, 1000);
        assert_eq!(s.commands_failed, 1000);
        assert_eq!(s.external_requests_total, 1000);
        assert_eq!(s.command_success_rate_percent, 50.0);
    }

    #[test]
    fn snapshots_taken_mid_burst_stay_internally_consistent() {
        let m = Arc::new(registry());
        let mut writers = Vec::new();
        for _ in 0..4 {
            let m = Arc::clone(&m);
            writers.push(thread::spawn(move || {
                for i in 0..2_000i64 {
                    m.record_command(i % 2 == 0);
                    m.record_external_request(i % 5 != 0, i % 40);
                }
            }));
        }

        for _ in 0..500 {
            let s = m.snapshot();
            assert_eq!(s.commands_total, s.commands_succeeded + s.commands_failed);
            assert_eq!(
                s.external_requests_total,
                s.external_requests_succeeded + s.external_requests_failed
            );
            assert!((0.0..=100.0).contains(&s.command_success_rate_percent));
            assert!((0.0..=100.0).contains(&s.external_success_rate_percent));
        }
        for h in writers {
            h.join().unwrap();
        }
    }

    #[test]
    fn untouched_registry_snapshots_to_zeros_not_errors() {
        let s = registry().snapshot();
        assert_eq!(s.commands_total, 0);
        assert_eq!(s.commands_per_second, 0.0);
        assert_eq!(s.command_success_rate_percent, 0.0);
        assert_eq!(s.average_response_time_ms, 0.0);
        assert_eq!(s.response_times.count, 0);
        assert!(!s.command_success_rate_percent.is_nan());
        assert!(s.uptime_seconds >= 0.0);
        // started_at must be a parseable RFC 3339 timestamp.
        assert!(chrono::DateTime::parse_from_rfc3339(&s.started_at).is_ok());
    }

    #[test]
    fn summary_serializes_with_stable_field_names() {
        let m = registry();
        m.record_command(true);
        m.record_error(ErrorCategory::Protocol);

        let json = serde_json::to_value(m.snapshot()).unwrap();
        assert_eq!(json["commands_total"], 1);
        assert_eq!(json["errors_by_category"]["protocol"], 1);
        assert!(json["errors_by_category"]["rate_limit"].is_number());
        assert!(json["started_at"].is_string());
    }

    #[test]
    fn recording_refreshes_cached_rates() {
        let m = registry();
        m.record_command(true);
        m.record_external_request(true, 10);
        let s = m.snapshot();
        assert!(s.commands_per_second > 0.0);
        assert!(s.external_requests_per_second > 0.0);
    }
}
