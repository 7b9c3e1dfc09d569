use std::collections::VecDeque;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Sliding time window of event timestamps used for per-second rate
/// tracking. Callers push timestamps in chronological order; anything
/// older than the window length is dropped lazily on the next write or
/// read, so memory stays bounded by `window × peak rate`.
pub struct RateWindow {
    events: Mutex<VecDeque<Instant>>,
    window: Duration,
}

impl RateWindow {
    /// A zero-length window would divide by zero in `rate()`, so it is
    /// clamped up to one millisecond.
    pub fn new(window: Duration) -> Self {
        Self {
            events: Mutex::new(VecDeque::new()),
            window: window.max(Duration::from_millis(1)),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Record one event. The just-recorded timestamp serves as "now"
    /// for eviction, so a write never keeps anything it has already
    /// aged out.
    pub fn record(&self, timestamp: Instant) {
        let mut events = self.events.lock();
        events.push_back(timestamp);
        Self::evict(&mut events, timestamp, self.window);
    }

    /// Current events-per-second over the trailing window. `0.0` when
    /// no event remains inside it.
    pub fn rate(&self) -> f64 {
        self.rate_at(Instant::now())
    }

    /// Rate as observed at an explicit instant. Seam for tests that
    /// need to advance time without sleeping.
    pub(crate) fn rate_at(&self, now: Instant) -> f64 {
        let mut events = self.events.lock();
        Self::evict(&mut events, now, self.window);
        if events.is_empty() {
            return 0.0;
        }
        events.len() as f64 / self.window.as_secs_f64()
    }

    /// Number of timestamps currently retained.
    pub(crate) fn len(&self) -> usize {
        self.events.lock().len()
    }

    fn evict(events: &mut VecDeque<Instant>, now: Instant, window: Duration) {
        // checked_sub: `now - window` can underflow right after boot,
        // in which case nothing can be outside the window yet.
        let Some(cutoff) = now.checked_sub(window) else {
            return;
        };
        while let Some(front) = events.front() {
            if *front < cutoff {
                events.pop_front();
            } else {
                break;
            }
        }
    }
}
