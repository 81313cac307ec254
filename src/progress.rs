//! Progress out-of-band rate limiter (spec §4.5 "Progress").
//!
//! Writers accept a `task_size` set once before the stream descriptor is
//! written; callers invoke `set_progress(n)` as work is done. The I/O layer
//! rate-limits progress OOB emissions to roughly 10/s by exponentially
//! averaging the observed inter-emission interval — the same
//! exponential-smoothing shape as the teacher's `Metrics` latency
//! tracking (`metrics.rs`), generalised here from a rolling window over
//! query latencies to a single smoothed inter-emission interval since
//! there is only one clock to track per stream.

use std::time::{Duration, Instant};

const TARGET_EMIT_RATE_HZ: f64 = 10.0;
const SMOOTHING: f64 = 0.2;

/// Rate limiter for `taskProgress` OOB emission (spec §4.5).
pub struct ProgressLimiter {
    task_size: Option<u64>,
    last_emit: Option<Instant>,
    avg_interval: Duration,
}

impl ProgressLimiter {
    pub fn new() -> Self {
        ProgressLimiter {
            task_size: None,
            last_emit: None,
            avg_interval: Duration::from_secs_f64(1.0 / TARGET_EMIT_RATE_HZ),
        }
    }

    /// Set once before the stream descriptor is written (spec §4.5).
    pub fn set_task_size(&mut self, size: u64) {
        self.task_size = Some(size);
    }

    pub fn task_size(&self) -> Option<u64> {
        self.task_size
    }

    /// Decide whether a `taskProgress` comment should be emitted for `now`,
    /// given the last emission time and the exponentially-averaged
    /// inter-emission interval. Always emits on the first call.
    pub fn should_emit(&self, now: Instant) -> bool {
        match self.last_emit {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= self.avg_interval,
        }
    }

    /// Record that an emission happened at `now`, folding the observed
    /// interval into the running average.
    pub fn record_emit(&mut self, now: Instant) {
        if let Some(last) = self.last_emit {
            let observed = now.saturating_duration_since(last);
            let blended = self.avg_interval.as_secs_f64() * (1.0 - SMOOTHING)
                + observed.as_secs_f64() * SMOOTHING;
            self.avg_interval = Duration::from_secs_f64(blended.max(0.0));
        }
        self.last_emit = Some(now);
    }

    /// Combined decision + bookkeeping: call at every `set_progress(n)`
    /// and emit the comment only if this returns `true`.
    pub fn poll(&mut self, now: Instant) -> bool {
        if self.should_emit(now) {
            self.record_emit(now);
            true
        } else {
            false
        }
    }
}

impl Default for ProgressLimiter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_poll_always_emits() {
        let mut limiter = ProgressLimiter::new();
        assert!(limiter.poll(Instant::now()));
    }

    #[test]
    fn rapid_polls_are_suppressed_until_interval_elapses() {
        let mut limiter = ProgressLimiter::new();
        let t0 = Instant::now();
        assert!(limiter.poll(t0));
        assert!(!limiter.poll(t0 + Duration::from_millis(1)));
        assert!(limiter.poll(t0 + Duration::from_millis(200)));
    }

    #[test]
    fn task_size_is_stored_and_retrievable() {
        let mut limiter = ProgressLimiter::new();
        assert_eq!(limiter.task_size(), None);
        limiter.set_task_size(1000);
        assert_eq!(limiter.task_size(), Some(1000));
    }

    #[test]
    fn average_interval_tracks_observed_cadence() {
        let mut limiter = ProgressLimiter::new();
        let t0 = Instant::now();
        limiter.record_emit(t0);
        limiter.record_emit(t0 + Duration::from_millis(500));
        // the average interval should have moved toward the slower
        // observed cadence, away from the 100ms default target.
        assert!(limiter.avg_interval > Duration::from_millis(100));
    }
}
