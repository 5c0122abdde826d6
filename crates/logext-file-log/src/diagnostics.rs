//! Throttled side channel for writer failures
//!
//! When the disk is full every batch fails the same way. The writer reports
//! the first failure immediately and then at most once per interval, along
//! with how many failures were swallowed in between.

use parking_lot::Mutex;
use std::fmt::Display;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Default minimum spacing between two reports
pub const DEFAULT_REPORT_INTERVAL: Duration = Duration::from_secs(10);

pub struct ErrorThrottle {
    min_interval: Duration,
    last_report: Mutex<Option<Instant>>,
    /// Failures since the last report
    pending: AtomicU64,
    total: AtomicU64,
}

impl ErrorThrottle {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_report: Mutex::new(None),
            pending: AtomicU64::new(0),
            total: AtomicU64::new(0),
        }
    }

    /// Count a failure of `op` and emit it through `tracing` unless throttled
    ///
    /// Returns whether the failure was reported.
    pub fn error(&self, op: &'static str, error: &dyn Display) -> bool {
        self.pending.fetch_add(1, Ordering::Relaxed);
        let total = self.total.fetch_add(1, Ordering::Relaxed) + 1;

        let due = {
            let mut last = self.last_report.lock();
            let now = Instant::now();
            match *last {
                Some(at) if now.duration_since(at) < self.min_interval => false,
                _ => {
                    *last = Some(now);
                    true
                }
            }
        };
        if !due {
            return false;
        }

        let count = self.pending.swap(0, Ordering::Relaxed);
        if count > 1 {
            tracing::error!(
                op,
                error = %error,
                suppressed = count - 1,
                total,
                "log writer failure (throttled)"
            );
        } else {
            tracing::error!(op, error = %error, total, "log writer failure");
        }
        true
    }

    pub fn total(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }

    pub fn pending(&self) -> u64 {
        self.pending.load(Ordering::Relaxed)
    }
}

impl Default for ErrorThrottle {
    fn default() -> Self {
        Self::new(DEFAULT_REPORT_INTERVAL)
    }
}
