//! Cumulative conversion statistics.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A point-in-time snapshot of the service's counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    pub total_processed: u64,
    pub successful: u64,
    pub failed: u64,
    pub total_processing_time_ms: u64,
    /// Mean wall-clock time across all recorded jobs, successes and failures
    /// alike. Zero until the first job is recorded.
    pub average_processing_time_ms: u64,
}

/// Thread-safe accumulator for terminal job outcomes.
///
/// Exactly one record call is made per job, at finalization. Cloning shares
/// the underlying counters.
#[derive(Clone, Default)]
pub struct StatsTracker {
    inner: Arc<RwLock<Statistics>>,
}

impl StatsTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one terminal outcome.
    pub fn record(&self, success: bool, processing_time_ms: u64) {
        let mut stats = self.inner.write();
        stats.total_processed += 1;
        if success {
            stats.successful += 1;
        } else {
            stats.failed += 1;
        }
        stats.total_processing_time_ms += processing_time_ms;
        stats.average_processing_time_ms =
            stats.total_processing_time_ms / stats.total_processed;
    }

    /// A consistent copy of the counters.
    pub fn snapshot(&self) -> Statistics {
        self.inner.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_snapshot_is_zeroed() {
        let tracker = StatsTracker::new();
        assert_eq!(tracker.snapshot(), Statistics::default());
    }

    #[test]
    fn test_record_updates_all_counters() {
        let tracker = StatsTracker::new();
        tracker.record(true, 100);
        tracker.record(false, 300);

        let stats = tracker.snapshot();
        assert_eq!(stats.total_processed, 2);
        assert_eq!(stats.successful, 1);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.total_processing_time_ms, 400);
        assert_eq!(stats.average_processing_time_ms, 200);
    }

    #[test]
    fn test_average_is_integer_division() {
        let tracker = StatsTracker::new();
        tracker.record(true, 10);
        tracker.record(true, 10);
        tracker.record(true, 11);
        assert_eq!(tracker.snapshot().average_processing_time_ms, 10);
    }

    #[test]
    fn test_snapshot_is_detached() {
        let tracker = StatsTracker::new();
        tracker.record(true, 50);
        let before = tracker.snapshot();
        tracker.record(true, 50);
        assert_eq!(before.total_processed, 1);
        assert_eq!(tracker.snapshot().total_processed, 2);
    }

    #[test]
    fn test_concurrent_records_are_not_lost() {
        let tracker = StatsTracker::new();
        let mut handles = Vec::new();
        for _ in 0..8 {
            let t = tracker.clone();
            handles.push(std::thread::spawn(move || {
                for _ in 0..100 {
                    t.record(true, 1);
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
        let stats = tracker.snapshot();
        assert_eq!(stats.total_processed, 800);
        assert_eq!(stats.total_processing_time_ms, 800);
    }
}
