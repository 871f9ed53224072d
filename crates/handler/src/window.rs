//! Rolling emission window
//!
//! Time-ordered history of recent emission outcomes, bounded by the handler
//! interval. Pruning is lazy: it only happens when a new record is inserted.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use tokio::time::Instant;

/// Outcome of one emission attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmissionRecord {
    /// When the attempt completed
    pub timestamp: Instant,
    /// How long the emit call took
    pub duration: Duration,
    /// Number of metrics in the emitted batch
    pub count: usize,
}

impl EmissionRecord {
    pub fn new(timestamp: Instant, duration: Duration, count: usize) -> Self {
        Self {
            timestamp,
            duration,
            count,
        }
    }
}

/// Statistics over the records currently retained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WindowSnapshot {
    pub len: usize,
    /// Mean duration (None when the window is empty)
    pub average: Option<Duration>,
    /// Max duration (None when the window is empty)
    pub max: Option<Duration>,
}

#[derive(Debug)]
struct WindowState {
    interval: Duration,
    records: VecDeque<EmissionRecord>,
}

/// Shared window; one lock serializes every insert, prune and snapshot
#[derive(Debug)]
pub struct EmissionWindow {
    state: Mutex<WindowState>,
}

impl EmissionWindow {
    pub fn new(interval: Duration) -> Self {
        Self {
            state: Mutex::new(WindowState {
                interval,
                records: VecDeque::new(),
            }),
        }
    }

    pub fn interval(&self) -> Duration {
        self.lock().interval
    }

    /// Takes effect at the next insert
    pub fn set_interval(&self, interval: Duration) {
        self.lock().interval = interval;
    }

    /// Append a record, then drop every leading record older than
    /// `now - interval`. Returns the number of records pruned.
    pub fn record(&self, record: EmissionRecord) -> usize {
        let mut state = self.lock();
        state.records.push_back(record);

        let Some(min_time) = Instant::now().checked_sub(state.interval) else {
            return 0;
        };

        let mut pruned = 0;
        while state
            .records
            .front()
            .is_some_and(|oldest| oldest.timestamp < min_time)
        {
            state.records.pop_front();
            pruned += 1;
        }
        pruned
    }

    pub fn len(&self) -> usize {
        self.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().records.is_empty()
    }

    pub fn snapshot(&self) -> WindowSnapshot {
        let state = self.lock();
        let records = &state.records;
        let len = records.len();
        if len == 0 {
            return WindowSnapshot::default();
        }

        let total_secs: f64 = records.iter().map(|r| r.duration.as_secs_f64()).sum();
        let max = records.iter().map(|r| r.duration).max();

        WindowSnapshot {
            len,
            average: Some(mean(total_secs, len)),
            max,
        }
    }

    // A panicking dispatch must not take the window down with it.
    fn lock(&self) -> MutexGuard<'_, WindowState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn mean(total_secs: f64, count: usize) -> Duration {
    Duration::try_from_secs_f64(total_secs / count as f64).unwrap_or(Duration::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_at(timestamp: Instant, secs: u64) -> EmissionRecord {
        EmissionRecord::new(timestamp, Duration::from_secs(secs), 1)
    }

    #[test]
    fn test_mean_handles_counts_beyond_u32() {
        let count = u32::MAX as usize + 2;
        let average = mean(count as f64 * 0.5, count);
        assert!((average.as_secs_f64() - 0.5).abs() < 1e-9);
        assert_eq!(mean(3.0, 2), Duration::from_millis(1500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_snapshot_average_and_max() {
        let window = EmissionWindow::new(Duration::from_secs(4));
        let now = Instant::now();
        window.record(record_at(now, 5));
        window.record(record_at(now, 10));
        window.record(record_at(now, 6));

        let snapshot = window.snapshot();
        assert_eq!(snapshot.len, 3);
        assert_eq!(snapshot.average, Some(Duration::from_secs(7)));
        assert_eq!(snapshot.max, Some(Duration::from_secs(10)));
    }

    #[test]
    fn test_empty_snapshot_omits_timings() {
        let window = EmissionWindow::new(Duration::from_secs(10));
        let snapshot = window.snapshot();
        assert_eq!(snapshot.len, 0);
        assert!(snapshot.average.is_none());
        assert!(snapshot.max.is_none());
        assert!(window.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_records_pruned_on_next_insert() {
        let window = EmissionWindow::new(Duration::from_secs(2));
        window.record(record_at(Instant::now(), 0));
        window.record(record_at(Instant::now(), 0));

        tokio::time::advance(Duration::from_secs(5)).await;

        // Stale entries linger until something is inserted
        assert_eq!(window.len(), 2);

        let pruned = window.record(record_at(Instant::now(), 0));
        assert_eq!(pruned, 2);
        assert_eq!(window.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_interval_change_applies_on_next_insert() {
        let window = EmissionWindow::new(Duration::from_secs(60));
        window.record(record_at(Instant::now(), 1));

        tokio::time::advance(Duration::from_secs(5)).await;
        window.set_interval(Duration::from_secs(2));
        assert_eq!(window.interval(), Duration::from_secs(2));

        window.record(record_at(Instant::now(), 1));
        assert_eq!(window.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_prune_stops_at_first_recent_record() {
        let window = EmissionWindow::new(Duration::from_secs(2));
        window.record(record_at(Instant::now(), 1));

        tokio::time::advance(Duration::from_secs(3)).await;
        window.record(record_at(Instant::now(), 2));

        tokio::time::advance(Duration::from_secs(1)).await;
        window.record(record_at(Instant::now(), 3));

        let snapshot = window.snapshot();
        assert_eq!(snapshot.len, 2);
        assert_eq!(snapshot.max, Some(Duration::from_secs(3)));
    }
}
