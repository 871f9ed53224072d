//! Emission counters and the internal metrics report

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use contracts::{
    InternalMetrics, AVERAGE_EMISSION_TIMING, EMISSIONS_IN_WINDOW, INTERVAL_LENGTH,
    MAX_EMISSION_TIMING, METRICS_DROPPED, METRICS_SENT, TOTAL_EMISSIONS,
};

use crate::window::WindowSnapshot;

/// Lifetime counters of one handler; monotonic, never reset
#[derive(Debug, Default)]
pub struct EmissionCounters {
    /// Completed emission attempts (success or failure)
    total_emissions: AtomicU64,
    /// Metrics delivered successfully
    metrics_sent: AtomicU64,
    /// Metrics in failed batches
    metrics_dropped: AtomicU64,
}

impl EmissionCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total_emissions(&self) -> u64 {
        self.total_emissions.load(Ordering::Relaxed)
    }

    pub fn metrics_sent(&self) -> u64 {
        self.metrics_sent.load(Ordering::Relaxed)
    }

    pub fn metrics_dropped(&self) -> u64 {
        self.metrics_dropped.load(Ordering::Relaxed)
    }

    /// Count a successful emission of `count` metrics
    pub fn record_success(&self, count: usize) {
        self.total_emissions.fetch_add(1, Ordering::Relaxed);
        self.metrics_sent.fetch_add(count as u64, Ordering::Relaxed);
    }

    /// Count a failed emission of `count` metrics
    pub fn record_failure(&self, count: usize) {
        self.total_emissions.fetch_add(1, Ordering::Relaxed);
        self.metrics_dropped.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CountersSnapshot {
        CountersSnapshot {
            total_emissions: self.total_emissions(),
            metrics_sent: self.metrics_sent(),
            metrics_dropped: self.metrics_dropped(),
        }
    }
}

/// Point-in-time copy of the counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CountersSnapshot {
    pub total_emissions: u64,
    pub metrics_sent: u64,
    pub metrics_dropped: u64,
}

/// Assemble the internal metrics report.
///
/// Counters and window are read at slightly different instants; the report
/// is diagnostic, not transactional.
pub fn build_internal_metrics(
    counters: CountersSnapshot,
    window: WindowSnapshot,
    interval: Duration,
) -> InternalMetrics {
    let counters_map = BTreeMap::from([
        (TOTAL_EMISSIONS.to_string(), counters.total_emissions as f64),
        (METRICS_SENT.to_string(), counters.metrics_sent as f64),
        (METRICS_DROPPED.to_string(), counters.metrics_dropped as f64),
    ]);

    let mut gauges = BTreeMap::from([
        (INTERVAL_LENGTH.to_string(), interval.as_secs_f64()),
        (EMISSIONS_IN_WINDOW.to_string(), window.len as f64),
    ]);

    if let Some(average) = window.average {
        gauges.insert(AVERAGE_EMISSION_TIMING.to_string(), average.as_secs_f64());
    }
    if let Some(max) = window.max {
        gauges.insert(MAX_EMISSION_TIMING.to_string(), max.as_secs_f64());
    }

    InternalMetrics {
        counters: counters_map,
        gauges,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_success_and_failure() {
        let counters = EmissionCounters::new();
        counters.record_success(3);
        counters.record_success(2);
        counters.record_failure(4);

        let snapshot = counters.snapshot();
        assert_eq!(snapshot.total_emissions, 3);
        assert_eq!(snapshot.metrics_sent, 5);
        assert_eq!(snapshot.metrics_dropped, 4);
    }

    #[test]
    fn test_internal_metrics_with_timings() {
        let counters = CountersSnapshot {
            total_emissions: 10,
            metrics_sent: 2,
            metrics_dropped: 100,
        };
        let window = WindowSnapshot {
            len: 3,
            average: Some(Duration::from_secs(7)),
            max: Some(Duration::from_secs(10)),
        };

        let report = build_internal_metrics(counters, window, Duration::from_secs(4));

        let expected = InternalMetrics {
            counters: BTreeMap::from([
                (METRICS_DROPPED.to_string(), 100.0),
                (METRICS_SENT.to_string(), 2.0),
                (TOTAL_EMISSIONS.to_string(), 10.0),
            ]),
            gauges: BTreeMap::from([
                (AVERAGE_EMISSION_TIMING.to_string(), 7.0),
                (EMISSIONS_IN_WINDOW.to_string(), 3.0),
                (INTERVAL_LENGTH.to_string(), 4.0),
                (MAX_EMISSION_TIMING.to_string(), 10.0),
            ]),
        };
        assert_eq!(report, expected);
    }

    #[test]
    fn test_internal_metrics_empty_window_omits_timings() {
        let report = build_internal_metrics(
            CountersSnapshot::default(),
            WindowSnapshot::default(),
            Duration::ZERO,
        );

        assert_eq!(report.counters.len(), 3);
        assert_eq!(report.gauges.len(), 2);
        assert_eq!(report.gauge(EMISSIONS_IN_WINDOW), Some(0.0));
        assert_eq!(report.gauge(INTERVAL_LENGTH), Some(0.0));
        assert!(report.gauge(AVERAGE_EMISSION_TIMING).is_none());
        assert!(report.gauge(MAX_EMISSION_TIMING).is_none());
    }
}
