//! InternalMetrics - a handler's self-observability snapshot

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::{Metric, MetricType};

/// Counter: number of completed emission attempts
pub const TOTAL_EMISSIONS: &str = "totalEmissions";
/// Counter: metrics delivered successfully
pub const METRICS_SENT: &str = "metricsSent";
/// Counter: metrics in failed batches
pub const METRICS_DROPPED: &str = "metricsDropped";
/// Gauge: handler interval in seconds
pub const INTERVAL_LENGTH: &str = "intervalLength";
/// Gauge: emission records currently retained
pub const EMISSIONS_IN_WINDOW: &str = "emissionsInWindow";
/// Gauge: mean emission duration in seconds (non-empty window only)
pub const AVERAGE_EMISSION_TIMING: &str = "averageEmissionTiming";
/// Gauge: max emission duration in seconds (non-empty window only)
pub const MAX_EMISSION_TIMING: &str = "maxEmissionTiming";

/// Counters and gauges published by a handler about itself
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InternalMetrics {
    pub counters: BTreeMap<String, f64>,
    pub gauges: BTreeMap<String, f64>,
}

impl InternalMetrics {
    pub fn counter(&self, name: &str) -> Option<f64> {
        self.counters.get(name).copied()
    }

    pub fn gauge(&self, name: &str) -> Option<f64> {
        self.gauges.get(name).copied()
    }

    /// Convert into metrics suitable for sending back through the pipeline
    pub fn to_metrics(&self, handler_name: &str) -> Vec<Metric> {
        let counters = self
            .counters
            .iter()
            .map(|(name, value)| (name, *value, MetricType::CumulativeCounter));
        let gauges = self
            .gauges
            .iter()
            .map(|(name, value)| (name, *value, MetricType::Gauge));

        counters
            .chain(gauges)
            .map(|(name, value, metric_type)| {
                let mut metric = Metric::new(format!("relay.{name}"))
                    .with_value(value)
                    .with_type(metric_type);
                metric.add_dimension("handler", handler_name);
                metric
            })
            .collect()
    }
}
