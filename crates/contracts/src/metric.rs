//! Metric - the measurement carried through the pipeline

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Kind of measurement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricType {
    /// Point-in-time value
    #[default]
    Gauge,
    /// Delta since the previous report
    Counter,
    /// Monotonic total since process start
    CumulativeCounter,
}

impl MetricType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gauge => "gauge",
            Self::Counter => "counter",
            Self::CumulativeCounter => "cumulative_counter",
        }
    }
}

/// A single metric measurement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    /// Metric name (without handler prefix)
    pub name: String,

    /// Measurement kind
    #[serde(default)]
    pub metric_type: MetricType,

    /// Measured value
    pub value: f64,

    /// Metric specific dimensions
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub dimensions: HashMap<String, String>,
}

impl Metric {
    /// Create a gauge with value 0 and no dimensions
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            metric_type: MetricType::Gauge,
            value: 0.0,
            dimensions: HashMap::new(),
        }
    }

    pub fn with_value(mut self, value: f64) -> Self {
        self.value = value;
        self
    }

    pub fn with_type(mut self, metric_type: MetricType) -> Self {
        self.metric_type = metric_type;
        self
    }

    /// Add (or overwrite) one dimension
    pub fn add_dimension(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.dimensions.insert(name.into(), value.into());
    }

    /// Add (or overwrite) several dimensions
    pub fn add_dimensions(&mut self, dimensions: &HashMap<String, String>) {
        for (name, value) in dimensions {
            self.dimensions.insert(name.clone(), value.clone());
        }
    }

    /// Dimensions merged over `defaults`; the metric's own values win.
    pub fn dimensions_with(&self, defaults: &HashMap<String, String>) -> HashMap<String, String> {
        let mut merged = defaults.clone();
        for (name, value) in &self.dimensions {
            merged.insert(name.clone(), value.clone());
        }
        merged
    }

    /// Metric name with the handler prefix applied verbatim
    pub fn prefixed_name(&self, prefix: &str) -> String {
        format!("{prefix}{}", self.name)
    }
}
