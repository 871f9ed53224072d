//! Handler engine metrics
//!
//! Thin wrappers over the `metrics` facade. Without an installed recorder
//! every call is a no-op, so the engine can record unconditionally.

use std::fmt;
use std::time::Duration;

use metrics::{counter, gauge, histogram};

/// Reason a listener loop flushed its batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushTrigger {
    /// Batch reached the endpoint limit
    Size,
    /// Periodic tick with a non-empty batch
    Interval,
    /// Explicit flush request on the channel
    Flush,
}

impl FlushTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Size => "size",
            Self::Interval => "interval",
            Self::Flush => "flush",
        }
    }
}

impl fmt::Display for FlushTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Record one listener flush
pub fn record_flush(handler: &str, collector: &str, trigger: FlushTrigger, batch_len: usize) {
    counter!(
        "relay_flushes_total",
        "handler" => handler.to_string(),
        "collector" => collector.to_string(),
        "trigger" => trigger.as_str()
    )
    .increment(1);

    histogram!("relay_batch_size", "handler" => handler.to_string()).record(batch_len as f64);
}

/// Record one completed emission attempt
pub fn record_emission(handler: &str, metric_count: usize, duration: Duration, success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!(
        "relay_emissions_total",
        "handler" => handler.to_string(),
        "status" => status
    )
    .increment(1);

    let outcome = if success {
        "relay_metrics_sent_total"
    } else {
        "relay_metrics_dropped_total"
    };
    counter!(outcome, "handler" => handler.to_string()).increment(metric_count as u64);

    histogram!("relay_emission_duration_seconds", "handler" => handler.to_string())
        .record(duration.as_secs_f64());
}

/// Record the rolling emission window length
pub fn record_window_len(handler: &str, len: usize) {
    gauge!("relay_emissions_in_window", "handler" => handler.to_string()).set(len as f64);
}
