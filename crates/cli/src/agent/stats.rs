//! Agent run statistics.

use std::sync::Arc;
use std::time::Duration;

use contracts::{InternalMetrics, METRICS_DROPPED, METRICS_SENT, TOTAL_EMISSIONS};
use handler::Handler;

/// Final internal metrics of one handler
#[derive(Debug, Clone)]
pub struct HandlerStats {
    pub name: String,
    pub metrics: InternalMetrics,
}

/// Statistics from an agent run
#[derive(Debug, Clone, Default)]
pub struct AgentStats {
    /// Wall time between start and shutdown
    pub duration: Duration,
    pub handlers: Vec<HandlerStats>,
}

impl AgentStats {
    pub fn collect(handlers: &[Arc<dyn Handler>], duration: Duration) -> Self {
        Self {
            duration,
            handlers: handlers
                .iter()
                .map(|handler| HandlerStats {
                    name: handler.name().to_string(),
                    metrics: handler.internal_metrics(),
                })
                .collect(),
        }
    }

    pub fn total_sent(&self) -> u64 {
        self.sum_counter(METRICS_SENT)
    }

    pub fn total_dropped(&self) -> u64 {
        self.sum_counter(METRICS_DROPPED)
    }

    pub fn total_emissions(&self) -> u64 {
        self.sum_counter(TOTAL_EMISSIONS)
    }

    fn sum_counter(&self, name: &str) -> u64 {
        self.handlers
            .iter()
            .filter_map(|h| h.metrics.counter(name))
            .sum::<f64>() as u64
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n=== Relay Agent Statistics ===\n");
        println!("Duration: {:.2}s", self.duration.as_secs_f64());
        println!("Emissions: {}", self.total_emissions());
        println!("Metrics sent: {}", self.total_sent());
        println!("Metrics dropped: {}", self.total_dropped());

        for handler in &self.handlers {
            println!("\n{}:", handler.name);
            for (name, value) in &handler.metrics.counters {
                println!("  {name}: {value}");
            }
            for (name, value) in &handler.metrics.gauges {
                println!("  {name}: {value:.3}");
            }
        }
        println!();
    }
}
