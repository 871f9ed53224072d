//! Agent orchestrator - builds handlers from configuration and drives their
//! lifecycle from start to shutdown.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use contracts::{AgentConfig, HandlerConfig};
use handler::{Handler, HandlerRegistry};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, instrument, warn};

use super::AgentStats;
use crate::error::{CliError, Result};

/// A configured set of handlers ready to run
pub struct Agent {
    config: AgentConfig,
    handlers: Vec<Arc<dyn Handler>>,
    internal_metrics_interval: Option<Duration>,
}

impl Agent {
    /// Create, configure and wire every handler in `config`.
    ///
    /// Handlers that cannot be created or configured are logged and skipped;
    /// it is an error only when none remain.
    #[instrument(name = "agent_build", skip_all, fields(handlers = config.handlers.len()))]
    pub fn build(registry: &HandlerRegistry, config: AgentConfig) -> Result<Self> {
        let mut handlers: Vec<Arc<dyn Handler>> = Vec::new();

        for handler_config in &config.handlers {
            match build_handler(registry, &config, handler_config) {
                Ok(handler) => handlers.push(Arc::from(handler)),
                Err(e) => {
                    warn!(handler = %handler_config.name, error = %e, "Skipping handler");
                }
            }
        }

        if handlers.is_empty() {
            return Err(CliError::no_handlers(config.handlers.len()));
        }

        let internal_metrics_interval = config
            .internal_metrics_interval_secs
            .map(Duration::from_secs);

        info!(
            handlers = handlers.len(),
            collectors = config.collectors.len(),
            "Agent built"
        );

        Ok(Self {
            config,
            handlers,
            internal_metrics_interval,
        })
    }

    /// Override the internal metrics report period (`None` disables it)
    pub fn with_internal_metrics_interval(mut self, interval: Option<Duration>) -> Self {
        self.internal_metrics_interval = interval.filter(|d| !d.is_zero());
        self
    }

    pub fn handlers(&self) -> &[Arc<dyn Handler>] {
        &self.handlers
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Run every handler until `shutdown` resolves, then close all endpoints.
    ///
    /// Pending batches are discarded at close and in-flight emissions are not
    /// awaited.
    pub async fn run<F>(self, shutdown: F) -> AgentStats
    where
        F: Future<Output = ()>,
    {
        let start = Instant::now();

        let listeners: Vec<JoinHandle<()>> =
            self.handlers.iter().flat_map(|handler| handler.run()).collect();

        let reporters: Vec<JoinHandle<()>> = match self.internal_metrics_interval {
            Some(period) => self
                .handlers
                .iter()
                .map(|handler| spawn_reporter(Arc::clone(handler), period))
                .collect(),
            None => Vec::new(),
        };

        info!(
            handlers = self.handlers.len(),
            listeners = listeners.len(),
            reporters = reporters.len(),
            "Agent running"
        );

        shutdown.await;
        info!("Shutting down handlers");

        for reporter in &reporters {
            reporter.abort();
        }
        for handler in &self.handlers {
            handler.base().close_all().await;
        }
        for listener in listeners {
            if let Err(e) = listener.await {
                warn!(error = %e, "Listener task failed");
            }
        }

        AgentStats::collect(&self.handlers, start.elapsed())
    }
}

/// Create one handler and apply global then handler specific settings
fn build_handler(
    registry: &HandlerRegistry,
    config: &AgentConfig,
    handler_config: &HandlerConfig,
) -> handler::error::Result<Box<dyn Handler>> {
    let mut handler = registry.create(&handler_config.name)?;

    let base = handler.base_mut();
    base.set_prefix(config.prefix.clone());
    base.set_default_dimensions(config.default_dimensions.clone());

    handler.configure(&handler_config.settings)?;
    handler.base_mut().init_listeners(config);

    debug!(
        handler = %handler_config.name,
        interval_secs = handler.base().interval().as_secs_f64(),
        max_buffer_size = handler.base().max_buffer_size(),
        "Handler configured"
    );
    Ok(handler)
}

/// Periodically log a handler's internal metrics and feed them back into its
/// own default channel.
fn spawn_reporter(handler: Arc<dyn Handler>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let endpoint = handler.base().channel();

        loop {
            ticker.tick().await;

            let report = handler.internal_metrics();
            info!(
                handler = %handler.name(),
                counters = ?report.counters,
                gauges = ?report.gauges,
                "Internal metrics"
            );

            for metric in report.to_metrics(handler.name()) {
                if !endpoint.send(metric).await {
                    return;
                }
            }
        }
    })
}
