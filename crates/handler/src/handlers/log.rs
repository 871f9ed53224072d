//! LogHandler - writes every batch through tracing

use std::collections::HashMap;
use std::sync::Arc;

use contracts::{ContractError, Emitter, Metric};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument};

use crate::base::{BaseHandler, Handler, HandlerParams};

/// Handler that logs batch summaries and each metric
pub struct LogHandler {
    base: BaseHandler,
}

impl LogHandler {
    pub fn new(params: HandlerParams) -> Self {
        Self {
            base: BaseHandler::new(params),
        }
    }
}

impl Handler for LogHandler {
    fn base(&self) -> &BaseHandler {
        &self.base
    }

    fn base_mut(&mut self) -> &mut BaseHandler {
        &mut self.base
    }

    fn run(&self) -> Vec<JoinHandle<()>> {
        self.base.run(Arc::new(LogEmitter::from_base(&self.base)))
    }
}

/// Emitter half of [`LogHandler`], frozen at `run` time
struct LogEmitter {
    name: String,
    prefix: String,
    default_dimensions: HashMap<String, String>,
}

impl LogEmitter {
    fn from_base(base: &BaseHandler) -> Self {
        Self {
            name: base.name().to_string(),
            prefix: base.prefix().to_string(),
            default_dimensions: base.default_dimensions().clone(),
        }
    }
}

impl Emitter for LogEmitter {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "log_handler_emit",
        skip(self, batch),
        fields(handler = %self.name, metrics = batch.len())
    )]
    async fn emit(&self, batch: &[Metric]) -> Result<(), ContractError> {
        info!(handler = %self.name, metrics = batch.len(), "Batch received");

        for metric in batch {
            debug!(
                name = %metric.prefixed_name(&self.prefix),
                metric_type = metric.metric_type.as_str(),
                value = metric.value,
                dimensions = ?metric.dimensions_with(&self.default_dimensions),
                "Metric"
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::keys;
    use contracts::{Sample, Settings};
    use std::time::Duration;

    #[tokio::test]
    async fn test_log_emitter_always_succeeds() {
        let mut base = BaseHandler::new(HandlerParams::new("Log"));
        base.set_prefix("svc.");
        let emitter = LogEmitter::from_base(&base);

        assert_eq!(emitter.name(), "Log");
        assert_eq!(emitter.prefix, "svc.");
        assert!(emitter.emit(&[Metric::new("a"), Metric::new("b")]).await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_log_handler_run_emits_batches() {
        let mut handler = LogHandler::new(HandlerParams::new("Log"));
        handler.base_mut().set_max_buffer_size(2);
        handler.base_mut().set_interval(Duration::from_secs(30));

        let tasks = handler.run();
        assert_eq!(tasks.len(), 1);

        let channel = handler.base().channel();
        assert!(channel.send(Metric::new("a")).await);
        assert!(channel.send(Metric::new("b")).await);
        for _ in 0..20 {
            tokio::task::yield_now().await;
        }

        let report = handler.internal_metrics();
        assert_eq!(report.counter(contracts::METRICS_SENT), Some(2.0));
        assert_eq!(report.counter(contracts::TOTAL_EMISSIONS), Some(1.0));

        handler.base().close_all().await;
        for task in tasks {
            task.await.unwrap();
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_sender_taken_before_configure_stays_live() {
        let mut handler = LogHandler::new(HandlerParams::new("Log"));
        let tx = handler.base().sender();

        let settings = Settings::new()
            .with(keys::MAX_BUFFER_SIZE, 1)
            .with(keys::CHANNEL_BUFFER_SIZE, 4);
        handler.configure(&settings).unwrap();
        assert_eq!(handler.base().channel().batch_size(), 1);

        let tasks = handler.run();
        assert!(tx.send(Sample::Data(Metric::new("early"))).await.is_ok());
        for _ in 0..20 {
            tokio::task::yield_now().await;
        }

        let report = handler.internal_metrics();
        assert_eq!(report.counter(contracts::METRICS_SENT), Some(1.0));

        // the listener serving `tx` is the one `close_all` stops
        handler.base().close_all().await;
        for task in tasks {
            task.await.unwrap();
        }
    }
}
