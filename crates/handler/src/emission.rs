//! Emission dispatcher - times each emit call and books its outcome

use std::sync::Arc;

use contracts::{Emitter, Metric};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info};

use crate::metrics::EmissionCounters;
use crate::window::{EmissionRecord, EmissionWindow};

/// Books emission outcomes into a handler's window and counters.
///
/// Handlers that opt into custom reporting receive a clone of this and call
/// [`EmissionReporter::report`] themselves.
#[derive(Debug, Clone)]
pub struct EmissionReporter {
    handler: Arc<str>,
    window: Arc<EmissionWindow>,
    counters: Arc<EmissionCounters>,
}

impl EmissionReporter {
    pub(crate) fn new(
        handler: Arc<str>,
        window: Arc<EmissionWindow>,
        counters: Arc<EmissionCounters>,
    ) -> Self {
        Self {
            handler,
            window,
            counters,
        }
    }

    pub fn handler_name(&self) -> &str {
        &self.handler
    }

    /// Record one completed attempt.
    ///
    /// A failure adds the size of the failed batch to the dropped counter.
    pub fn report(&self, success: bool, record: EmissionRecord) {
        let pruned = self.window.record(record);
        debug!(
            handler = %self.handler,
            pruned,
            in_window = self.window.len(),
            "Emission window updated"
        );

        if success {
            self.counters.record_success(record.count);
            info!(
                handler = %self.handler,
                metrics = record.count,
                duration_secs = record.duration.as_secs_f64(),
                "Batch emitted"
            );
        } else {
            self.counters.record_failure(record.count);
        }

        observability::record_emission(&self.handler, record.count, record.duration, success);
        observability::record_window_len(&self.handler, self.window.len());
    }
}

/// Runs batches through the emitter, one detached task per flush
pub(crate) struct Dispatcher<E> {
    emitter: Arc<E>,
    reporter: EmissionReporter,
    custom_reporting: bool,
}

impl<E> Clone for Dispatcher<E> {
    fn clone(&self) -> Self {
        Self {
            emitter: Arc::clone(&self.emitter),
            reporter: self.reporter.clone(),
            custom_reporting: self.custom_reporting,
        }
    }
}

impl<E> Dispatcher<E>
where
    E: Emitter + Sync + 'static,
{
    pub(crate) fn new(emitter: Arc<E>, reporter: EmissionReporter, custom_reporting: bool) -> Self {
        Self {
            emitter,
            reporter,
            custom_reporting,
        }
    }

    /// Hand a batch off without waiting for it.
    ///
    /// A panic inside the emitter stays inside the spawned task.
    pub(crate) fn spawn(&self, batch: Vec<Metric>) -> JoinHandle<Option<EmissionRecord>> {
        let dispatcher = self.clone();
        tokio::spawn(async move { dispatcher.emit_and_time(batch).await })
    }

    /// Emit synchronously within this call and return the record produced.
    pub(crate) async fn emit_and_time(&self, batch: Vec<Metric>) -> Option<EmissionRecord> {
        let start = Instant::now();
        let result = self.emitter.emit(&batch).await;
        let elapsed = start.elapsed();

        if let Err(ref e) = result {
            error!(
                handler = %self.reporter.handler_name(),
                emitter = self.emitter.name(),
                metrics = batch.len(),
                error = %e,
                "Emission failed, batch dropped"
            );
        }

        if self.custom_reporting {
            return None;
        }

        let record = EmissionRecord::new(Instant::now(), elapsed, batch.len());
        self.reporter.report(result.is_ok(), record);
        Some(record)
    }
}
