//! Listener loop - batches one endpoint and flushes on size, tick or request

use std::time::Duration;

use contracts::{Emitter, Metric, Sample};
use observability::FlushTrigger;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, instrument, trace};

use crate::emission::Dispatcher;
use crate::endpoint::Endpoint;

/// Ticks shorter than this would spin the loop
const MIN_TICK: Duration = Duration::from_millis(1);

/// Collector label used for the handler's own default endpoint
pub const DEFAULT_ENDPOINT_LABEL: &str = "default";

/// Drain `endpoint` until it receives `Close` (or every sender is gone).
///
/// Flushes are handed to detached dispatch tasks so a slow transport never
/// stalls the loop. The partially filled batch at `Close` is discarded.
#[instrument(
    name = "handler_listener_loop",
    skip(dispatcher, endpoint, interval),
    fields(handler = %handler, collector = %collector, batch_size = endpoint.batch_size())
)]
pub(crate) async fn listen<E>(
    dispatcher: Dispatcher<E>,
    endpoint: Endpoint,
    interval: Duration,
    handler: String,
    collector: String,
) where
    E: Emitter + Sync + 'static,
{
    let rx = endpoint.receiver();
    let limit = endpoint.batch_size();
    let period = interval.max(MIN_TICK);

    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut batch: Vec<Metric> = Vec::with_capacity(limit);
    let flush = |batch: &mut Vec<Metric>, trigger: FlushTrigger| {
        let full = std::mem::replace(batch, Vec::with_capacity(limit));
        debug!(size = full.len(), %trigger, "Flushing batch");
        observability::record_flush(&handler, &collector, trigger, full.len());
        // detached: completion is booked by the dispatch task itself
        drop(dispatcher.spawn(full));
    };

    debug!("Listener started");

    loop {
        tokio::select! {
            received = rx.recv() => match received {
                Ok(Sample::Data(metric)) => {
                    trace!(metric = %metric.name, "Metric received");
                    batch.push(metric);
                    if batch.len() >= limit {
                        flush(&mut batch, FlushTrigger::Size);
                    }
                }
                Ok(Sample::Flush) => {
                    info!(pending = batch.len(), "Flush requested");
                    if !batch.is_empty() {
                        flush(&mut batch, FlushTrigger::Flush);
                    }
                }
                Ok(Sample::Close) | Err(_) => break,
            },
            _ = ticker.tick() => {
                if !batch.is_empty() {
                    flush(&mut batch, FlushTrigger::Interval);
                }
            }
        }
    }

    debug!(discarded = batch.len(), "Listener stopped");
}
