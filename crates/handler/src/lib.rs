//! # Handler
//!
//! Buffering and emission core of the relay agent.
//!
//! Responsibilities:
//! - One listener loop per collector endpoint, flushing on size, interval or request
//! - Detached dispatch of each batch to the handler's emitter
//! - Rolling window of emission timings plus lifetime counters
//! - Collector whitelist / blacklist filtering
//! - Registry of handler constructors with suffix aliasing

mod base;
pub mod emission;
pub mod endpoint;
pub mod error;
pub mod filter;
pub mod handlers;
mod listener;
pub mod metrics;
pub mod registry;
pub mod window;

pub use base::{
    keys, BaseHandler, Handler, HandlerParams, DEFAULT_BUFFER_SIZE, DEFAULT_CHANNEL_CAPACITY,
    DEFAULT_INTERVAL, DEFAULT_KEEP_ALIVE_INTERVAL, DEFAULT_MAX_IDLE_CONNECTIONS_PER_HOST,
    DEFAULT_TIMEOUT,
};
pub use contracts::{Emitter, InternalMetrics, Metric, Sample};
pub use emission::EmissionReporter;
pub use endpoint::Endpoint;
pub use error::HandlerError;
pub use filter::CollectorFilter;
pub use handlers::{LogHandler, NetworkConfig, NetworkFormat, NetworkHandler};
pub use listener::DEFAULT_ENDPOINT_LABEL;
pub use metrics::{CountersSnapshot, EmissionCounters};
pub use registry::{handler_type, HandlerConstructor, HandlerRegistry};
pub use window::{EmissionRecord, EmissionWindow, WindowSnapshot};
