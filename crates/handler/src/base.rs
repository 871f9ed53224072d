//! BaseHandler - the engine shared by every concrete handler
//!
//! Owns the default endpoint, the collector endpoint map, filters, the
//! rolling emission window, counters and the common configuration. Concrete
//! handlers embed a `BaseHandler` and supply an [`Emitter`].

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_channel::Sender;
use contracts::{AgentConfig, ContractError, Emitter, InternalMetrics, Sample, Settings};
use tokio::task::JoinHandle;
use tracing::{info, instrument, warn, Instrument, Span};

use crate::emission::{Dispatcher, EmissionReporter};
use crate::endpoint::Endpoint;
use crate::error::Result;
use crate::filter::CollectorFilter;
use crate::listener::{listen, DEFAULT_ENDPOINT_LABEL};
use crate::metrics::{build_internal_metrics, EmissionCounters};
use crate::window::EmissionWindow;

pub const DEFAULT_BUFFER_SIZE: usize = 100;
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(10);
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);
pub const DEFAULT_MAX_IDLE_CONNECTIONS_PER_HOST: usize = 2;
pub const DEFAULT_KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(30);
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1;

/// Common settings keys understood by every handler
pub mod keys {
    pub const TIMEOUT: &str = "timeout";
    pub const MAX_BUFFER_SIZE: &str = "max_buffer_size";
    pub const INTERVAL: &str = "interval";
    pub const DEFAULT_DIMENSIONS: &str = "default_dimensions";
    pub const KEEP_ALIVE_INTERVAL: &str = "keep_alive_interval";
    pub const MAX_IDLE_CONNECTIONS_PER_HOST: &str = "max_idle_connections_per_host";
    pub const COLLECTOR_BLACKLIST: &str = "collector_blacklist";
    pub const COLLECTOR_WHITELIST: &str = "collector_whitelist";
    pub const CHANNEL_BUFFER_SIZE: &str = "channel_buffer_size";
}

/// Construction parameters passed by the registry
#[derive(Debug, Clone)]
pub struct HandlerParams {
    /// Full handler name, suffix included
    pub name: String,
    pub interval: Duration,
    pub max_buffer_size: usize,
    pub timeout: Duration,
    /// Span every log line of the handler is recorded under
    pub span: Span,
}

impl HandlerParams {
    /// Default parameters with a span labelled by `name`
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let span = tracing::info_span!("handler", handler = %name);
        Self {
            name,
            interval: DEFAULT_INTERVAL,
            max_buffer_size: DEFAULT_BUFFER_SIZE,
            timeout: DEFAULT_TIMEOUT,
            span,
        }
    }
}

/// A downstream handler instance.
///
/// Object safe so the registry can hand out `Box<dyn Handler>`.
pub trait Handler: Send + Sync {
    fn base(&self) -> &BaseHandler;

    fn base_mut(&mut self) -> &mut BaseHandler;

    /// Apply settings; handlers with own keys extend this.
    ///
    /// An error means the handler is unusable and must not be run.
    fn configure(&mut self, settings: &Settings) -> Result<()> {
        self.base_mut().configure_common(settings);
        Ok(())
    }

    /// Start every listener loop; requires a Tokio runtime
    fn run(&self) -> Vec<JoinHandle<()>>;

    fn internal_metrics(&self) -> InternalMetrics {
        self.base().internal_metrics()
    }

    fn name(&self) -> &str {
        self.base().name()
    }
}

/// Shared handler engine
pub struct BaseHandler {
    name: String,
    span: Span,
    channel: Endpoint,
    collector_endpoints: HashMap<String, Endpoint>,
    prefix: String,
    default_dimensions: HashMap<String, String>,

    interval: Duration,
    max_buffer_size: usize,
    timeout: Duration,
    channel_capacity: usize,

    max_idle_connections_per_host: usize,
    keep_alive_interval: Duration,

    filter: CollectorFilter,

    // When set, the concrete handler books outcomes through `emission_reporter`
    custom_emission_reporting: bool,
    window: Arc<EmissionWindow>,
    counters: Arc<EmissionCounters>,
}

impl BaseHandler {
    pub fn new(params: HandlerParams) -> Self {
        Self {
            channel: Endpoint::new(DEFAULT_CHANNEL_CAPACITY, params.max_buffer_size),
            collector_endpoints: HashMap::new(),
            prefix: String::new(),
            default_dimensions: HashMap::new(),
            interval: params.interval,
            max_buffer_size: params.max_buffer_size,
            timeout: params.timeout,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            max_idle_connections_per_host: DEFAULT_MAX_IDLE_CONNECTIONS_PER_HOST,
            keep_alive_interval: DEFAULT_KEEP_ALIVE_INTERVAL,
            filter: CollectorFilter::default(),
            custom_emission_reporting: false,
            window: Arc::new(EmissionWindow::new(params.interval)),
            counters: Arc::new(EmissionCounters::new()),
            name: params.name,
            span: params.span,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    // ===== Channels =====

    /// The handler's own default endpoint.
    ///
    /// The channel is created once with the handler; its flush limit is the
    /// current `max_buffer_size`.
    pub fn channel(&self) -> Endpoint {
        self.channel.with_batch_size(self.max_buffer_size)
    }

    /// Sender for metrics addressed to the handler directly
    pub fn sender(&self) -> Sender<Sample> {
        self.channel.sender()
    }

    pub fn collector_endpoints(&self) -> &HashMap<String, Endpoint> {
        &self.collector_endpoints
    }

    pub fn set_collector_endpoints(&mut self, endpoints: HashMap<String, Endpoint>) {
        self.collector_endpoints = endpoints;
    }

    /// Build the endpoint map from the agent's collector list and this
    /// handler's filters.
    #[instrument(name = "handler_init_listeners", skip(self, config), fields(handler = %self.name))]
    pub fn init_listeners(&mut self, config: &AgentConfig) {
        let endpoints =
            self.filter
                .build_endpoints(config, self.max_buffer_size, self.channel_capacity);

        let mut names: Vec<&str> = endpoints.keys().map(String::as_str).collect();
        names.sort_unstable();
        info!(endpoints = ?names, "Collector endpoints initialized");

        self.set_collector_endpoints(endpoints);
    }

    // ===== Configuration =====

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn set_interval(&mut self, interval: Duration) {
        self.interval = interval;
        self.window.set_interval(interval);
    }

    pub fn max_buffer_size(&self) -> usize {
        self.max_buffer_size
    }

    /// Read by `run` and `init_listeners`; running listeners keep their limit
    pub fn set_max_buffer_size(&mut self, size: usize) {
        self.max_buffer_size = size;
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    pub fn channel_capacity(&self) -> usize {
        self.channel_capacity
    }

    /// Capacity of collector endpoints built afterwards. The default channel
    /// keeps the capacity it was created with.
    pub fn set_channel_capacity(&mut self, capacity: usize) {
        self.channel_capacity = capacity.max(1);
    }

    /// Prefix prepended verbatim to metric names; include your own punctuation
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn set_prefix(&mut self, prefix: impl Into<String>) {
        self.prefix = prefix.into();
    }

    pub fn default_dimensions(&self) -> &HashMap<String, String> {
        &self.default_dimensions
    }

    /// Replaces the whole map
    pub fn set_default_dimensions(&mut self, dimensions: HashMap<String, String>) {
        self.default_dimensions = dimensions;
    }

    pub fn max_idle_connections_per_host(&self) -> usize {
        self.max_idle_connections_per_host
    }

    pub fn set_max_idle_connections_per_host(&mut self, value: usize) {
        self.max_idle_connections_per_host = value;
    }

    pub fn keep_alive_interval(&self) -> Duration {
        self.keep_alive_interval
    }

    pub fn set_keep_alive_interval(&mut self, interval: Duration) {
        self.keep_alive_interval = interval;
    }

    // ===== Filters =====

    pub fn filter(&self) -> &CollectorFilter {
        &self.filter
    }

    pub fn collector_whitelist(&self) -> &HashSet<String> {
        self.filter.whitelist()
    }

    pub fn collector_blacklist(&self) -> &HashSet<String> {
        self.filter.blacklist()
    }

    pub fn set_collector_whitelist<I>(&mut self, collectors: I)
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.filter.set_whitelist(collectors);
    }

    pub fn set_collector_blacklist<I>(&mut self, collectors: I)
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.filter.set_blacklist(collectors);
    }

    pub fn is_collector_whitelisted(&self, collector: &str) -> bool {
        self.filter.is_whitelisted(collector)
    }

    pub fn is_collector_blacklisted(&self, collector: &str) -> bool {
        self.filter.is_blacklisted(collector)
    }

    /// Apply the settings every handler understands.
    ///
    /// A malformed value is logged and replaced by its documented default.
    pub fn configure_common(&mut self, settings: &Settings) {
        let _guard = self.span.clone().entered();

        if settings.contains_key(keys::TIMEOUT) {
            let timeout = match self.setting(settings.float(keys::TIMEOUT), keys::TIMEOUT) {
                Some(secs) if secs > 0.0 => {
                    Duration::try_from_secs_f64(secs).unwrap_or(DEFAULT_TIMEOUT)
                }
                Some(secs) => {
                    warn!(
                        handler = %self.name,
                        key = keys::TIMEOUT,
                        secs,
                        "Setting must be positive, using default"
                    );
                    DEFAULT_TIMEOUT
                }
                None => DEFAULT_TIMEOUT,
            };
            self.set_timeout(timeout);
        }

        match self.positive(settings, keys::MAX_BUFFER_SIZE) {
            Some(Some(size)) => self.set_max_buffer_size(size),
            Some(None) => self.set_max_buffer_size(DEFAULT_BUFFER_SIZE),
            None => {}
        }

        match self.positive(settings, keys::INTERVAL) {
            Some(Some(secs)) => self.set_interval(Duration::from_secs(secs as u64)),
            Some(None) => self.set_interval(DEFAULT_INTERVAL),
            None => {}
        }

        match self.positive(settings, keys::CHANNEL_BUFFER_SIZE) {
            Some(Some(capacity)) => self.set_channel_capacity(capacity),
            Some(None) => self.set_channel_capacity(DEFAULT_CHANNEL_CAPACITY),
            None => {}
        }

        if settings.contains_key(keys::DEFAULT_DIMENSIONS) {
            let dimensions = self
                .setting(
                    settings.string_map(keys::DEFAULT_DIMENSIONS),
                    keys::DEFAULT_DIMENSIONS,
                )
                .unwrap_or_default();
            self.set_default_dimensions(dimensions);
        }

        match self.positive(settings, keys::KEEP_ALIVE_INTERVAL) {
            Some(Some(secs)) => self.set_keep_alive_interval(Duration::from_secs(secs as u64)),
            Some(None) => self.set_keep_alive_interval(DEFAULT_KEEP_ALIVE_INTERVAL),
            None => {}
        }

        match self.positive(settings, keys::MAX_IDLE_CONNECTIONS_PER_HOST) {
            Some(Some(value)) => self.set_max_idle_connections_per_host(value),
            Some(None) => {
                self.set_max_idle_connections_per_host(DEFAULT_MAX_IDLE_CONNECTIONS_PER_HOST)
            }
            None => {}
        }

        if settings.contains_key(keys::COLLECTOR_BLACKLIST) {
            let blacklist = self
                .setting(
                    settings.string_list(keys::COLLECTOR_BLACKLIST),
                    keys::COLLECTOR_BLACKLIST,
                )
                .unwrap_or_default();
            self.set_collector_blacklist(blacklist);
        }

        if settings.contains_key(keys::COLLECTOR_WHITELIST) {
            let whitelist = self
                .setting(
                    settings.string_list(keys::COLLECTOR_WHITELIST),
                    keys::COLLECTOR_WHITELIST,
                )
                .unwrap_or_default();
            self.set_collector_whitelist(whitelist);
        }
    }

    /// Unwrap a settings lookup, logging malformed values
    fn setting<T>(
        &self,
        value: std::result::Result<Option<T>, ContractError>,
        key: &str,
    ) -> Option<T> {
        match value {
            Ok(value) => value,
            Err(e) => {
                warn!(handler = %self.name, key, error = %e, "Malformed setting, using default");
                None
            }
        }
    }

    /// `None`: key absent. `Some(None)`: present but unusable (fall back).
    fn positive(&self, settings: &Settings, key: &str) -> Option<Option<usize>> {
        if !settings.contains_key(key) {
            return None;
        }
        match self.setting(settings.int(key), key) {
            Some(value) if value > 0 => Some(Some(value as usize)),
            Some(value) => {
                warn!(handler = %self.name, key, value, "Setting must be positive, using default");
                Some(None)
            }
            None => Some(None),
        }
    }

    // ===== Emission =====

    /// Opt out of the dispatcher's bookkeeping; the handler then reports
    /// outcomes through [`BaseHandler::emission_reporter`].
    pub fn override_emission_reporting(&mut self) {
        self.custom_emission_reporting = true;
    }

    pub fn uses_custom_emission_reporting(&self) -> bool {
        self.custom_emission_reporting
    }

    pub fn emission_reporter(&self) -> EmissionReporter {
        EmissionReporter::new(
            Arc::from(self.name.as_str()),
            Arc::clone(&self.window),
            Arc::clone(&self.counters),
        )
    }

    pub fn window(&self) -> &Arc<EmissionWindow> {
        &self.window
    }

    pub fn counters(&self) -> &Arc<EmissionCounters> {
        &self.counters
    }

    /// Snapshot counters and window statistics
    pub fn internal_metrics(&self) -> InternalMetrics {
        build_internal_metrics(self.counters.snapshot(), self.window.snapshot(), self.interval)
    }

    /// Spawn one listener for the default endpoint and one per collector
    /// endpoint, all emitting through `emitter`.
    pub fn run<E>(&self, emitter: Arc<E>) -> Vec<JoinHandle<()>>
    where
        E: Emitter + Sync + 'static,
    {
        let dispatcher = Dispatcher::new(
            emitter,
            self.emission_reporter(),
            self.custom_emission_reporting,
        );

        info!(
            parent: &self.span,
            endpoints = self.collector_endpoints.len() + 1,
            interval_secs = self.interval.as_secs_f64(),
            max_buffer_size = self.max_buffer_size,
            "Starting listeners"
        );

        let default = (DEFAULT_ENDPOINT_LABEL, self.channel());
        let collectors = self
            .collector_endpoints
            .iter()
            .map(|(name, endpoint)| (name.as_str(), endpoint.clone()));

        std::iter::once(default)
            .chain(collectors)
            .map(|(collector, endpoint)| {
                let task = listen(
                    dispatcher.clone(),
                    endpoint,
                    self.interval,
                    self.name.clone(),
                    collector.to_string(),
                );
                tokio::spawn(task.instrument(self.span.clone()))
            })
            .collect()
    }

    /// Send `Close` to every endpoint, default included.
    ///
    /// Pending batches are discarded and in-flight dispatches are not awaited.
    pub async fn close_all(&self) {
        self.channel.close().await;
        for endpoint in self.collector_endpoints.values() {
            endpoint.close().await;
        }
    }
}

impl fmt::Display for BaseHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}Handler", self.name)
    }
}

impl fmt::Debug for BaseHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BaseHandler")
            .field("name", &self.name)
            .field("interval", &self.interval)
            .field("max_buffer_size", &self.max_buffer_size)
            .field("endpoints", &self.collector_endpoints.len())
            .finish()
    }
}
