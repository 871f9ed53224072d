//! NetworkHandler - UDP datagram transport
//!
//! Batches are split into datagrams of `metrics_per_datagram` metrics. Each
//! datagram is reported to the emission window on its own, so this handler
//! opts out of the dispatcher's per-batch bookkeeping.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use contracts::{ContractError, Emitter, Metric, MetricType, Settings};
use serde::{Deserialize, Serialize};
use tokio::net::UdpSocket;
use tokio::sync::OnceCell;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, instrument, warn};

use crate::base::{BaseHandler, Handler, HandlerParams};
use crate::emission::EmissionReporter;
use crate::error::{HandlerError, Result};
use crate::window::EmissionRecord;

const DEFAULT_METRICS_PER_DATAGRAM: usize = 50;
const DEFAULT_MAX_PACKET_SIZE: usize = 65000;

/// Serialization format for network transmission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NetworkFormat {
    /// JSON (human-readable, larger)
    #[default]
    Json,
    /// Bincode (binary, compact)
    Bincode,
}

/// Handler specific settings of [`NetworkHandler`]
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkConfig {
    /// Target address
    pub addr: SocketAddr,
    pub format: NetworkFormat,
    /// Metrics per datagram
    pub metrics_per_datagram: usize,
    /// Datagrams above this size are rejected (UDP over IPv4 allows 65507)
    pub max_packet_size: usize,
}

impl NetworkConfig {
    /// Read `addr`, `format`, `metrics_per_datagram` and `max_packet_size`
    pub fn from_settings(settings: &Settings) -> std::result::Result<Self, ContractError> {
        let addr_str = settings
            .string("addr")?
            .ok_or_else(|| ContractError::config_validation("addr", "missing 'addr' setting"))?;

        let addr: SocketAddr = addr_str.parse().map_err(|e| {
            ContractError::config_validation("addr", format!("invalid address '{addr_str}': {e}"))
        })?;

        let format = match settings.string("format")?.as_deref() {
            Some("bincode") => NetworkFormat::Bincode,
            Some("json") | None => NetworkFormat::Json,
            Some(other) => {
                return Err(ContractError::config_validation(
                    "format",
                    format!("unknown format '{other}'"),
                ))
            }
        };

        let metrics_per_datagram =
            positive_or(settings, "metrics_per_datagram", DEFAULT_METRICS_PER_DATAGRAM)?;
        let max_packet_size =
            positive_or(settings, "max_packet_size", DEFAULT_MAX_PACKET_SIZE)?;

        Ok(Self {
            addr,
            format,
            metrics_per_datagram,
            max_packet_size,
        })
    }
}

fn positive_or(
    settings: &Settings,
    key: &str,
    default: usize,
) -> std::result::Result<usize, ContractError> {
    match settings.int(key)? {
        None => Ok(default),
        Some(value) if value > 0 => Ok(value as usize),
        Some(value) => Err(ContractError::config_validation(
            key,
            format!("must be positive, got {value}"),
        )),
    }
}

/// One metric as it travels on the wire: prefix applied, dimensions merged
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireMetric {
    pub name: String,
    pub metric_type: MetricType,
    pub value: f64,
    pub dimensions: HashMap<String, String>,
}

/// Handler that streams metrics over UDP
pub struct NetworkHandler {
    base: BaseHandler,
    config: Option<NetworkConfig>,
}

impl NetworkHandler {
    pub fn new(params: HandlerParams) -> Self {
        let mut base = BaseHandler::new(params);
        base.override_emission_reporting();
        Self { base, config: None }
    }

    pub fn config(&self) -> Option<&NetworkConfig> {
        self.config.as_ref()
    }

    fn emitter(&self) -> Result<NetworkEmitter> {
        let config = self.config.clone().ok_or_else(|| {
            HandlerError::config(self.base.name(), "network handler not configured")
        })?;

        Ok(NetworkEmitter {
            name: self.base.name().to_string(),
            config,
            timeout: self.base.timeout(),
            prefix: self.base.prefix().to_string(),
            default_dimensions: self.base.default_dimensions().clone(),
            reporter: self.base.emission_reporter(),
            socket: OnceCell::new(),
        })
    }
}

impl Handler for NetworkHandler {
    fn base(&self) -> &BaseHandler {
        &self.base
    }

    fn base_mut(&mut self) -> &mut BaseHandler {
        &mut self.base
    }

    fn configure(&mut self, settings: &Settings) -> Result<()> {
        self.base.configure_common(settings);
        let config = NetworkConfig::from_settings(settings)
            .map_err(|e| HandlerError::config(self.base.name(), e.to_string()))?;
        debug!(handler = %self.base.name(), target = %config.addr, "Network handler configured");
        self.config = Some(config);
        Ok(())
    }

    fn run(&self) -> Vec<JoinHandle<()>> {
        match self.emitter() {
            Ok(emitter) => self.base.run(Arc::new(emitter)),
            Err(e) => {
                error!(handler = %self.base.name(), error = %e, "Cannot start handler");
                Vec::new()
            }
        }
    }
}

/// Emitter half of [`NetworkHandler`]; the socket is bound on first use
struct NetworkEmitter {
    name: String,
    config: NetworkConfig,
    timeout: Duration,
    prefix: String,
    default_dimensions: HashMap<String, String>,
    reporter: EmissionReporter,
    socket: OnceCell<UdpSocket>,
}

impl NetworkEmitter {
    async fn socket(&self) -> std::io::Result<&UdpSocket> {
        self.socket
            .get_or_try_init(|| async {
                let bind_addr = if self.config.addr.is_ipv4() {
                    "0.0.0.0:0"
                } else {
                    "[::]:0"
                };
                let socket = UdpSocket::bind(bind_addr).await?;
                socket.connect(self.config.addr).await?;
                debug!(handler = %self.name, target = %self.config.addr, "Socket connected");
                Ok(socket)
            })
            .await
    }

    fn to_wire(&self, metric: &Metric) -> WireMetric {
        WireMetric {
            name: metric.prefixed_name(&self.prefix),
            metric_type: metric.metric_type,
            value: metric.value,
            dimensions: metric.dimensions_with(&self.default_dimensions),
        }
    }

    fn encode(&self, chunk: &[Metric]) -> std::result::Result<Vec<u8>, ContractError> {
        let wire: Vec<WireMetric> = chunk.iter().map(|m| self.to_wire(m)).collect();
        let data = match self.config.format {
            NetworkFormat::Json => serde_json::to_vec(&wire)
                .map_err(|e| ContractError::emit(&self.name, format!("json error: {e}")))?,
            NetworkFormat::Bincode => bincode::serialize(&wire)
                .map_err(|e| ContractError::emit(&self.name, format!("bincode error: {e}")))?,
        };

        if data.len() > self.config.max_packet_size {
            return Err(ContractError::emit(
                &self.name,
                format!(
                    "datagram of {} bytes exceeds max_packet_size {}",
                    data.len(),
                    self.config.max_packet_size
                ),
            ));
        }
        Ok(data)
    }

    async fn send_chunk(
        &self,
        socket: &UdpSocket,
        chunk: &[Metric],
    ) -> std::result::Result<usize, ContractError> {
        let data = self.encode(chunk)?;
        match tokio::time::timeout(self.timeout, socket.send(&data)).await {
            Ok(Ok(sent)) => Ok(sent),
            Ok(Err(e)) => Err(ContractError::connection(&self.name, e.to_string())),
            Err(_) => Err(ContractError::connection(
                &self.name,
                format!("send timed out after {:?}", self.timeout),
            )),
        }
    }
}

impl Emitter for NetworkEmitter {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "network_handler_emit",
        skip(self, batch),
        fields(handler = %self.name, metrics = batch.len())
    )]
    async fn emit(&self, batch: &[Metric]) -> std::result::Result<(), ContractError> {
        let start = Instant::now();
        let socket = match self.socket().await {
            Ok(socket) => socket,
            Err(e) => {
                let record = EmissionRecord::new(Instant::now(), start.elapsed(), batch.len());
                self.reporter.report(false, record);
                return Err(ContractError::connection(&self.name, e.to_string()));
            }
        };

        let mut failed = 0;
        for chunk in batch.chunks(self.config.metrics_per_datagram) {
            let start = Instant::now();
            let result = self.send_chunk(socket, chunk).await;
            let record = EmissionRecord::new(Instant::now(), start.elapsed(), chunk.len());

            match &result {
                Ok(bytes) => debug!(metrics = chunk.len(), bytes, "Datagram sent"),
                Err(e) => {
                    warn!(metrics = chunk.len(), error = %e, "Datagram not sent");
                    failed += chunk.len();
                }
            }
            self.reporter.report(result.is_ok(), record);
        }

        if failed > 0 {
            return Err(ContractError::emit(
                &self.name,
                format!("{failed} of {} metrics not sent", batch.len()),
            ));
        }
        Ok(())
    }
}
