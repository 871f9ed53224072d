//! AgentConfig - config_loader output
//!
//! Describes the full agent: global prefix/dimensions, the known collectors,
//! their optional settings, and the handlers to instantiate.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::Settings;

/// Full agent configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Prefix applied to every emitted metric name
    #[serde(default)]
    pub prefix: String,

    /// Dimensions attached to every metric unless a handler overrides them
    #[serde(default)]
    pub default_dimensions: HashMap<String, String>,

    /// Period of the internal metrics self-report, in seconds (None = disabled)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub internal_metrics_interval_secs: Option<u64>,

    /// Every collector known to the agent
    #[serde(default)]
    pub collectors: Vec<String>,

    /// Per-collector settings (e.g. `max_buffer_size` override)
    #[serde(default)]
    pub collector_settings: HashMap<String, Settings>,

    /// Handlers to instantiate
    #[serde(default)]
    pub handlers: Vec<HandlerConfig>,
}

impl AgentConfig {
    /// Settings of one collector, if any were configured
    pub fn collector_settings(&self, collector: &str) -> Option<&Settings> {
        self.collector_settings.get(collector)
    }

    /// Look up a handler configuration by its full name
    pub fn handler(&self, name: &str) -> Option<&HandlerConfig> {
        self.handlers.iter().find(|h| h.name == name)
    }
}

/// One handler entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandlerConfig {
    /// Handler name; text after the first space distinguishes instances of
    /// the same type (e.g. "Network secondary")
    pub name: String,

    /// Handler settings
    #[serde(default)]
    pub settings: Settings,
}

impl HandlerConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            settings: Settings::default(),
        }
    }

    /// Handler type the name resolves to
    pub fn handler_type(&self) -> &str {
        handler_type(&self.name)
    }
}

/// Registry key of a possibly suffixed handler name.
///
/// Everything after the first space is an instance suffix.
pub fn handler_type(name: &str) -> &str {
    name.split_once(' ').map_or(name, |(handler_type, _)| handler_type)
}
