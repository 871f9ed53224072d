//! Collector filter - which collectors may feed a handler

use std::collections::{HashMap, HashSet};

use contracts::AgentConfig;
use tracing::{debug, warn};

use crate::endpoint::Endpoint;

/// Settings key of the per-collector batch size override
pub const COLLECTOR_BUFFER_SIZE_KEY: &str = "max_buffer_size";

/// Whitelist / blacklist pair. Replaced wholesale, never edited in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectorFilter {
    whitelist: HashSet<String>,
    blacklist: HashSet<String>,
}

impl CollectorFilter {
    pub fn new<W, B>(whitelist: W, blacklist: B) -> Self
    where
        W: IntoIterator,
        W::Item: Into<String>,
        B: IntoIterator,
        B::Item: Into<String>,
    {
        Self {
            whitelist: whitelist.into_iter().map(Into::into).collect(),
            blacklist: blacklist.into_iter().map(Into::into).collect(),
        }
    }

    pub fn whitelist(&self) -> &HashSet<String> {
        &self.whitelist
    }

    pub fn blacklist(&self) -> &HashSet<String> {
        &self.blacklist
    }

    pub fn set_whitelist<I>(&mut self, collectors: I)
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.whitelist = collectors.into_iter().map(Into::into).collect();
    }

    pub fn set_blacklist<I>(&mut self, collectors: I)
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.blacklist = collectors.into_iter().map(Into::into).collect();
    }

    pub fn is_whitelisted(&self, collector: &str) -> bool {
        self.whitelist.contains(collector)
    }

    pub fn is_blacklisted(&self, collector: &str) -> bool {
        self.blacklist.contains(collector)
    }

    /// Blacklist always wins; an empty whitelist admits everything else.
    pub fn allows(&self, collector: &str) -> bool {
        if self.is_blacklisted(collector) {
            return false;
        }
        self.whitelist.is_empty() || self.is_whitelisted(collector)
    }

    /// Build the endpoint map for every allowed collector in `config`
    pub fn build_endpoints(
        &self,
        config: &AgentConfig,
        default_batch_size: usize,
        channel_capacity: usize,
    ) -> HashMap<String, Endpoint> {
        config
            .collectors
            .iter()
            .filter(|collector| {
                let allowed = self.allows(collector);
                if !allowed {
                    debug!(collector = %collector, "Collector filtered out");
                }
                allowed
            })
            .map(|collector| {
                let batch_size = collector_batch_size(collector, config, default_batch_size);
                (
                    collector.clone(),
                    Endpoint::new(channel_capacity, batch_size),
                )
            })
            .collect()
    }
}

/// Batch size for `collector`: its own override when valid, else `default`
pub fn collector_batch_size(collector: &str, config: &AgentConfig, default: usize) -> usize {
    let Some(settings) = config.collector_settings(collector) else {
        return default;
    };

    match settings.int(COLLECTOR_BUFFER_SIZE_KEY) {
        Ok(Some(size)) if size > 0 => size as usize,
        Ok(None) => default,
        Ok(Some(size)) => {
            warn!(collector, size, "Non-positive collector batch size, using default");
            default
        }
        Err(e) => {
            warn!(collector, error = %e, "Malformed collector batch size, using default");
            default
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::Settings;

    fn agent_config(collectors: &[&str]) -> AgentConfig {
        AgentConfig {
            collectors: collectors.iter().map(|c| c.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_empty_whitelist_admits_all_but_blacklisted() {
        let filter = CollectorFilter::new(Vec::<String>::new(), ["Bad"]);
        assert!(filter.allows("Good"));
        assert!(!filter.allows("Bad"));
    }

    #[test]
    fn test_blacklist_overrides_whitelist() {
        let filter = CollectorFilter::new(["Both", "Only"], ["Both"]);
        assert!(!filter.allows("Both"));
        assert!(filter.allows("Only"));
        assert!(!filter.allows("Neither"));
    }

    #[test]
    fn test_membership_queries() {
        let filter = CollectorFilter::new(["cpu"], ["TestCollector1", "TestCollector2"]);
        assert_eq!(filter.blacklist().len(), 2);
        assert!(filter.is_blacklisted("TestCollector1"));
        assert!(!filter.is_blacklisted("WhiteListed"));
        assert!(filter.is_whitelisted("cpu"));
    }

    #[test]
    fn test_setters_replace_whole_set() {
        let mut filter = CollectorFilter::new(["a", "b"], ["c"]);
        filter.set_whitelist(["z"]);
        filter.set_blacklist(Vec::<String>::new());
        assert_eq!(filter.whitelist().len(), 1);
        assert!(filter.is_whitelisted("z"));
        assert!(!filter.is_whitelisted("a"));
        assert!(filter.blacklist().is_empty());
    }

    #[test]
    fn test_build_endpoints_applies_policy() {
        let config = agent_config(&["cpu", "memory", "disk"]);
        let filter = CollectorFilter::new(["cpu", "memory"], ["memory"]);

        let endpoints = filter.build_endpoints(&config, 100, 1);
        assert_eq!(endpoints.len(), 1);
        assert!(endpoints.contains_key("cpu"));
    }

    #[test]
    fn test_collector_batch_size_override() {
        let mut config = agent_config(&["cpu", "memory", "disk", "net"]);
        config
            .collector_settings
            .insert("cpu".to_string(), Settings::new().with("max_buffer_size", 7));
        config
            .collector_settings
            .insert("memory".to_string(), Settings::new().with("max_buffer_size", "twelve"));
        config
            .collector_settings
            .insert("disk".to_string(), Settings::new().with("interval", 3));

        assert_eq!(collector_batch_size("cpu", &config, 100), 7);
        assert_eq!(collector_batch_size("memory", &config, 100), 100);
        assert_eq!(collector_batch_size("disk", &config, 100), 100);
        assert_eq!(collector_batch_size("net", &config, 100), 100);

        let endpoints = CollectorFilter::default().build_endpoints(&config, 100, 1);
        assert_eq!(endpoints.len(), 4);
        assert_eq!(endpoints["cpu"].batch_size(), 7);
        assert_eq!(endpoints["net"].batch_size(), 100);
    }
}
