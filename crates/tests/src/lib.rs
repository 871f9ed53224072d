//! # Integration Tests
//!
//! End-to-end tests across crates.
//!
//! Covers:
//! - Contract smoke tests
//! - config_loader -> registry -> handler flows with a capturing handler
//! - The UDP network handler driven from a loaded configuration

#[cfg(test)]
mod contract_tests {
    use contracts::{Metric, Sample};

    #[test]
    fn test_control_samples_never_equal_data() {
        let zero = Sample::Data(Metric::new(""));
        assert_ne!(zero, Sample::Flush);
        assert_ne!(zero, Sample::Close);
        assert!(Sample::Flush.is_control());
        assert!(!zero.is_control());
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{AgentConfig, ContractError, Emitter, Metric};
    use handler::{BaseHandler, Handler, HandlerRegistry};
    use tokio::task::JoinHandle;

    type Captured = Arc<Mutex<Vec<Vec<Metric>>>>;

    /// Handler that keeps every batch it is asked to emit
    struct CaptureHandler {
        base: BaseHandler,
        captured: Captured,
    }

    struct CaptureEmitter {
        name: String,
        captured: Captured,
    }

    impl Emitter for CaptureEmitter {
        fn name(&self) -> &str {
            &self.name
        }

        async fn emit(&self, batch: &[Metric]) -> Result<(), ContractError> {
            self.captured.lock().unwrap().push(batch.to_vec());
            Ok(())
        }
    }

    impl Handler for CaptureHandler {
        fn base(&self) -> &BaseHandler {
            &self.base
        }

        fn base_mut(&mut self) -> &mut BaseHandler {
            &mut self.base
        }

        fn run(&self) -> Vec<JoinHandle<()>> {
            self.base.run(Arc::new(CaptureEmitter {
                name: self.base.name().to_string(),
                captured: Arc::clone(&self.captured),
            }))
        }
    }

    fn registry_with_capture(captured: &Captured) -> HandlerRegistry {
        let registry = HandlerRegistry::with_builtin();
        let captured = Arc::clone(captured);
        registry.register("Capture", move |params| {
            Box::new(CaptureHandler {
                base: BaseHandler::new(params),
                captured: Arc::clone(&captured),
            })
        });
        registry
    }

    /// Create, configure and wire one handler the way the agent does
    fn build(registry: &HandlerRegistry, config: &AgentConfig, name: &str) -> Box<dyn Handler> {
        let handler_config = config.handler(name).unwrap();
        let mut handler = registry.create(name).unwrap();
        handler.base_mut().set_prefix(config.prefix.clone());
        handler.configure(&handler_config.settings).unwrap();
        handler.base_mut().init_listeners(config);
        handler
    }

    async fn settle() {
        for _ in 0..20 {
            tokio::task::yield_now().await;
        }
    }

    fn batch_sizes(captured: &Captured) -> Vec<usize> {
        captured.lock().unwrap().iter().map(Vec::len).collect()
    }

    const AGENT_TOML: &str = r#"
prefix = "svc."
collectors = ["cpu", "memory", "disk"]

[collector_settings.disk]
max_buffer_size = 3

[[handlers]]
name = "Capture"
[handlers.settings]
interval = "2"
max_buffer_size = 2
collector_blacklist = ["memory"]

[[handlers]]
name = "Capture whitelisted"
[handlers.settings]
collector_whitelist = '["cpu"]'
"#;

    #[tokio::test(start_paused = true)]
    async fn test_size_then_interval_flush_from_config() {
        let config = ConfigLoader::load_from_str(AGENT_TOML, ConfigFormat::Toml).unwrap();
        let captured = Captured::default();
        let registry = registry_with_capture(&captured);
        let handler = build(&registry, &config, "Capture");

        let tasks = handler.run();
        // default endpoint plus cpu and disk
        assert_eq!(tasks.len(), 3);

        let cpu = handler.base().collector_endpoints()["cpu"].clone();
        for value in [1.0, 2.0, 3.0] {
            assert!(cpu.send(Metric::new("load").with_value(value)).await);
        }
        settle().await;
        assert_eq!(batch_sizes(&captured), vec![2]);

        tokio::time::sleep(Duration::from_millis(2100)).await;
        settle().await;
        assert_eq!(batch_sizes(&captured), vec![2, 1]);

        let report = handler.internal_metrics();
        assert_eq!(report.counter(contracts::METRICS_SENT), Some(3.0));
        assert_eq!(report.counter(contracts::TOTAL_EMISSIONS), Some(2.0));
        assert_eq!(report.counter(contracts::METRICS_DROPPED), Some(0.0));
        assert_eq!(report.gauge(contracts::INTERVAL_LENGTH), Some(2.0));

        handler.base().close_all().await;
        for task in tasks {
            task.await.unwrap();
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_collector_override_and_filters() {
        let config = ConfigLoader::load_from_str(AGENT_TOML, ConfigFormat::Toml).unwrap();
        let captured = Captured::default();
        let registry = registry_with_capture(&captured);

        let handler = build(&registry, &config, "Capture");
        let endpoints = handler.base().collector_endpoints();
        assert!(!endpoints.contains_key("memory"));
        assert_eq!(endpoints["cpu"].batch_size(), 2);
        assert_eq!(endpoints["disk"].batch_size(), 3);

        let whitelisted = build(&registry, &config, "Capture whitelisted");
        assert_eq!(whitelisted.name(), "Capture whitelisted");
        let endpoints = whitelisted.base().collector_endpoints();
        assert_eq!(endpoints.len(), 1);
        assert!(endpoints.contains_key("cpu"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_flush_and_close_through_endpoints() {
        let config = ConfigLoader::load_from_str(AGENT_TOML, ConfigFormat::Toml).unwrap();
        let captured = Captured::default();
        let registry = registry_with_capture(&captured);
        let handler = build(&registry, &config, "Capture");
        let tasks = handler.run();

        let disk = handler.base().collector_endpoints()["disk"].clone();
        assert!(disk.send(Metric::new("used")).await);
        assert!(disk.flush().await);
        settle().await;
        assert_eq!(batch_sizes(&captured), vec![1]);

        // Pending at close: discarded, never emitted
        assert!(disk.send(Metric::new("used")).await);
        handler.base().close_all().await;
        for task in tasks {
            task.await.unwrap();
        }
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(batch_sizes(&captured), vec![1]);
    }

    #[tokio::test]
    async fn test_unknown_handler_from_config() {
        let config = ConfigLoader::load_from_str(
            "[[handlers]]\nname = \"Carbon primary\"\n",
            ConfigFormat::Toml,
        )
        .unwrap();
        let registry = HandlerRegistry::with_builtin();

        let result = registry.create(&config.handlers[0].name);
        assert!(matches!(
            result,
            Err(handler::HandlerError::UnknownHandler { .. })
        ));
    }

    #[tokio::test]
    async fn test_network_handler_from_config() {
        let receiver = tokio::net::UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = receiver.local_addr().unwrap();

        let toml = format!(
            r#"
prefix = "svc."
collectors = ["cpu"]

[[handlers]]
name = "Network"
[handlers.settings]
addr = "{addr}"
max_buffer_size = 2
interval = 60
"#
        );
        let config = ConfigLoader::load_from_str(&toml, ConfigFormat::Toml).unwrap();
        let registry = HandlerRegistry::with_builtin();
        let handler = build(&registry, &config, "Network");
        let tasks = handler.run();

        let cpu = handler.base().collector_endpoints()["cpu"].clone();
        assert!(cpu.send(Metric::new("load").with_value(0.5)).await);
        assert!(cpu.send(Metric::new("idle").with_value(0.5)).await);

        let mut buf = vec![0u8; 65536];
        let len = tokio::time::timeout(Duration::from_secs(5), receiver.recv(&mut buf))
            .await
            .unwrap()
            .unwrap();
        let wire: Vec<handler::handlers::WireMetric> =
            serde_json::from_slice(&buf[..len]).unwrap();
        assert_eq!(wire.len(), 2);
        assert_eq!(wire[0].name, "svc.load");

        handler.base().close_all().await;
        for task in tasks {
            task.await.unwrap();
        }
    }
}
