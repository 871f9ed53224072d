//! `info` command implementation.

use std::collections::HashMap;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use crate::cli::InfoArgs;
use crate::error::CliError;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    prefix: String,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    default_dimensions: HashMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    internal_metrics_interval_secs: Option<u64>,
    collectors: Vec<CollectorInfo>,
    handlers: Vec<HandlerInfo>,
}

#[derive(Serialize)]
struct CollectorInfo {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_buffer_size: Option<i64>,
}

#[derive(Serialize)]
struct HandlerInfo {
    name: String,
    handler_type: String,
    registered: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    settings: Option<serde_json::Value>,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    if !args.config.exists() {
        return Err(CliError::config_not_found(args.config.display().to_string()).into());
    }

    let config = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    let info = build_config_info(&config, args)?;
    if args.json {
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&info);
    }

    Ok(())
}

fn build_config_info(config: &contracts::AgentConfig, args: &InfoArgs) -> Result<ConfigInfo> {
    let registry = handler::HandlerRegistry::with_builtin();

    let collectors = config
        .collectors
        .iter()
        .map(|name| CollectorInfo {
            name: name.clone(),
            max_buffer_size: config
                .collector_settings(name)
                .and_then(|s| s.int("max_buffer_size").ok().flatten()),
        })
        .collect();

    let handlers = config
        .handlers
        .iter()
        .map(|h| {
            let settings = if args.settings {
                Some(serde_json::to_value(&h.settings).context("Failed to render settings")?)
            } else {
                None
            };
            Ok(HandlerInfo {
                name: h.name.clone(),
                handler_type: h.handler_type().to_string(),
                registered: registry.contains(h.handler_type()),
                settings,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(ConfigInfo {
        prefix: config.prefix.clone(),
        default_dimensions: config.default_dimensions.clone(),
        internal_metrics_interval_secs: config.internal_metrics_interval_secs,
        collectors,
        handlers,
    })
}

fn print_config_info(info: &ConfigInfo) {
    println!("=== Relay Agent Configuration ===\n");

    println!("Global");
    println!(
        "   ├─ Prefix: {}",
        if info.prefix.is_empty() { "(none)" } else { &info.prefix }
    );
    let mut dimensions: Vec<_> = info.default_dimensions.iter().collect();
    dimensions.sort();
    println!("   ├─ Default dimensions: {:?}", dimensions);
    match info.internal_metrics_interval_secs {
        Some(secs) => println!("   └─ Internal metrics: every {secs}s"),
        None => println!("   └─ Internal metrics: disabled"),
    }

    println!("\nCollectors ({})", info.collectors.len());
    for (i, collector) in info.collectors.iter().enumerate() {
        let prefix = tree_prefix(i, info.collectors.len());
        match collector.max_buffer_size {
            Some(size) => println!("   {} {} (batch {})", prefix, collector.name, size),
            None => println!("   {} {}", prefix, collector.name),
        }
    }

    println!("\nHandlers ({})", info.handlers.len());
    for (i, handler) in info.handlers.iter().enumerate() {
        let prefix = tree_prefix(i, info.handlers.len());
        let status = if handler.registered { "" } else { " [unknown type]" };
        println!("   {} {} ({}){}", prefix, handler.name, handler.handler_type, status);
        if let Some(ref settings) = handler.settings {
            println!("        settings: {}", settings);
        }
    }

    println!();
}

fn tree_prefix(index: usize, len: usize) -> &'static str {
    if index + 1 == len {
        "└─"
    } else {
        "├─"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{AgentConfig, HandlerConfig, Settings};

    #[test]
    fn test_build_config_info() {
        let config = AgentConfig {
            collectors: vec!["cpu".into(), "memory".into()],
            collector_settings: HashMap::from([(
                "cpu".to_string(),
                Settings::new().with("max_buffer_size", 7),
            )]),
            handlers: vec![
                HandlerConfig {
                    name: "Network secondary".into(),
                    settings: Settings::new().with("addr", "127.0.0.1:9999"),
                },
                HandlerConfig::new("Carbon"),
            ],
            ..Default::default()
        };
        let args = InfoArgs {
            config: "agent.toml".into(),
            json: true,
            settings: true,
        };

        let info = build_config_info(&config, &args).unwrap();
        assert_eq!(info.collectors[0].max_buffer_size, Some(7));
        assert_eq!(info.collectors[1].max_buffer_size, None);
        assert_eq!(info.handlers[0].handler_type, "Network");
        assert!(info.handlers[0].registered);
        assert!(!info.handlers[1].registered);
        assert_eq!(
            info.handlers[0].settings.as_ref().unwrap()["addr"],
            "127.0.0.1:9999"
        );
    }

    #[test]
    fn test_tree_prefix() {
        assert_eq!(tree_prefix(0, 2), "├─");
        assert_eq!(tree_prefix(1, 2), "└─");
    }
}
