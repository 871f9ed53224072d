//! Configuration parsing
//!
//! TOML is the primary format; JSON is accepted as well.

use contracts::{AgentConfig, ContractError};

/// Configuration file format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML (recommended)
    Toml,
    Json,
}

impl ConfigFormat {
    /// Infer the format from a file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

pub fn parse_toml(content: &str) -> Result<AgentConfig, ContractError> {
    toml::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("TOML parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

pub fn parse_json(content: &str) -> Result<AgentConfig, ContractError> {
    serde_json::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("JSON parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// Parse `content` in the given format
pub fn parse(content: &str, format: ConfigFormat) -> Result<AgentConfig, ContractError> {
    match format {
        ConfigFormat::Toml => parse_toml(content),
        ConfigFormat::Json => parse_json(content),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_toml_minimal() {
        let content = r#"
prefix = "svc."
collectors = ["cpu", "memory"]

[default_dimensions]
region = "eu"

[collector_settings.cpu]
max_buffer_size = 10

[[handlers]]
name = "Log"

[[handlers]]
name = "Network secondary"
[handlers.settings]
addr = "127.0.0.1:9999"
interval = "5"
collector_blacklist = ["memory"]
"#;
        let result = parse_toml(content);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        let config = result.unwrap();
        assert_eq!(config.prefix, "svc.");
        assert_eq!(config.collectors.len(), 2);
        assert_eq!(config.default_dimensions["region"], "eu");
        assert_eq!(config.handlers.len(), 2);
        assert!(config.handlers[0].settings.is_empty());

        let network = &config.handlers[1];
        assert_eq!(network.handler_type(), "Network");
        assert_eq!(network.settings.int("interval").unwrap(), Some(5));
        assert_eq!(
            network.settings.string_list("collector_blacklist").unwrap(),
            Some(vec!["memory".to_string()])
        );
        assert_eq!(
            config.collector_settings["cpu"].int("max_buffer_size").unwrap(),
            Some(10)
        );
    }

    #[test]
    fn test_parse_json_minimal() {
        let content = r#"{
            "collectors": ["cpu"],
            "internal_metrics_interval_secs": 30,
            "handlers": [
                { "name": "Log", "settings": { "max_buffer_size": "20" } }
            ]
        }"#;
        let result = parse_json(content);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        let config = result.unwrap();
        assert_eq!(config.internal_metrics_interval_secs, Some(30));
        assert!(config.prefix.is_empty());
    }

    #[test]
    fn test_parse_toml_syntax_error() {
        let result = parse_toml("invalid toml [[[");
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ContractError::ConfigParse { .. }));
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(
            ConfigFormat::from_extension("toml"),
            Some(ConfigFormat::Toml)
        );
        assert_eq!(
            ConfigFormat::from_extension("TOML"),
            Some(ConfigFormat::Toml)
        );
        assert_eq!(
            ConfigFormat::from_extension("json"),
            Some(ConfigFormat::Json)
        );
        assert_eq!(ConfigFormat::from_extension("yaml"), None);
    }
}
