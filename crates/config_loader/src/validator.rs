//! Configuration validation
//!
//! Rules:
//! - handler names are non-empty and unique
//! - collector names are non-empty and unique
//! - `collector_settings` only refers to declared collectors
//! - `internal_metrics_interval_secs` > 0 when present
//!
//! Individual handler settings are not checked here; a malformed value falls
//! back to its default when the handler is configured.

use std::collections::HashSet;

use contracts::{AgentConfig, ContractError};

/// Validate an `AgentConfig`.
///
/// Returns the first error encountered, or Ok(()).
pub fn validate(config: &AgentConfig) -> Result<(), ContractError> {
    validate_handlers(config)?;
    validate_collectors(config)?;
    validate_collector_settings(config)?;
    validate_internal_metrics_interval(config)?;
    Ok(())
}

fn validate_handlers(config: &AgentConfig) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for (idx, handler) in config.handlers.iter().enumerate() {
        if handler.name.trim().is_empty() {
            return Err(ContractError::config_validation(
                format!("handlers[{idx}].name"),
                "handler name cannot be empty",
            ));
        }
        if !seen.insert(handler.name.as_str()) {
            return Err(ContractError::config_validation(
                format!("handlers[name={}]", handler.name),
                "duplicate handler name",
            ));
        }
    }
    Ok(())
}

fn validate_collectors(config: &AgentConfig) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for (idx, collector) in config.collectors.iter().enumerate() {
        if collector.trim().is_empty() {
            return Err(ContractError::config_validation(
                format!("collectors[{idx}]"),
                "collector name cannot be empty",
            ));
        }
        if !seen.insert(collector.as_str()) {
            return Err(ContractError::config_validation(
                format!("collectors[{collector}]"),
                "duplicate collector name",
            ));
        }
    }
    Ok(())
}

fn validate_collector_settings(config: &AgentConfig) -> Result<(), ContractError> {
    let declared: HashSet<&str> = config.collectors.iter().map(String::as_str).collect();

    let mut names: Vec<&String> = config.collector_settings.keys().collect();
    names.sort();
    for name in names {
        if !declared.contains(name.as_str()) {
            return Err(ContractError::config_validation(
                format!("collector_settings.{name}"),
                format!("collector '{name}' is not declared in collectors"),
            ));
        }
    }
    Ok(())
}

fn validate_internal_metrics_interval(config: &AgentConfig) -> Result<(), ContractError> {
    if config.internal_metrics_interval_secs == Some(0) {
        return Err(ContractError::config_validation(
            "internal_metrics_interval_secs",
            "internal_metrics_interval_secs must be > 0",
        ));
    }
    Ok(())
}
