//! `validate` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    prefix: String,
    collector_count: usize,
    handler_count: usize,
    internal_metrics_interval_secs: Option<u64>,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            error: Some(format!("File not found: {config_path}")),
            config_path,
            warnings: None,
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(config) => {
            let warnings = collect_warnings(&config, &handler::HandlerRegistry::with_builtin());

            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    prefix: config.prefix.clone(),
                    collector_count: config.collectors.len(),
                    handler_count: config.handlers.len(),
                    internal_metrics_interval_secs: config.internal_metrics_interval_secs,
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(
    config: &contracts::AgentConfig,
    registry: &handler::HandlerRegistry,
) -> Vec<String> {
    let mut warnings = Vec::new();

    if config.handlers.is_empty() {
        warnings.push("No handlers configured - the agent has nothing to run".to_string());
    }

    if config.collectors.is_empty() {
        warnings.push("No collectors declared - only default channels will be served".to_string());
    }

    for handler in &config.handlers {
        if !registry.contains(handler.handler_type()) {
            warnings.push(format!(
                "Handler '{}' has unknown type '{}' and will be skipped",
                handler.name,
                handler.handler_type()
            ));
        }
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            if !summary.prefix.is_empty() {
                println!("\n  Prefix: {}", summary.prefix);
            }
            println!("  Collectors: {}", summary.collector_count);
            println!("  Handlers: {}", summary.handler_count);
            if let Some(secs) = summary.internal_metrics_interval_secs {
                println!("  Internal metrics: every {secs}s");
            }
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
