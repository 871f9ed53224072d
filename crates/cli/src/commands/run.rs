//! `run` command implementation.

use anyhow::{Context, Result};
use std::time::Duration;
use tracing::{info, warn};

use crate::agent::Agent;
use crate::cli::RunArgs;
use crate::error::CliError;

/// Execute the `run` command
pub async fn run_agent(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    if !args.config.exists() {
        return Err(CliError::config_not_found(args.config.display().to_string()).into());
    }

    let config = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    info!(
        prefix = %config.prefix,
        collectors = config.collectors.len(),
        handlers = config.handlers.len(),
        "Configuration loaded"
    );

    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&config);
        return Ok(());
    }

    if args.metrics_port != 0 {
        observability::init_metrics_only(args.metrics_port)?;
        info!("Metrics endpoint available on port {}", args.metrics_port);
    }

    let registry = handler::HandlerRegistry::with_builtin();
    let mut agent = Agent::build(&registry, config).context("Failed to build handlers")?;

    if let Some(secs) = args.internal_metrics_interval {
        info!(secs, "Overriding internal metrics interval from CLI");
        agent = agent.with_internal_metrics_interval(Some(Duration::from_secs(secs)));
    }

    info!(
        handlers = ?agent.handlers().iter().map(|h| h.name()).collect::<Vec<_>>(),
        collectors = ?agent.config().collectors,
        "Starting agent..."
    );

    let timeout = (args.timeout > 0).then(|| Duration::from_secs(args.timeout));
    let stats = agent.run(shutdown_signal(timeout)).await;

    info!(
        emissions = stats.total_emissions(),
        metrics_sent = stats.total_sent(),
        metrics_dropped = stats.total_dropped(),
        duration_secs = stats.duration.as_secs_f64(),
        "Agent stopped"
    );
    stats.print_summary();

    Ok(())
}

/// Resolve on Ctrl+C, SIGTERM or after `timeout`
async fn shutdown_signal(timeout: Option<Duration>) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let deadline = async {
        match timeout {
            Some(timeout) => tokio::time::sleep(timeout).await,
            None => std::future::pending::<()>().await,
        }
    };

    tokio::select! {
        _ = ctrl_c => warn!("Received Ctrl+C"),
        _ = terminate => warn!("Received SIGTERM"),
        _ = deadline => info!("Run timeout reached"),
    }
}

/// Print configuration summary for dry-run mode
fn print_config_summary(config: &contracts::AgentConfig) {
    println!("\n=== Configuration Summary ===\n");
    if !config.prefix.is_empty() {
        println!("Prefix: {}", config.prefix);
    }
    println!("Collectors ({}): {}", config.collectors.len(), config.collectors.join(", "));

    println!("\nHandlers ({}):", config.handlers.len());
    for handler in &config.handlers {
        println!(
            "  - {} (type {}, {} settings)",
            handler.name,
            handler.handler_type(),
            handler.settings.len()
        );
    }

    if let Some(secs) = config.internal_metrics_interval_secs {
        println!("\nInternal metrics every {secs}s");
    }
    println!();
}
