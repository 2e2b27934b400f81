//! `run` command implementation.

use std::io::BufWriter;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::cli::RunArgs;
use crate::error::CliError;
use crate::pipeline::{InputSource, Pipeline, PipelineConfig};

/// Execute the `run` command
pub async fn run_pipeline(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    // Validate config path
    if !args.config.exists() {
        return Err(CliError::config_not_found(args.config.display().to_string()).into());
    }

    // Load and parse configuration
    let mut blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .map_err(|e| CliError::config(args.config.display().to_string(), e))?;

    // Apply CLI overrides
    if let Some(back_pressure) = args.back_pressure {
        info!(back_pressure, "Overriding back pressure from CLI");
        blueprint.sync.options.back_pressure = back_pressure;
    }
    if let Some(max_tuples) = args.max_tuples {
        info!(max_tuples, "Overriding max tuples from CLI");
        blueprint.output.max_tuples = max_tuples;
    }

    info!(
        label_field = %blueprint.input.label_field,
        labels = ?blueprint.sync.labels,
        options = ?blueprint.sync.options,
        "Configuration loaded"
    );

    // Dry run - just validate and exit
    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&blueprint);
        return Ok(());
    }

    // Initialize Metrics (optional)
    if args.metrics_port != 0 {
        observability::init_metrics_only(args.metrics_port)
            .context("Failed to start metrics endpoint")?;
    }

    let pipeline = Pipeline::new(PipelineConfig {
        blueprint,
        input: InputSource::parse(&args.input),
        buffer_size: args.buffer_size,
    });

    let stdout = BufWriter::new(std::io::stdout());
    let stats = pipeline
        .run(stdout, shutdown_signal())
        .await
        .context("Pipeline execution failed")?;

    info!(
        tuples = stats.tuples_written,
        records = stats.records,
        duration_secs = stats.duration.as_secs_f64(),
        records_per_sec = format!("{:.2}", stats.records_per_sec()),
        "Pipeline completed successfully"
    );
    stats.print_summary();

    if stats.interrupted {
        warn!("Input was not fully consumed");
    }

    info!("Label Syncer finished");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
///
/// If a handler cannot be installed, that signal is simply never observed.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
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

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Print configuration summary for dry-run mode
fn print_config_summary(blueprint: &contracts::PipelineBlueprint) {
    let options = blueprint.sync_options();
    println!("\n=== Configuration Summary ===\n");
    println!("Input:");
    println!("  Label field: {}", blueprint.input.label_field);
    println!("\nLabels ({}):", blueprint.sync.labels.len());
    for label in &blueprint.sync.labels {
        println!("  - {}", label);
    }

    println!("\nSync Settings:");
    println!("  Mode: {:?}", options.mode());
    println!("  merge_only: {}", options.merge_only);
    println!("  reset: {}", options.reset);
    println!("  all: {}", options.all);
    for flag in options.ignored_flags() {
        println!("  ({} has no effect in this mode)", flag);
    }

    println!("\nOutput:");
    println!("  Format: {:?}", blueprint.output.format);
    match blueprint.max_tuples() {
        Some(max) => println!("  Max tuples: {}", max),
        None => println!("  Max tuples: unlimited"),
    }

    println!();
}
