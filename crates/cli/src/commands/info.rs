//! `info` command implementation.

use anyhow::{Context, Result};
use contracts::{BufferMode, PipelineBlueprint};
use serde::Serialize;
use tracing::info;

use crate::cli::InfoArgs;
use crate::error::CliError;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    input: InputInfo,
    sync_settings: SyncInfo,
    output: OutputInfo,
}

#[derive(Serialize)]
struct InputInfo {
    label_field: String,
}

#[derive(Serialize)]
struct SyncInfo {
    labels: Vec<String>,
    mode: BufferMode,
    merge_only: bool,
    reset: bool,
    all: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    ignored_flags: Vec<&'static str>,
}

#[derive(Serialize)]
struct OutputInfo {
    format: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tuples: Option<u64>,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    if !args.config.exists() {
        return Err(CliError::config_not_found(args.config.display().to_string()).into());
    }

    let blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .map_err(|e| CliError::config(args.config.display().to_string(), e))?;

    if args.json {
        let info = build_config_info(&blueprint);
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&blueprint);
    }

    Ok(())
}

fn build_config_info(blueprint: &PipelineBlueprint) -> ConfigInfo {
    let options = blueprint.sync_options();

    ConfigInfo {
        version: format!("{:?}", blueprint.version),
        input: InputInfo {
            label_field: blueprint.input.label_field.clone(),
        },
        sync_settings: SyncInfo {
            labels: blueprint.sync.labels.iter().map(|l| l.to_string()).collect(),
            mode: options.mode(),
            merge_only: options.merge_only,
            reset: options.reset,
            all: options.all,
            ignored_flags: options.ignored_flags(),
        },
        output: OutputInfo {
            format: format!("{:?}", blueprint.output.format),
            max_tuples: blueprint.max_tuples(),
        },
    }
}

fn print_config_info(blueprint: &PipelineBlueprint) {
    let options = blueprint.sync_options();

    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║               Label Syncer Configuration                     ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    println!("📥 Input");
    println!("   ├─ Version: {:?}", blueprint.version);
    println!("   └─ Label field: {}", blueprint.input.label_field);

    // Labels
    println!("\n🏷  Labels ({})", blueprint.sync.labels.len());
    for (i, label) in blueprint.sync.labels.iter().enumerate() {
        let is_last = i == blueprint.sync.labels.len() - 1;
        let prefix = if is_last { "└─" } else { "├─" };
        println!("   {} {}", prefix, label);
    }

    // Sync Settings
    println!("\n⚙️  Sync Settings");
    match options.mode() {
        BufferMode::UnboundedLatest => println!("   ├─ Mode: latest value per label"),
        BufferMode::BoundedFifo { limit } => {
            println!("   ├─ Mode: FIFO, up to {} values per label", limit)
        }
    }
    println!("   ├─ merge_only: {}", options.merge_only);
    println!("   ├─ reset: {}", options.reset);
    println!("   └─ all: {}", options.all);
    for flag in options.ignored_flags() {
        println!("      ⚠ {} is ignored in FIFO mode", flag);
    }

    // Output
    println!("\n📤 Output");
    println!("   ├─ Format: {:?}", blueprint.output.format);
    match blueprint.max_tuples() {
        Some(max) => println!("   └─ Max tuples: {}", max),
        None => println!("   └─ Max tuples: unlimited"),
    }

    println!();
}
