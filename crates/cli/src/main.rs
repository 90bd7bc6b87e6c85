use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use metrics::counter;
use serde_json::Value as Json;
use tracing::info;

use drifter_core::{diff_maps, flatten, normalize, DiffKind, DiffSummary};

#[derive(Parser, Debug)]
#[command(name = "drifterctl", version, about = "Task-definition drift inspector")]
struct Cli {
    /// Output format
    #[arg(short = 'o', long = "output", value_enum, global = true, default_value_t = Output::Human)]
    output: Output,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum Output {
    Human,
    Json,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Diff two task-definition files (current vs. target)
    Diff {
        /// Task definition currently running (JSON or YAML)
        current: PathBuf,
        /// Task definition declared as source of truth (JSON or YAML)
        target: PathBuf,
        /// Compare as-is, without stripping AWS registration fields
        #[arg(long = "raw", action = ArgAction::SetTrue)]
        raw: bool,
    },
    /// Print the flattened path/value view of one task definition
    Flatten {
        /// Task definition file (JSON or YAML)
        file: PathBuf,
        /// Flatten as-is, without stripping AWS registration fields
        #[arg(long = "raw", action = ArgAction::SetTrue)]
        raw: bool,
    },
}

fn init_tracing() {
    let env = std::env::var("DRIFTER_LOG").unwrap_or_else(|_| "info".to_string());
    let filter = tracing_subscriber::EnvFilter::from_str(&env)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}

fn init_metrics() {
    if let Ok(addr) = std::env::var("DRIFTER_METRICS_ADDR") {
        if let Ok(sock) = addr.parse::<std::net::SocketAddr>() {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            match builder.with_http_listener(sock).install() {
                Ok(_) => tracing::info!(addr = %addr, "Prometheus metrics exporter listening"),
                Err(e) => tracing::warn!(error = %e, "failed to install metrics exporter"),
            }
        } else {
            tracing::warn!(addr = %addr, "invalid DRIFTER_METRICS_ADDR; expected host:port");
        }
    }
}

/// Read a task definition from disk; JSON first, YAML as fallback.
fn load_taskdef(path: &Path) -> Result<Json> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    if let Ok(v) = serde_json::from_str::<Json>(&text) {
        return Ok(v);
    }
    let yaml: serde_yaml::Value = serde_yaml::from_str(&text)
        .with_context(|| format!("parsing {} as JSON or YAML", path.display()))?;
    serde_json::to_value(yaml).context("converting YAML to JSON")
}

fn prepared(path: &Path, raw: bool) -> Result<drifter_core::FlatMap> {
    let td = load_taskdef(path)?;
    let td = if raw { td } else { normalize(&td) };
    Ok(flatten(&td))
}

fn main() -> Result<()> {
    init_tracing();
    init_metrics();
    let cli = Cli::parse();

    match cli.command {
        Commands::Diff { current, target, raw } => {
            counter!("drifterctl_diff_runs", 1u64);
            let current_map = prepared(&current, raw)?;
            let target_map = prepared(&target, raw)?;
            let diffs = diff_maps(&current_map, &target_map);
            let summary = DiffSummary::of(&diffs);
            info!(
                entries = diffs.len(),
                added = summary.added,
                removed = summary.removed,
                modified = summary.modified,
                "diff computed"
            );
            match cli.output {
                Output::Human => {
                    for d in &diffs {
                        match d.kind {
                            DiffKind::Added => {
                                println!("+ {}: {}", d.path, d.target.as_deref().unwrap_or(""))
                            }
                            DiffKind::Removed => {
                                println!("- {}: {}", d.path, d.current.as_deref().unwrap_or(""))
                            }
                            DiffKind::Modified => println!(
                                "~ {}: {} -> {}",
                                d.path,
                                d.current.as_deref().unwrap_or(""),
                                d.target.as_deref().unwrap_or("")
                            ),
                        }
                    }
                    if diffs.is_empty() {
                        println!("in sync");
                    } else {
                        println!(
                            "{} added • {} removed • {} modified",
                            summary.added, summary.removed, summary.modified
                        );
                    }
                }
                Output::Json => println!("{}", serde_json::to_string_pretty(&diffs)?),
            }
            // Non-zero exit when drift exists, diff(1)-style, so CI can gate on it.
            if !diffs.is_empty() {
                std::process::exit(1);
            }
        }
        Commands::Flatten { file, raw } => {
            let flat = prepared(&file, raw)?;
            match cli.output {
                Output::Human => {
                    for (path, value) in &flat {
                        println!("{path} = {value}");
                    }
                }
                Output::Json => println!("{}", serde_json::to_string_pretty(&flat)?),
            }
        }
    }
    Ok(())
}
