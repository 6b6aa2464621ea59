//! CLI entry point for the foothold attack-path analyzer.
//!
//! Designed for subprocess invocation from an API layer: `analyze` reads a
//! JSON request from stdin and writes a JSON result to stdout. Logs go to
//! stderr so stdout stays machine-readable.

use std::path::PathBuf;

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use serde::Deserialize;
use tracing_subscriber::{fmt, EnvFilter};

use foothold_analyze::{AnalysisEngine, AnalyzeRequest, AnalyzeResponse, GraphExport, GraphStats};
use foothold_core::{EdgeRegistry, ProgressEvent, ProgressSink};
use foothold_store::{register_builtin, Snapshot};

#[derive(Parser)]
#[command(name = "foothold")]
#[command(about = "Attack-path analysis engine for directory-service object graphs")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Snapshot file override.
    #[arg(long, global = true)]
    snapshot: Option<PathBuf>,

    /// Config file prefix (default: foothold).
    #[arg(short, long, default_value = "foothold", global = true)]
    config: String,
}

#[derive(Subcommand)]
enum Command {
    /// Run an analysis (reads a JSON request from stdin).
    Analyze,
    /// Print snapshot statistics.
    Stats,
}

/// Settings loadable from `foothold.toml` or `FOOTHOLD_` environment
/// variables; CLI flags win.
#[derive(Debug, Default, Deserialize)]
struct Settings {
    snapshot: Option<PathBuf>,
}

/// Forwards engine progress to the log stream.
struct TraceProgress;

impl ProgressSink for TraceProgress {
    fn event(&self, event: ProgressEvent<'_>) {
        if let ProgressEvent::Begin { task, total } = event {
            tracing::debug!(task, total, "Phase started");
        }
    }
}

fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = load_settings(&cli.config);

    let snapshot_path = cli
        .snapshot
        .or(settings.snapshot)
        .context("no snapshot given (use --snapshot or set it in foothold.toml)")?;

    let mut registry = EdgeRegistry::new();
    register_builtin(&mut registry)?;
    let store = Snapshot::from_file(&snapshot_path)
        .and_then(|s| s.into_store(&mut registry))
        .with_context(|| format!("loading snapshot {}", snapshot_path.display()))?;
    tracing::info!(
        objects = store.len(),
        edges = store.edge_count(),
        "Snapshot ready"
    );

    match cli.command {
        Command::Analyze => {
            let input = std::io::read_to_string(std::io::stdin())?;
            let request: AnalyzeRequest = serde_json::from_str(&input)?;

            let started = std::time::Instant::now();
            let opts = request.to_options(&registry)?;
            let results = AnalysisEngine::new(&store, &registry)
                .with_progress(&TraceProgress)
                .analyze(&opts);

            let graph = GraphExport::from_graph(&results.graph, &store, &registry, request.all_details);
            let stats = GraphStats {
                total_nodes: results.graph.order(),
                total_edges: results.graph.size(),
                target_count: count_marked(&graph, "target"),
                source_count: count_marked(&graph, "source"),
            };
            let response = AnalyzeResponse {
                graph,
                stats,
                removed: results.removed,
                computed_at: Utc::now(),
                duration_ms: started.elapsed().as_millis() as u64,
            };
            println!("{}", serde_json::to_string(&response)?);
        }
        Command::Stats => {
            println!(
                "{}",
                serde_json::to_string(&serde_json::json!({
                    "objects": store.len(),
                    "edges": store.edge_count(),
                    "edge_kinds": registry.len(),
                }))?
            );
        }
    }

    Ok(())
}

fn count_marked(graph: &GraphExport, key: &str) -> usize {
    graph
        .nodes
        .iter()
        .filter(|n| n.data.get(key).is_some_and(|v| v == &serde_json::Value::from(true)))
        .count()
}

fn load_settings(file_prefix: &str) -> Settings {
    config::Config::builder()
        .add_source(config::File::with_name(file_prefix).required(false))
        .add_source(
            config::Environment::with_prefix("FOOTHOLD")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .and_then(|c| c.try_deserialize())
        .unwrap_or_default()
}
