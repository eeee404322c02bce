//! CLI entry point for the graphload CSV loader.

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use graphload_core::GraphTarget;
use graphload_graph::queries::{graph_stats, sample_nodes};
use graphload_graph::GraphClient;

use graphload_ingest::config::{load_settings, Settings};
use graphload_ingest::{run, LoadOptions, RunOptions, RunSummary};

#[derive(Parser)]
#[command(name = "graphload")]
#[command(about = "Load exported node/edge CSV files into a Neo4j graph")]
struct Cli {
    /// Target graph (database) name; the base name in multi-graph mode.
    graph_name: String,

    /// Bolt URI (overrides --host/--port).
    #[arg(long)]
    uri: Option<String>,

    #[arg(long)]
    host: Option<String>,

    #[arg(long)]
    port: Option<u16>,

    #[arg(long)]
    user: Option<String>,

    #[arg(long)]
    password: Option<String>,

    /// Directory containing the CSV files.
    #[arg(long)]
    csv_dir: Option<PathBuf>,

    /// Rows per bulk write.
    #[arg(long)]
    batch_size: Option<usize>,

    /// Upsert nodes and edges instead of always creating them.
    #[arg(long)]
    merge_mode: bool,

    /// Load each tenant_* subdirectory into its own graph.
    #[arg(long)]
    multi_graph: bool,

    /// Log per-label and per-type counts after loading.
    #[arg(long)]
    stats: bool,

    /// Label of the sample nodes logged with --stats.
    #[arg(long, default_value = "Person")]
    sample_label: String,

    #[arg(long, default_value_t = 3)]
    sample_limit: i64,

    /// Write the run summary as JSON to this file.
    #[arg(long)]
    report: Option<PathBuf>,

    /// Config file prefix (default: graphload).
    #[arg(short, long, default_value = "graphload")]
    config: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).json().init();

    let cli = Cli::parse();
    let settings = apply_overrides(load_settings(&cli.config)?, &cli);
    settings.load.validate()?;

    let base = GraphTarget::new(cli.graph_name.as_str())?;
    let opts = RunOptions {
        source_root: PathBuf::from(&settings.load.csv_dir),
        load: LoadOptions {
            batch_size: settings.load.batch_size,
            mode: settings.load.write_mode(),
        },
        multi_graph: settings.load.multi_graph,
        tenant_prefix: settings.load.tenant_prefix.clone(),
    };

    let graph = GraphClient::connect(&settings.neo4j).await?;

    let result = tokio::select! {
        result = run(&graph, &base, &opts) => result,
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!("Interrupted, stopping load");
            return Ok(());
        }
    };
    let summary = match result {
        Ok(summary) => summary,
        Err(e) if e.is_fatal() => return Err(e.into()),
        Err(e) => {
            tracing::error!(graph = %base, error = %e, "Load failed");
            return Ok(());
        }
    };
    summary.log();

    if let Some(path) = &cli.report {
        std::fs::write(path, serde_json::to_string_pretty(&summary)?)?;
        tracing::info!(path = %path.display(), "Run summary written");
    }

    if cli.stats {
        log_stats(&graph, &summary, &cli).await;
    }

    Ok(())
}

fn apply_overrides(mut settings: Settings, cli: &Cli) -> Settings {
    if let Some(uri) = &cli.uri {
        settings.neo4j.uri = uri.clone();
    } else if cli.host.is_some() || cli.port.is_some() {
        let host = cli.host.as_deref().unwrap_or("localhost");
        let port = cli.port.unwrap_or(7687);
        settings.neo4j.uri = format!("bolt://{host}:{port}");
    }
    if let Some(user) = &cli.user {
        settings.neo4j.user = user.clone();
    }
    if let Some(password) = &cli.password {
        settings.neo4j.password = password.clone();
    }
    if let Some(dir) = &cli.csv_dir {
        settings.load.csv_dir = dir.display().to_string();
    }
    if let Some(batch_size) = cli.batch_size {
        settings.load.batch_size = batch_size;
    }
    settings.load.merge_mode |= cli.merge_mode;
    settings.load.multi_graph |= cli.multi_graph;
    settings
}

async fn log_stats(graph: &GraphClient, summary: &RunSummary, cli: &Cli) {
    for name in summary.targets() {
        let Ok(target) = GraphTarget::new(name) else {
            continue;
        };
        match graph_stats(graph, &target).await {
            Ok(stats) => {
                for count in &stats.nodes {
                    tracing::info!(graph = %target, labels = ?count.labels, count = count.count, "Nodes");
                }
                for count in &stats.relationships {
                    tracing::info!(graph = %target, rel_type = %count.rel_type, count = count.count, "Relationships");
                }
                tracing::info!(
                    graph = %target,
                    total_nodes = stats.total_nodes(),
                    total_relationships = stats.total_relationships(),
                    "Graph statistics"
                );
            }
            Err(e) => tracing::error!(graph = %target, error = %e, "Failed to read graph statistics"),
        }

        match sample_nodes(graph, &target, &cli.sample_label, cli.sample_limit).await {
            Ok(samples) => {
                for sample in samples {
                    tracing::info!(graph = %target, labels = ?sample.labels, properties = %sample.properties, "Sample node");
                }
            }
            Err(e) => tracing::warn!(graph = %target, label = %cli.sample_label, error = %e, "Failed to sample nodes"),
        }
    }
}
