//! Run orchestration: one graph, or one graph per tenant directory.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use graphload_core::GraphTarget;
use graphload_graph::GraphStore;
use serde::Serialize;

use crate::error::Result;
use crate::pipeline::{load_graph, LoadOptions, LoadReport};
use crate::source::discover_tenants;

pub const DEFAULT_TENANT_PREFIX: &str = "tenant_";

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub source_root: PathBuf,
    pub load: LoadOptions,
    pub multi_graph: bool,
    pub tenant_prefix: String,
}

/// A tenant whose pipeline failed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TenantFailure {
    pub tenant: String,
    pub target: String,
    pub error: String,
}

/// Result of a whole run across all targets.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub loads: Vec<LoadReport>,
    pub failed_tenants: Vec<TenantFailure>,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: i64,
}

impl RunSummary {
    fn new() -> Self {
        Self {
            loads: Vec::new(),
            failed_tenants: Vec::new(),
            started_at: Utc::now(),
            elapsed_ms: 0,
        }
    }

    /// Every target that was loaded, in load order.
    pub fn targets(&self) -> Vec<&str> {
        self.loads.iter().map(|l| l.target.as_str()).collect()
    }

    pub fn nodes_loaded(&self) -> usize {
        self.loads.iter().map(LoadReport::nodes_loaded).sum()
    }

    pub fn edges_loaded(&self) -> usize {
        self.loads.iter().map(LoadReport::edges_loaded).sum()
    }

    pub fn rows_failed(&self) -> usize {
        self.loads.iter().map(LoadReport::rows_failed).sum()
    }

    pub fn log(&self) {
        for load in &self.loads {
            tracing::info!(
                graph = %load.target,
                nodes = load.nodes_loaded(),
                edges = load.edges_loaded(),
                failed = load.rows_failed(),
                skipped = load.rows_skipped(),
                unreadable_files = load.unreadable.len(),
                schema_failed = load.schema.failed,
                elapsed_ms = load.elapsed_ms,
                "Graph summary"
            );
        }
        for failure in &self.failed_tenants {
            tracing::error!(tenant = %failure.tenant, graph = %failure.target, error = %failure.error, "Tenant failed");
        }
        tracing::info!(
            graphs = self.loads.len(),
            failed_tenants = self.failed_tenants.len(),
            nodes = self.nodes_loaded(),
            edges = self.edges_loaded(),
            failed = self.rows_failed(),
            elapsed_ms = self.elapsed_ms,
            "Load complete"
        );
    }
}

/// Load the source root into `base`, or into one `<base>_<tenant>` graph per
/// tenant directory when multi-graph mode is on and tenants exist.
///
/// In single-graph mode an error is returned as-is. In multi-graph mode each
/// tenant's error is recorded in the summary and the next tenant proceeds.
pub async fn run<S: GraphStore + ?Sized>(
    store: &S,
    base: &GraphTarget,
    opts: &RunOptions,
) -> Result<RunSummary> {
    let mut summary = RunSummary::new();

    let tenants = if opts.multi_graph {
        discover_tenants(&opts.source_root, base, &opts.tenant_prefix)?
    } else {
        Vec::new()
    };

    if tenants.is_empty() {
        if opts.multi_graph {
            tracing::warn!(
                root = %opts.source_root.display(),
                prefix = %opts.tenant_prefix,
                "No tenant directories found, loading as a single graph"
            );
        }
        summary
            .loads
            .push(load_graph(store, base, &opts.source_root, opts.load).await?);
    } else {
        tracing::info!(tenants = tenants.len(), base = %base, "Multi-graph load");
        for tenant in &tenants {
            tracing::info!(tenant = %tenant.name, graph = %tenant.target, "Loading tenant");
            match load_graph(store, &tenant.target, &tenant.source_dir, opts.load).await {
                Ok(report) => summary.loads.push(report),
                Err(e) => {
                    tracing::error!(tenant = %tenant.name, graph = %tenant.target, error = %e, "Tenant load failed, continuing");
                    summary.failed_tenants.push(TenantFailure {
                        tenant: tenant.name.clone(),
                        target: tenant.target.name().to_string(),
                        error: e.to_string(),
                    });
                }
            }
        }
    }

    summary.elapsed_ms = (Utc::now() - summary.started_at).num_milliseconds();
    Ok(summary)
}
