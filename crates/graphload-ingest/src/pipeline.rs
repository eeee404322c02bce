//! Single-graph load: schema, then every node file, then every edge file.

use std::path::Path;

use chrono::{DateTime, Utc};
use graphload_core::{GraphTarget, Row};
use graphload_graph::{GraphStore, Statement};
use serde::Serialize;

use crate::error::Result;
use crate::execute::{execute_batch, FileReport};
use crate::schema::{provision_schema, SchemaReport};
use crate::source::{read_constraint_specs, read_index_specs, read_rows, SourceFile, SourceLayout};
use crate::translate::{
    edge_from_row, node_from_row, translate, EdgeTemplate, NodeTemplate, WriteMode,
    WriteTemplate, DEFAULT_BATCH_SIZE,
};

/// Knobs for one load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadOptions {
    pub batch_size: usize,
    pub mode: WriteMode,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            mode: WriteMode::Create,
        }
    }
}

/// A file that could not be read.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileFailure {
    pub name: String,
    pub error: String,
}

/// Everything that happened while loading one target.
#[derive(Debug, Clone, Serialize)]
pub struct LoadReport {
    pub target: String,
    pub schema: SchemaReport,
    pub nodes: Vec<FileReport>,
    pub edges: Vec<FileReport>,
    pub unreadable: Vec<FileFailure>,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: i64,
}

impl LoadReport {
    pub fn nodes_loaded(&self) -> usize {
        self.nodes.iter().map(|f| f.loaded).sum()
    }

    pub fn edges_loaded(&self) -> usize {
        self.edges.iter().map(|f| f.loaded).sum()
    }

    pub fn rows_failed(&self) -> usize {
        self.nodes.iter().chain(&self.edges).map(|f| f.failed).sum()
    }

    pub fn rows_skipped(&self) -> usize {
        self.nodes.iter().chain(&self.edges).map(|f| f.skipped).sum()
    }
}

fn elapsed_ms(since: DateTime<Utc>) -> i64 {
    (Utc::now() - since).num_milliseconds()
}

/// Load one node file into `target`.
pub async fn load_node_file<S: GraphStore + ?Sized>(
    store: &S,
    target: &GraphTarget,
    file: &SourceFile,
    opts: LoadOptions,
) -> Result<FileReport> {
    let rows = read_rows(&file.path)?;
    let label = file.name.as_str();
    let batches = translate(&rows, opts.batch_size, |row| node_from_row(label, row));
    let template = NodeTemplate::new(label, opts.mode);
    load_batches(store, target, file, &rows, batches, &template).await
}

/// Load one edge file into `target`.
pub async fn load_edge_file<S: GraphStore + ?Sized>(
    store: &S,
    target: &GraphTarget,
    file: &SourceFile,
    opts: LoadOptions,
) -> Result<FileReport> {
    let rows = read_rows(&file.path)?;
    let rel_type = file.name.as_str();
    let batches = translate(&rows, opts.batch_size, |row| edge_from_row(rel_type, row));
    let template = EdgeTemplate::new(rel_type, opts.mode);
    load_batches(store, target, file, &rows, batches, &template).await
}

async fn load_batches<S, W>(
    store: &S,
    target: &GraphTarget,
    file: &SourceFile,
    rows: &[Row],
    batches: Vec<crate::translate::Batch<W::Spec>>,
    template: &W,
) -> Result<FileReport>
where
    S: GraphStore + ?Sized,
    W: WriteTemplate,
    W::Spec: std::fmt::Debug,
{
    let started = Utc::now();
    let mut report = FileReport::new(&file.name);

    if let Some(first) = rows.first() {
        tracing::debug!(file = %file.path.display(), headers = ?first.field_names(), "CSV headers");
    }
    let total_batches = batches.len();
    for spec in batches.iter().flat_map(|b| &b.specs).take(3) {
        tracing::debug!(file = %file.name, record = ?spec, "Sample record");
    }

    for batch in batches {
        let batch_started = Utc::now();
        let rows_in_batch = batch.specs.len() + batch.skipped;
        if batch.skipped > 0 {
            tracing::debug!(file = %file.name, batch = batch.index + 1, skipped = batch.skipped, "Dropped malformed rows");
        }
        let outcome = execute_batch(store, target, template, &batch.specs).await;
        report.add_batch(rows_in_batch, batch.skipped, outcome);
        tracing::info!(
            graph = %target,
            file = %file.name,
            batch = batch.index + 1,
            of = total_batches,
            loaded = outcome.loaded,
            failed = outcome.failed,
            elapsed_ms = elapsed_ms(batch_started),
            "Batch written"
        );
    }

    report.elapsed_ms = elapsed_ms(started);
    tracing::info!(
        graph = %target,
        file = %file.name,
        rows = report.rows,
        loaded = report.loaded,
        failed = report.failed,
        skipped = report.skipped,
        elapsed_ms = report.elapsed_ms,
        "File loaded"
    );
    Ok(report)
}

/// Load one source directory into one target.
///
/// Fails only when the target cannot be reached or the directory cannot be
/// listed. Unreadable files and failed rows are recorded in the report.
pub async fn load_graph<S: GraphStore + ?Sized>(
    store: &S,
    target: &GraphTarget,
    dir: &Path,
    opts: LoadOptions,
) -> Result<LoadReport> {
    let started_at = Utc::now();
    store.execute(target, &Statement::new("RETURN 1")).await?;

    let layout = SourceLayout::scan(dir)?;
    tracing::info!(
        graph = %target,
        dir = %dir.display(),
        node_files = layout.node_files.len(),
        edge_files = layout.edge_files.len(),
        mode = ?opts.mode,
        batch_size = opts.batch_size,
        "Loading graph"
    );

    let indexes = read_index_specs(dir).unwrap_or_else(|e| {
        tracing::warn!(graph = %target, error = %e, "Could not read index descriptor");
        None
    });
    let constraints = read_constraint_specs(dir).unwrap_or_else(|e| {
        tracing::warn!(graph = %target, error = %e, "Could not read constraint descriptor");
        None
    });
    let schema = provision_schema(
        store,
        target,
        &layout.node_labels(),
        indexes.as_deref(),
        constraints.as_deref(),
    )
    .await;

    let mut report = LoadReport {
        target: target.name().to_string(),
        schema,
        nodes: Vec::new(),
        edges: Vec::new(),
        unreadable: Vec::new(),
        started_at,
        elapsed_ms: 0,
    };

    let phase = Utc::now();
    for file in &layout.node_files {
        match load_node_file(store, target, file, opts).await {
            Ok(r) => report.nodes.push(r),
            Err(e) => report.unreadable.push(unreadable(target, file, e)),
        }
    }
    tracing::info!(graph = %target, loaded = report.nodes_loaded(), elapsed_ms = elapsed_ms(phase), "Nodes loaded");

    let phase = Utc::now();
    for file in &layout.edge_files {
        match load_edge_file(store, target, file, opts).await {
            Ok(r) => report.edges.push(r),
            Err(e) => report.unreadable.push(unreadable(target, file, e)),
        }
    }
    tracing::info!(graph = %target, loaded = report.edges_loaded(), elapsed_ms = elapsed_ms(phase), "Edges loaded");

    report.elapsed_ms = elapsed_ms(started_at);
    Ok(report)
}

fn unreadable(target: &GraphTarget, file: &SourceFile, e: crate::error::IngestError) -> FileFailure {
    tracing::error!(graph = %target, file = %file.path.display(), error = %e, "Skipping unreadable file");
    FileFailure {
        name: file.name.clone(),
        error: e.to_string(),
    }
}
