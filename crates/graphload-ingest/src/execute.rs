//! Batch execution with per-row fallback.

use graphload_core::GraphTarget;
use graphload_graph::GraphStore;
use serde::Serialize;

use crate::translate::WriteTemplate;

/// Result of writing one batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchOutcome {
    pub loaded: usize,
    pub failed: usize,
    /// Whether any group of the batch had to be replayed row by row.
    pub fell_back: bool,
}

impl BatchOutcome {
    fn absorb(&mut self, other: BatchOutcome) {
        self.loaded += other.loaded;
        self.failed += other.failed;
        self.fell_back |= other.fell_back;
    }
}

/// Write a translated batch. Each group is submitted as one bulk statement;
/// a group whose bulk write fails is replayed through the per-row statements
/// so one bad row costs only itself. Store errors never propagate.
pub async fn execute_batch<S, W>(
    store: &S,
    target: &GraphTarget,
    template: &W,
    specs: &[W::Spec],
) -> BatchOutcome
where
    S: GraphStore + ?Sized,
    W: WriteTemplate,
{
    let mut outcome = BatchOutcome::default();
    for group in template.groups(specs) {
        outcome.absorb(execute_group(store, target, template, group).await);
    }
    outcome
}

async fn execute_group<S, W>(
    store: &S,
    target: &GraphTarget,
    template: &W,
    group: &[W::Spec],
) -> BatchOutcome
where
    S: GraphStore + ?Sized,
    W: WriteTemplate,
{
    let bulk = template.bulk(group);
    let error = match store.execute(target, &bulk).await {
        Ok(_) => {
            return BatchOutcome {
                loaded: group.len(),
                ..Default::default()
            }
        }
        Err(e) => e,
    };

    tracing::warn!(
        graph = %target,
        rows = group.len(),
        error = %error,
        "Bulk write failed, falling back to row-by-row"
    );

    let mut outcome = BatchOutcome {
        fell_back: true,
        ..Default::default()
    };
    for spec in group {
        match store.execute(target, &template.single(spec)).await {
            Ok(_) => outcome.loaded += 1,
            Err(e) => {
                tracing::warn!(
                    graph = %target,
                    row = %template.describe(spec),
                    error = %e,
                    "Row write failed"
                );
                outcome.failed += 1;
            }
        }
    }
    outcome
}

/// Totals for one source file.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FileReport {
    /// Node label or relationship type.
    pub name: String,
    pub rows: usize,
    pub loaded: usize,
    pub failed: usize,
    /// Malformed rows dropped before writing.
    pub skipped: usize,
    pub batches: usize,
    pub fallback_batches: usize,
    pub elapsed_ms: i64,
}

impl FileReport {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn add_batch(&mut self, rows: usize, skipped: usize, outcome: BatchOutcome) {
        self.rows += rows;
        self.skipped += skipped;
        self.loaded += outcome.loaded;
        self.failed += outcome.failed;
        self.batches += 1;
        if outcome.fell_back {
            self.fallback_batches += 1;
        }
    }
}
