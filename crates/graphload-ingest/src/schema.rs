//! Schema provisioning: id indexes, declared indexes and uniqueness
//! constraints, issued once per target before any data is written.
//!
//! Every step is independent. A statement that fails because the index or
//! constraint already exists counts as present; any other failure is logged
//! and only that statement is skipped.

use graphload_core::normalize::quote_identifier;
use graphload_core::{ConstraintKind, ConstraintSpec, EntityType, GraphTarget, IndexSpec};
use graphload_graph::{GraphError, GraphStore, Statement};
use serde::Serialize;

/// Outcome counts of one provisioning run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SchemaReport {
    pub created: usize,
    pub already_present: usize,
    pub failed: usize,
    /// Descriptor rows not attempted (incomplete, or unsupported kind).
    pub skipped: usize,
}

impl SchemaReport {
    fn record(&mut self, result: Result<(), GraphError>, what: &str) {
        match result {
            Ok(()) => self.created += 1,
            Err(e) if e.is_already_present() => {
                tracing::debug!(schema = %what, error = %e, "Already present");
                self.already_present += 1;
            }
            Err(e) => {
                tracing::warn!(schema = %what, error = %e, "Schema operation failed, skipping");
                self.failed += 1;
            }
        }
    }

    pub fn attempted(&self) -> usize {
        self.created + self.already_present + self.failed
    }
}

/// `CREATE INDEX FOR (n:L) ON (n.a, n.b)`.
pub fn node_index_cypher(label: &str, properties: &[&str]) -> String {
    format!(
        "CREATE INDEX FOR (n:{}) ON ({})",
        quote_identifier(label),
        property_list("n", properties)
    )
}

/// `CREATE INDEX FOR ()-[r:T]-() ON (r.a, r.b)`.
pub fn relationship_index_cypher(rel_type: &str, properties: &[&str]) -> String {
    format!(
        "CREATE INDEX FOR ()-[r:{}]-() ON ({})",
        quote_identifier(rel_type),
        property_list("r", properties)
    )
}

fn property_list(var: &str, properties: &[&str]) -> String {
    properties
        .iter()
        .map(|p| format!("{var}.{}", quote_identifier(p)))
        .collect::<Vec<_>>()
        .join(", ")
}

async fn create_index<S: GraphStore + ?Sized>(
    store: &S,
    target: &GraphTarget,
    report: &mut SchemaReport,
    cypher: String,
) {
    let result = store
        .execute(target, &Statement::new(cypher.as_str()))
        .await
        .map(|_| ());
    report.record(result, &cypher);
}

/// Step 1: an index on `id` for every node label being loaded.
pub async fn create_id_indexes<S: GraphStore + ?Sized>(
    store: &S,
    target: &GraphTarget,
    labels: &[String],
    report: &mut SchemaReport,
) {
    for label in labels {
        create_index(store, target, report, node_index_cypher(label, &["id"])).await;
    }
}

/// Step 2: one index per (label, property) pair of each provisionable
/// `indexes.csv` row.
pub async fn create_declared_indexes<S: GraphStore + ?Sized>(
    store: &S,
    target: &GraphTarget,
    specs: &[IndexSpec],
    report: &mut SchemaReport,
) {
    for spec in specs {
        if !spec.is_provisionable() {
            tracing::debug!(labels = ?spec.labels, kind = %spec.kind, uniqueness = %spec.uniqueness, "Index row not provisioned");
            report.skipped += 1;
            continue;
        }
        for (label, property) in spec.pairs() {
            create_index(store, target, report, node_index_cypher(label, &[property])).await;
        }
    }
}

/// Step 3: a plain index over the same ordered properties of every unique
/// constraint, so the constraint has a backing index. Skipped for stores
/// whose constraints build that index themselves.
pub async fn create_supporting_indexes<S: GraphStore + ?Sized>(
    store: &S,
    target: &GraphTarget,
    specs: &[ConstraintSpec],
    report: &mut SchemaReport,
) {
    if store.constraints_own_index() {
        tracing::debug!(graph = %target, "Constraints own their backing index, no supporting indexes");
        return;
    }
    for spec in specs.iter().filter(|s| s.is_unique() && s.is_complete()) {
        let properties: Vec<&str> = spec.properties.iter().map(String::as_str).collect();
        for label in &spec.labels {
            let cypher = match spec.entity {
                EntityType::Node => node_index_cypher(label, &properties),
                EntityType::Relationship => relationship_index_cypher(label, &properties),
            };
            create_index(store, target, report, cypher).await;
        }
    }
}

/// Step 4: the uniqueness constraints themselves. Other constraint kinds are
/// reported and skipped.
pub async fn create_constraints<S: GraphStore + ?Sized>(
    store: &S,
    target: &GraphTarget,
    specs: &[ConstraintSpec],
    report: &mut SchemaReport,
) {
    for spec in specs {
        if !spec.is_complete() {
            tracing::debug!(labels = ?spec.labels, "Constraint row without labels or properties");
            report.skipped += 1;
            continue;
        }
        if let ConstraintKind::Unsupported(kind) = &spec.kind {
            tracing::warn!(
                labels = ?spec.labels,
                properties = ?spec.properties,
                kind = %kind,
                "Unsupported constraint type, skipping"
            );
            report.skipped += 1;
            continue;
        }
        for label in &spec.labels {
            let result = store
                .create_unique_constraint(target, spec.entity, label, &spec.properties)
                .await;
            let what = format!(
                "UNIQUE {} {}({})",
                spec.entity.as_str(),
                label,
                spec.properties.join(", ")
            );
            report.record(result, &what);
        }
    }
}

/// Run all four steps in order against `target`. Absent descriptors skip
/// their steps.
pub async fn provision_schema<S: GraphStore + ?Sized>(
    store: &S,
    target: &GraphTarget,
    node_labels: &[String],
    indexes: Option<&[IndexSpec]>,
    constraints: Option<&[ConstraintSpec]>,
) -> SchemaReport {
    let mut report = SchemaReport::default();

    create_id_indexes(store, target, node_labels, &mut report).await;

    match indexes {
        Some(specs) => create_declared_indexes(store, target, specs, &mut report).await,
        None => tracing::debug!(graph = %target, "No index descriptor"),
    }

    match constraints {
        Some(specs) => {
            create_supporting_indexes(store, target, specs, &mut report).await;
            create_constraints(store, target, specs, &mut report).await;
        }
        None => tracing::debug!(graph = %target, "No constraint descriptor"),
    }

    tracing::info!(
        graph = %target,
        created = report.created,
        already_present = report.already_present,
        failed = report.failed,
        skipped = report.skipped,
        "Schema provisioned"
    );
    report
}
