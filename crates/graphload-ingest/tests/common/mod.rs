//! In-memory `GraphStore` that records every call.

#![allow(dead_code)]

use std::collections::HashSet;
use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use graphload_core::{EntityType, GraphTarget};
use graphload_graph::store::unique_constraint_cypher;
use graphload_graph::{GraphError, GraphStore, ParamValue, ResultSet, Statement};
use graphload_ingest::schema::{node_index_cypher, relationship_index_cypher};

type FailRule = Box<dyn Fn(&GraphTarget, &Statement) -> bool + Send + Sync>;

/// One recorded call.
#[derive(Debug, Clone)]
pub struct Call {
    pub target: String,
    pub statement: Statement,
}

/// Records statements in call order. Schema statements issued twice for the
/// same target fail the way Neo4j reports an existing index; statements
/// matching a fail rule fail with a query error.
///
/// With `owning_constraint_indexes`, the store behaves like Neo4j: a uniqueness
/// constraint is refused while a plain index covers the same properties.
#[derive(Default)]
pub struct RecordingStore {
    calls: Mutex<Vec<Call>>,
    schema: Mutex<HashSet<(String, String)>>,
    fail_rules: Vec<FailRule>,
    owns_index: bool,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_when(
        mut self,
        rule: impl Fn(&GraphTarget, &Statement) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.fail_rules.push(Box::new(rule));
        self
    }

    pub fn owning_constraint_indexes(mut self) -> Self {
        self.owns_index = true;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Recorded statements other than `RETURN 1` connectivity checks.
    pub fn statements(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| c.statement.text != "RETURN 1")
            .collect()
    }

    /// Bulk writes, in order.
    pub fn bulk_writes(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| c.statement.text.starts_with("UNWIND"))
            .collect()
    }

    pub fn targets(&self) -> HashSet<String> {
        self.calls().into_iter().map(|c| c.target).collect()
    }

    fn record(&self, target: &GraphTarget, statement: &Statement) -> Result<(), GraphError> {
        self.calls.lock().unwrap().push(Call {
            target: target.name().to_string(),
            statement: statement.clone(),
        });

        if self.fail_rules.iter().any(|rule| rule(target, statement)) {
            return Err(GraphError::Query("Neo.ClientError.Statement.SemanticError".into()));
        }

        let text = &statement.text;
        if text.starts_with("CREATE INDEX") || text.starts_with("CREATE CONSTRAINT") {
            let fresh = self
                .schema
                .lock()
                .unwrap()
                .insert((target.name().to_string(), text.clone()));
            if !fresh {
                return Err(GraphError::Query(
                    "An equivalent index already exists".into(),
                ));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl GraphStore for RecordingStore {
    async fn execute(
        &self,
        target: &GraphTarget,
        statement: &Statement,
    ) -> Result<ResultSet, GraphError> {
        self.record(target, statement)?;
        Ok(ResultSet::empty())
    }

    async fn create_unique_constraint(
        &self,
        target: &GraphTarget,
        entity: EntityType,
        label: &str,
        properties: &[String],
    ) -> Result<(), GraphError> {
        if self.owns_index {
            let props: Vec<&str> = properties.iter().map(String::as_str).collect();
            let plain = match entity {
                EntityType::Node => node_index_cypher(label, &props),
                EntityType::Relationship => relationship_index_cypher(label, &props),
            };
            let blocked = self
                .schema
                .lock()
                .unwrap()
                .contains(&(target.name().to_string(), plain));
            if blocked {
                return Err(GraphError::Query(format!(
                    "There already exists an index (:{label} {{{}}}). A constraint cannot be \
                     created until the index has been dropped.",
                    properties.join(", ")
                )));
            }
        }
        let statement = Statement::new(unique_constraint_cypher(entity, label, properties));
        self.record(target, &statement)
    }

    fn constraints_own_index(&self) -> bool {
        self.owns_index
    }
}

/// The `batch` records of a bulk statement.
pub fn batch_records(statement: &Statement) -> Vec<ParamValue> {
    statement
        .params
        .get("batch")
        .and_then(ParamValue::as_list)
        .map(<[ParamValue]>::to_vec)
        .unwrap_or_default()
}

/// Field of a record produced by the node or edge template.
pub fn field<'a>(record: &'a ParamValue, key: &str) -> Option<&'a ParamValue> {
    record.as_map().and_then(|m| m.get(key))
}

pub fn write(dir: &Path, name: &str, contents: &str) {
    std::fs::write(dir.join(name), contents).unwrap();
}

pub fn target(name: &str) -> GraphTarget {
    GraphTarget::new(name).unwrap()
}
