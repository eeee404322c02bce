//! Read queries used after a load: per-label and per-type counts and a
//! sample of loaded nodes.

use graphload_core::normalize::quote_identifier;
use graphload_core::GraphTarget;
use serde::{Deserialize, Serialize};

use crate::client::GraphError;
use crate::statement::{ResultSet, Statement};
use crate::store::GraphStore;

/// Node count for one label combination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelCount {
    pub labels: Vec<String>,
    pub count: i64,
}

/// Relationship count for one type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelTypeCount {
    #[serde(rename = "type")]
    pub rel_type: String,
    pub count: i64,
}

/// Counts of everything in one graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphStats {
    pub nodes: Vec<LabelCount>,
    pub relationships: Vec<RelTypeCount>,
}

impl GraphStats {
    pub fn total_nodes(&self) -> i64 {
        self.nodes.iter().map(|c| c.count).sum()
    }

    pub fn total_relationships(&self) -> i64 {
        self.relationships.iter().map(|c| c.count).sum()
    }
}

/// A loaded node as returned by [`sample_nodes`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSample {
    pub labels: Vec<String>,
    pub properties: serde_json::Value,
}

/// Count nodes per label set and relationships per type.
pub async fn graph_stats<S: GraphStore + ?Sized>(
    store: &S,
    target: &GraphTarget,
) -> Result<GraphStats, GraphError> {
    let nodes = store
        .execute(
            target,
            &Statement::new("MATCH (n) RETURN labels(n) AS labels, count(n) AS count")
                .returning(["labels", "count"]),
        )
        .await?;
    let relationships = store
        .execute(
            target,
            &Statement::new("MATCH ()-[r]->() RETURN type(r) AS type, count(r) AS count")
                .returning(["type", "count"]),
        )
        .await?;

    Ok(GraphStats {
        nodes: decode_rows(nodes)?,
        relationships: decode_rows(relationships)?,
    })
}

/// Fetch up to `limit` nodes of `label` with all their properties.
pub async fn sample_nodes<S: GraphStore + ?Sized>(
    store: &S,
    target: &GraphTarget,
    label: &str,
    limit: i64,
) -> Result<Vec<NodeSample>, GraphError> {
    let cypher = format!(
        "MATCH (n:{}) RETURN labels(n) AS labels, properties(n) AS properties LIMIT $limit",
        quote_identifier(label)
    );
    let rows = store
        .execute(
            target,
            &Statement::new(cypher)
                .param("limit", limit)
                .returning(["labels", "properties"]),
        )
        .await?;
    decode_rows(rows)
}

fn decode_rows<T: serde::de::DeserializeOwned>(result: ResultSet) -> Result<Vec<T>, GraphError> {
    result
        .rows
        .into_iter()
        .map(|row| {
            serde_json::from_value(serde_json::Value::Object(row))
                .map_err(|e| GraphError::Serialization(format!("Unexpected result row: {e}")))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use graphload_core::EntityType;
    use serde_json::json;

    /// Answers the two count queries with canned rows.
    struct CannedStore;

    #[async_trait]
    impl GraphStore for CannedStore {
        async fn execute(
            &self,
            _target: &GraphTarget,
            statement: &Statement,
        ) -> Result<ResultSet, GraphError> {
            let row = if statement.text.contains("labels(n)") {
                json!({"labels": ["Person"], "count": 2})
            } else {
                json!({"type": "KNOWS", "count": 1})
            };
            let serde_json::Value::Object(map) = row else {
                unreachable!()
            };
            Ok(ResultSet { rows: vec![map] })
        }

        async fn create_unique_constraint(
            &self,
            _target: &GraphTarget,
            _entity: EntityType,
            _label: &str,
            _properties: &[String],
        ) -> Result<(), GraphError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn stats_decode_count_rows() {
        let target = GraphTarget::new("g").unwrap();
        let stats = graph_stats(&CannedStore, &target).await.unwrap();
        assert_eq!(
            stats.nodes,
            vec![LabelCount {
                labels: vec!["Person".into()],
                count: 2
            }]
        );
        assert_eq!(stats.relationships[0].rel_type, "KNOWS");
        assert_eq!(stats.total_nodes(), 2);
        assert_eq!(stats.total_relationships(), 1);
    }
}
