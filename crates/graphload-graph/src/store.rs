//! The narrow store contract the ingestion engine depends on.

use async_trait::async_trait;
use graphload_core::normalize::quote_identifier;
use graphload_core::{EntityType, GraphTarget};

use crate::client::{GraphClient, GraphError};
use crate::statement::{ResultSet, Statement};

/// Anything that can execute parameterized statements against a named graph.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Execute one statement. Write-only statements return an empty result.
    async fn execute(
        &self,
        target: &GraphTarget,
        statement: &Statement,
    ) -> Result<ResultSet, GraphError>;

    /// Administrative command: create a uniqueness constraint over the
    /// ordered property list of `label`.
    async fn create_unique_constraint(
        &self,
        target: &GraphTarget,
        entity: EntityType,
        label: &str,
        properties: &[String],
    ) -> Result<(), GraphError>;

    /// Whether a uniqueness constraint builds its own backing index. Such
    /// stores get no separate supporting index before the constraint.
    fn constraints_own_index(&self) -> bool {
        false
    }
}

#[async_trait]
impl GraphStore for GraphClient {
    async fn execute(
        &self,
        target: &GraphTarget,
        statement: &Statement,
    ) -> Result<ResultSet, GraphError> {
        if statement.columns.is_empty() {
            self.run(target, statement).await?;
            Ok(ResultSet::empty())
        } else {
            self.query_rows(target, statement).await
        }
    }

    async fn create_unique_constraint(
        &self,
        target: &GraphTarget,
        entity: EntityType,
        label: &str,
        properties: &[String],
    ) -> Result<(), GraphError> {
        GraphClient::create_unique_constraint(self, target, entity, label, properties).await
    }

    /// Neo4j refuses a constraint while a plain index covers its properties.
    fn constraints_own_index(&self) -> bool {
        true
    }
}

/// `CREATE CONSTRAINT FOR (n:L) REQUIRE (n.a, n.b) IS UNIQUE`, or the
/// relationship form for `EntityType::Relationship`.
pub fn unique_constraint_cypher(entity: EntityType, label: &str, properties: &[String]) -> String {
    let var = match entity {
        EntityType::Node => "n",
        EntityType::Relationship => "r",
    };
    let props = properties
        .iter()
        .map(|p| format!("{var}.{}", quote_identifier(p)))
        .collect::<Vec<_>>()
        .join(", ");
    let label = quote_identifier(label);
    match entity {
        EntityType::Node => format!("CREATE CONSTRAINT FOR (n:{label}) REQUIRE ({props}) IS UNIQUE"),
        EntityType::Relationship => {
            format!("CREATE CONSTRAINT FOR ()-[r:{label}]-() REQUIRE ({props}) IS UNIQUE")
        }
    }
}
