//! Neo4j connection management and the shared graph client.

use std::collections::HashMap;
use std::sync::Arc;

use graphload_core::normalize::quote_identifier;
use graphload_core::{EntityType, GraphTarget};
use neo4rs::{ConfigBuilder, Graph};
use serde::Deserialize;
use tokio::sync::Mutex;

use crate::statement::{ParamValue, ResultSet, Statement};
use crate::store::unique_constraint_cypher;

/// Store error messages that mean the requested schema object is already
/// there. Matched case-insensitively.
const ALREADY_PRESENT_MARKERS: [&str; 5] = [
    "already exists",
    "equivalent",
    "already indexed",
    "index exists",
    "index is already created",
];

/// Neo4j refuses a uniqueness constraint while a plain index covers the same
/// label and properties. The message also says "already exists".
const BLOCKING_INDEX_MARKER: &str = "cannot be created until the index has been dropped";

const SYSTEM_DATABASE: &str = "system";
const MIN_DATABASE_NAME: usize = 3;
const MAX_DATABASE_NAME: usize = 63;

/// Errors from graph operations.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("Neo4j connection error: {0}")]
    Connection(String),

    #[error("Neo4j query error: {0}")]
    Query(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<neo4rs::Error> for GraphError {
    fn from(e: neo4rs::Error) -> Self {
        Self::Query(e.to_string())
    }
}

impl GraphError {
    /// True when the store refused a schema operation because an equivalent
    /// index or constraint already exists.
    pub fn is_already_present(&self) -> bool {
        match self {
            Self::Query(msg) => {
                let msg = msg.to_lowercase();
                !msg.contains(BLOCKING_INDEX_MARKER)
                    && ALREADY_PRESENT_MARKERS.iter().any(|m| msg.contains(m))
            }
            _ => false,
        }
    }

    /// True when a constraint was refused because a plain index is in the way.
    pub fn is_blocked_by_index(&self) -> bool {
        matches!(self, Self::Query(msg) if msg.to_lowercase().contains(BLOCKING_INDEX_MARKER))
    }
}

/// The Neo4j database a target is stored in.
///
/// Database names allow only ASCII letters, digits, `.` and `-`, must start
/// with a letter and be 3 to 63 characters long. Other characters become
/// `-` (so `g_a` is stored in `g-a`), a name not starting with a letter gets a
/// `db-` prefix and a short name a `-db` suffix.
pub fn database_name(target: &GraphTarget) -> String {
    let mut name: String = target
        .name()
        .chars()
        .map(|c| match c.to_ascii_lowercase() {
            c @ ('a'..='z' | '0'..='9' | '.' | '-') => c,
            _ => '-',
        })
        .collect();
    if !name.starts_with(|c: char| c.is_ascii_alphabetic()) {
        name.insert_str(0, "db-");
    }
    if name.len() < MIN_DATABASE_NAME {
        name.push_str("-db");
    }
    name.truncate(MAX_DATABASE_NAME);
    name
}

/// Configuration for connecting to Neo4j.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    pub uri: String,
    pub user: String,
    pub password: String,
    pub max_connections: u32,
    pub fetch_size: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            uri: "bolt://localhost:7687".to_string(),
            user: "neo4j".to_string(),
            password: "neo4j".to_string(),
            max_connections: 16,
            fetch_size: 256,
        }
    }
}

/// Neo4j graph client with one connection pool per target database.
///
/// Pools are opened lazily the first time a target is written to. Clone is
/// cheap (inner Arc).
#[derive(Clone)]
pub struct GraphClient {
    config: GraphConfig,
    targets: Arc<Mutex<HashMap<GraphTarget, Graph>>>,
}

impl GraphClient {
    /// Connect to Neo4j and verify the server answers.
    ///
    /// Fails with [`GraphError::Connection`] when the server is unreachable
    /// or rejects the credentials.
    pub async fn connect(config: &GraphConfig) -> Result<Self, GraphError> {
        let default_graph = open_pool(config, None).await?;
        default_graph
            .run(neo4rs::query("RETURN 1"))
            .await
            .map_err(|e| GraphError::Connection(e.to_string()))?;

        tracing::info!(uri = %config.uri, "Connected to Neo4j");
        Ok(Self {
            config: config.clone(),
            targets: Arc::new(Mutex::new(HashMap::new())),
        })
    }

    /// The pool for a target database, opened on first use. A missing
    /// database is created first.
    pub async fn graph_for(&self, target: &GraphTarget) -> Result<Graph, GraphError> {
        let mut targets = self.targets.lock().await;
        if let Some(graph) = targets.get(target) {
            return Ok(graph.clone());
        }

        let database = database_name(target);
        self.ensure_database(&database).await;
        let graph = open_pool(&self.config, Some(&database)).await?;
        tracing::debug!(target = %target, database = %database, "Opened connection pool for graph");
        targets.insert(target.clone(), graph.clone());
        Ok(graph)
    }

    /// Create `database` unless the server already has it. Failures are
    /// only logged: servers without multi-database support still serve
    /// their existing databases, and a missing one surfaces on first use.
    async fn ensure_database(&self, database: &str) {
        let result = match open_pool(&self.config, Some(SYSTEM_DATABASE)).await {
            Ok(system) => create_if_missing(&system, database).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(true) => tracing::info!(database = %database, "Created database"),
            Ok(false) => {}
            Err(e) => tracing::warn!(database = %database, error = %e, "Could not create database"),
        }
    }

    /// Execute a write-only statement.
    pub async fn run(&self, target: &GraphTarget, statement: &Statement) -> Result<(), GraphError> {
        let graph = self.graph_for(target).await?;
        graph.run(statement.to_query()).await?;
        Ok(())
    }

    /// Execute a statement and collect its declared result columns.
    pub async fn query_rows(
        &self,
        target: &GraphTarget,
        statement: &Statement,
    ) -> Result<ResultSet, GraphError> {
        let graph = self.graph_for(target).await?;
        collect_rows(&graph, statement).await
    }

    /// Create a uniqueness constraint. The constraint builds its own backing
    /// index, so a plain index over the same label and properties is dropped
    /// and the constraint retried once.
    pub async fn create_unique_constraint(
        &self,
        target: &GraphTarget,
        entity: EntityType,
        label: &str,
        properties: &[String],
    ) -> Result<(), GraphError> {
        let statement = Statement::new(unique_constraint_cypher(entity, label, properties));
        match self.run(target, &statement).await {
            Err(e) if e.is_blocked_by_index() => {
                self.drop_plain_indexes(target, entity, label, properties).await?;
                self.run(target, &statement).await
            }
            result => result,
        }
    }

    async fn drop_plain_indexes(
        &self,
        target: &GraphTarget,
        entity: EntityType,
        label: &str,
        properties: &[String],
    ) -> Result<(), GraphError> {
        let props: Vec<ParamValue> = properties.iter().map(|p| ParamValue::from(p.as_str())).collect();
        let found = self
            .query_rows(
                target,
                &Statement::new(
                    "SHOW INDEXES YIELD name, entityType, labelsOrTypes, properties, owningConstraint \
                     WHERE entityType = $entity AND labelsOrTypes = [$label] \
                     AND properties = $props AND owningConstraint IS NULL RETURN name",
                )
                .param("entity", entity.as_str())
                .param("label", label)
                .param("props", props)
                .returning(["name"]),
            )
            .await?;

        for row in &found.rows {
            let Some(name) = row.get("name").and_then(|v| v.as_str()) else {
                continue;
            };
            tracing::info!(graph = %target, index = %name, label = %label, "Dropping plain index in favour of uniqueness constraint");
            let drop = Statement::new(format!("DROP INDEX {} IF EXISTS", quote_identifier(name)));
            self.run(target, &drop).await?;
        }
        Ok(())
    }
}

/// Returns whether the database had to be created.
async fn create_if_missing(system: &Graph, database: &str) -> Result<bool, GraphError> {
    let existing = collect_rows(
        system,
        &Statement::new("SHOW DATABASES YIELD name WHERE name = $name RETURN name")
            .param("name", database)
            .returning(["name"]),
    )
    .await?;
    if !existing.is_empty() {
        return Ok(false);
    }
    let create = Statement::new("CREATE DATABASE $name IF NOT EXISTS WAIT").param("name", database);
    system.run(create.to_query()).await?;
    Ok(true)
}

async fn collect_rows(graph: &Graph, statement: &Statement) -> Result<ResultSet, GraphError> {
    let mut stream = graph.execute(statement.to_query()).await?;
    let mut result = ResultSet::empty();
    while let Some(row) = stream.next().await? {
        let mut record = serde_json::Map::new();
        for column in &statement.columns {
            let value: serde_json::Value = row.get(column).map_err(|e| {
                GraphError::Serialization(format!("Failed to read column {column}: {e}"))
            })?;
            record.insert(column.clone(), value);
        }
        result.rows.push(record);
    }
    Ok(result)
}

async fn open_pool(config: &GraphConfig, database: Option<&str>) -> Result<Graph, GraphError> {
    let mut builder = ConfigBuilder::default()
        .uri(&config.uri)
        .user(&config.user)
        .password(&config.password)
        .max_connections(config.max_connections as usize)
        .fetch_size(config.fetch_size);
    if let Some(database) = database {
        builder = builder.db(database);
    }
    let neo_config = builder
        .build()
        .map_err(|e| GraphError::Connection(e.to_string()))?;

    Graph::connect(neo_config)
        .await
        .map_err(|e| GraphError::Connection(e.to_string()))
}
