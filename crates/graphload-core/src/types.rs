//! Core data model for the loader.
//!
//! A CSV record enters as a [`Row`], is typed into a [`NodeSpec`] or
//! [`EdgeSpec`], and is written against an explicit [`GraphTarget`].

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ── Rows ──────────────────────────────────────────────────────────

/// One CSV record: field name to raw text, in header order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    fields: Vec<(String, String)>,
}

impl Row {
    /// Raw text of a field; `Some("")` for an empty cell, `None` if absent.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Raw text of a field with surrounding whitespace removed, `None` if
    /// absent or blank.
    pub fn get_trimmed(&self, name: &str) -> Option<&str> {
        self.get(name).map(str::trim).filter(|v| !v.is_empty())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|(k, _)| k.as_str()).collect()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

// ── Values ────────────────────────────────────────────────────────

/// A scalar inferred from a raw CSV cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TypedValue {
    Integer(i64),
    Float(f64),
    String(String),
    Null,
}

impl TypedValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl fmt::Display for TypedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::String(s) => write!(f, "{s:?}"),
            Self::Null => f.write_str("null"),
        }
    }
}

/// Non-null properties of a node or edge, keyed by property name.
pub type Properties = BTreeMap<String, TypedValue>;

/// Typed node identifier taken from the `id`, `source` or `target` column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NodeId {
    Integer(i64),
    String(String),
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(i) => write!(f, "{i}"),
            Self::String(s) => write!(f, "{s:?}"),
        }
    }
}

// ── Graph Elements ────────────────────────────────────────────────

/// A node translated from one row of a `nodes_<label>.csv` file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSpec {
    pub label: String,
    pub id: NodeId,
    pub properties: Properties,
}

/// A relationship translated from one row of an `edges_<TYPE>.csv` file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeSpec {
    pub rel_type: String,
    pub source_id: NodeId,
    pub target_id: NodeId,
    pub source_label: Option<String>,
    pub target_label: Option<String>,
    pub properties: Properties,
}

impl EdgeSpec {
    /// Endpoint labels usable for matching, only when both are known.
    pub fn endpoint_labels(&self) -> Option<(&str, &str)> {
        match (&self.source_label, &self.target_label) {
            (Some(s), Some(t)) => Some((s.as_str(), t.as_str())),
            _ => None,
        }
    }
}

// ── Schema Descriptors ────────────────────────────────────────────

/// One row of `indexes.csv`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSpec {
    pub labels: Vec<String>,
    pub properties: Vec<String>,
    /// `UNIQUE` or `NONUNIQUE`/`NON_UNIQUE`, as exported.
    pub uniqueness: String,
    /// Index type as exported (`RANGE`, `LOOKUP`, `TEXT`, ...), upper-cased.
    pub kind: String,
}

impl IndexSpec {
    pub fn from_row(row: &Row) -> Self {
        Self {
            labels: split_multi(row.get("labels").unwrap_or_default()),
            properties: split_multi(row.get("properties").unwrap_or_default()),
            uniqueness: row
                .get_trimmed("uniqueness")
                .unwrap_or("NON_UNIQUE")
                .to_uppercase(),
            kind: row.get("type").unwrap_or_default().trim().to_uppercase(),
        }
    }

    /// Lookup indexes are managed by the store; unique ones come from
    /// constraints. Neither is created from this descriptor.
    pub fn is_provisionable(&self) -> bool {
        !self.labels.is_empty()
            && !self.properties.is_empty()
            && self.kind != "LOOKUP"
            && self.uniqueness != "UNIQUE"
    }

    /// Cross product of (label, property) pairs, labels outermost.
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.labels.iter().flat_map(move |label| {
            self.properties
                .iter()
                .map(move |prop| (label.as_str(), prop.as_str()))
        })
    }
}

/// What kind of element a constraint applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityType {
    Node,
    Relationship,
}

impl EntityType {
    /// Parse the `entity_type` column; blank or unrecognised means `Node`.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_uppercase().as_str() {
            "RELATIONSHIP" | "REL" | "EDGE" => Self::Relationship,
            _ => Self::Node,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Node => "NODE",
            Self::Relationship => "RELATIONSHIP",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConstraintKind {
    Unique,
    /// Any other kind (e.g. `MANDATORY`); reported, never created.
    Unsupported(String),
}

impl ConstraintKind {
    pub fn parse(raw: &str) -> Self {
        let upper = raw.trim().to_uppercase();
        if upper.contains("UNIQUE") {
            Self::Unique
        } else {
            Self::Unsupported(upper)
        }
    }
}

/// One row of `constraints.csv`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstraintSpec {
    pub labels: Vec<String>,
    pub properties: Vec<String>,
    pub kind: ConstraintKind,
    pub entity: EntityType,
}

impl ConstraintSpec {
    pub fn from_row(row: &Row) -> Self {
        Self {
            labels: split_multi(row.get("labels").unwrap_or_default()),
            properties: split_multi(row.get("properties").unwrap_or_default()),
            kind: ConstraintKind::parse(row.get("type").unwrap_or_default()),
            entity: EntityType::parse(row.get("entity_type").unwrap_or_default()),
        }
    }

    pub fn is_complete(&self) -> bool {
        !self.labels.is_empty() && !self.properties.is_empty()
    }

    pub fn is_unique(&self) -> bool {
        self.kind == ConstraintKind::Unique
    }
}

/// Split a `;`-delimited descriptor column, dropping blank entries.
fn split_multi(raw: &str) -> Vec<String> {
    raw.split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

// ── Targets ───────────────────────────────────────────────────────

/// The graph (database) a statement is issued against.
///
/// Passed explicitly to every write; there is no shared "current graph".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GraphTarget(String);

impl GraphTarget {
    pub fn new(name: impl Into<String>) -> Result<Self, CoreError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(CoreError::EmptyGraphName);
        }
        Ok(Self(name))
    }

    pub fn name(&self) -> &str {
        &self.0
    }

    /// Per-tenant target: `<base>_<tenant>`.
    pub fn for_tenant(&self, tenant: &str) -> Self {
        Self(format!("{}_{}", self.0, tenant))
    }
}

impl fmt::Display for GraphTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One tenant partition discovered under the source root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantContext {
    pub name: String,
    pub source_dir: PathBuf,
    pub target: GraphTarget,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, &str)]) -> Row {
        pairs.iter().copied().collect()
    }

    #[test]
    fn row_distinguishes_empty_and_absent() {
        let r = row(&[("id", "1"), ("age", "")]);
        assert_eq!(r.get("id"), Some("1"));
        assert_eq!(r.get("age"), Some(""));
        assert_eq!(r.get("name"), None);
        assert_eq!(r.get_trimmed("age"), None);
        assert_eq!(r.field_names(), vec!["id", "age"]);
    }

    #[test]
    fn typed_value_serializes_untagged() {
        let json = serde_json::to_string(&TypedValue::Integer(30)).unwrap();
        assert_eq!(json, "30");
        let json = serde_json::to_string(&NodeId::String("a-1".into())).unwrap();
        assert_eq!(json, "\"a-1\"");
    }

    #[test]
    fn index_spec_expands_cross_product() {
        let spec = IndexSpec::from_row(&row(&[
            ("labels", "Person; Employee"),
            ("properties", "name;email;"),
            ("uniqueness", "NONUNIQUE"),
            ("type", "range"),
        ]));
        assert!(spec.is_provisionable());
        let pairs: Vec<_> = spec.pairs().collect();
        assert_eq!(
            pairs,
            vec![
                ("Person", "name"),
                ("Person", "email"),
                ("Employee", "name"),
                ("Employee", "email"),
            ]
        );
    }

    #[test]
    fn lookup_and_unique_indexes_are_not_provisioned() {
        let lookup = IndexSpec::from_row(&row(&[
            ("labels", "Person"),
            ("properties", "name"),
            ("type", "LOOKUP"),
        ]));
        assert!(!lookup.is_provisionable());

        let unique = IndexSpec::from_row(&row(&[
            ("labels", "Person"),
            ("properties", "name"),
            ("uniqueness", "UNIQUE"),
        ]));
        assert!(!unique.is_provisionable());

        let blank = IndexSpec::from_row(&row(&[("labels", ""), ("properties", "name")]));
        assert!(!blank.is_provisionable());
    }

    #[test]
    fn constraint_spec_parses_kind_and_entity() {
        let spec = ConstraintSpec::from_row(&row(&[
            ("labels", "Person"),
            ("properties", "first;last"),
            ("type", "node_key_unique"),
            ("entity_type", ""),
        ]));
        assert!(spec.is_unique());
        assert!(spec.is_complete());
        assert_eq!(spec.entity, EntityType::Node);
        assert_eq!(spec.properties, vec!["first", "last"]);

        let other = ConstraintSpec::from_row(&row(&[
            ("labels", "KNOWS"),
            ("properties", "since"),
            ("type", "mandatory"),
            ("entity_type", "relationship"),
        ]));
        assert_eq!(other.kind, ConstraintKind::Unsupported("MANDATORY".into()));
        assert_eq!(other.entity, EntityType::Relationship);
    }

    #[test]
    fn graph_target_for_tenant() {
        let base = GraphTarget::new("g").unwrap();
        assert_eq!(base.for_tenant("a").name(), "g_a");
        assert_eq!(GraphTarget::new("  "), Err(CoreError::EmptyGraphName));
    }
}
