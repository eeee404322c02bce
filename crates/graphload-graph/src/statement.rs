//! Parameterized statements and their results.
//!
//! Values only ever reach the store as bound parameters. Query text carries
//! nothing but Cypher keywords and quoted identifiers.

use std::collections::BTreeMap;

use graphload_core::{NodeId, Properties, TypedValue};
use neo4rs::{BoltNull, BoltType};
use serde::Serialize;

/// A value bound to a statement parameter.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    Null,
    Integer(i64),
    Float(f64),
    String(String),
    List(Vec<ParamValue>),
    Map(BTreeMap<String, ParamValue>),
}

pub type Params = BTreeMap<String, ParamValue>;

impl ParamValue {
    pub fn as_map(&self) -> Option<&BTreeMap<String, ParamValue>> {
        match self {
            Self::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[ParamValue]> {
        match self {
            Self::List(l) => Some(l),
            _ => None,
        }
    }

    /// Convert into the Bolt wire representation.
    pub fn to_bolt(&self) -> BoltType {
        match self {
            Self::Null => BoltType::Null(BoltNull),
            Self::Integer(i) => BoltType::from(*i),
            Self::Float(x) => BoltType::from(*x),
            Self::String(s) => BoltType::from(s.clone()),
            Self::List(items) => {
                let list: Vec<BoltType> = items.iter().map(ParamValue::to_bolt).collect();
                BoltType::from(list)
            }
            Self::Map(entries) => {
                let map: std::collections::HashMap<String, BoltType> = entries
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_bolt()))
                    .collect();
                BoltType::from(map)
            }
        }
    }
}

impl From<&TypedValue> for ParamValue {
    fn from(v: &TypedValue) -> Self {
        match v {
            TypedValue::Integer(i) => Self::Integer(*i),
            TypedValue::Float(x) => Self::Float(*x),
            TypedValue::String(s) => Self::String(s.clone()),
            TypedValue::Null => Self::Null,
        }
    }
}

impl From<&NodeId> for ParamValue {
    fn from(id: &NodeId) -> Self {
        match id {
            NodeId::Integer(i) => Self::Integer(*i),
            NodeId::String(s) => Self::String(s.clone()),
        }
    }
}

/// Null entries never reach the store; the property is simply absent.
impl From<&Properties> for ParamValue {
    fn from(props: &Properties) -> Self {
        Self::Map(
            props
                .iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k.clone(), ParamValue::from(v)))
                .collect(),
        )
    }
}

impl From<Option<&str>> for ParamValue {
    fn from(v: Option<&str>) -> Self {
        v.map_or(Self::Null, |s| Self::String(s.to_string()))
    }
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<i64> for ParamValue {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<Vec<ParamValue>> for ParamValue {
    fn from(items: Vec<ParamValue>) -> Self {
        Self::List(items)
    }
}

/// Cypher text plus bound parameters.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Statement {
    pub text: String,
    pub params: Params,
    /// Result columns to collect; empty for write-only statements.
    pub columns: Vec<String>,
}

impl Statement {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn param(mut self, key: &str, value: impl Into<ParamValue>) -> Self {
        self.params.insert(key.to_string(), value.into());
        self
    }

    pub fn returning<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Build the neo4rs query for this statement.
    pub fn to_query(&self) -> neo4rs::Query {
        self.params
            .iter()
            .fold(neo4rs::query(&self.text), |q, (k, v)| q.param(k, v.to_bolt()))
    }
}

/// Rows returned by a statement, keyed by the requested column names.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    pub rows: Vec<serde_json::Map<String, serde_json::Value>>,
}

impl ResultSet {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
