//! Batch translation: CSV rows to typed graph elements, and graph elements
//! to parameterized bulk and per-row write statements.
//!
//! A bulk statement binds the whole batch as one `$batch` list and UNWINDs
//! it. The per-row form of every element is kept so a failed bulk write can
//! be replayed one row at a time. Neither form interpolates values into the
//! query text.

use graphload_core::normalize::{clean_property_key, first_label_segment, quote_identifier};
use graphload_core::typing::{infer_id, infer_value};
use graphload_core::{EdgeSpec, NodeSpec, Properties, Row};
use graphload_graph::{ParamValue, Statement};
use serde::Serialize;

/// Columns of a node file that are structure, not data.
pub const NODE_RESERVED: [&str; 2] = ["id", "labels"];
/// Columns of an edge file that are structure, not data.
pub const EDGE_RESERVED: [&str; 5] = ["source", "target", "type", "source_label", "target_label"];

pub const DEFAULT_BATCH_SIZE: usize = 5000;

/// How elements are written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteMode {
    /// Always insert; loading twice yields duplicates.
    #[default]
    Create,
    /// Upsert by key, then overwrite properties.
    Merge,
}

impl WriteMode {
    pub fn from_merge_flag(merge: bool) -> Self {
        if merge {
            Self::Merge
        } else {
            Self::Create
        }
    }
}

// ── Rows → Specs ──────────────────────────────────────────────────

/// Translate one node row. Rows without an `id` are malformed and dropped.
pub fn node_from_row(label: &str, row: &Row) -> Option<NodeSpec> {
    let id = row.get("id").filter(|id| !id.is_empty())?;

    let mut properties = Properties::new();
    for (key, raw) in row.iter() {
        if NODE_RESERVED.contains(&key) {
            continue;
        }
        let value = infer_value(raw);
        if !value.is_null() {
            properties.insert(key.to_string(), value);
        }
    }

    Some(NodeSpec {
        label: label.to_string(),
        id: infer_id(id),
        properties,
    })
}

/// Translate one edge row. Rows without `source` or `target` are malformed
/// and dropped.
pub fn edge_from_row(rel_type: &str, row: &Row) -> Option<EdgeSpec> {
    let source = row.get("source").filter(|s| !s.is_empty())?;
    let target = row.get("target").filter(|t| !t.is_empty())?;

    let mut properties = Properties::new();
    for (key, raw) in row.iter() {
        let key = clean_property_key(key);
        if EDGE_RESERVED.contains(&key) {
            continue;
        }
        let value = infer_value(raw);
        if !value.is_null() {
            properties.insert(key.to_string(), value);
        }
    }

    Some(EdgeSpec {
        rel_type: rel_type.to_string(),
        source_id: infer_id(source),
        target_id: infer_id(target),
        source_label: row.get("source_label").and_then(first_label_segment),
        target_label: row.get("target_label").and_then(first_label_segment),
        properties,
    })
}

/// The translated form of one `batch_size` slice of input rows.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch<T> {
    /// Zero-based position of the slice in the file.
    pub index: usize,
    /// Surviving elements in row order.
    pub specs: Vec<T>,
    /// Malformed rows dropped from this slice.
    pub skipped: usize,
}

/// Slice `rows` into batches of at most `batch_size` rows and translate
/// each row, preserving order.
pub fn translate<T>(
    rows: &[Row],
    batch_size: usize,
    translate_row: impl Fn(&Row) -> Option<T>,
) -> Vec<Batch<T>> {
    rows.chunks(batch_size.max(1))
        .enumerate()
        .map(|(index, chunk)| {
            let specs: Vec<T> = chunk.iter().filter_map(&translate_row).collect();
            Batch {
                index,
                skipped: chunk.len() - specs.len(),
                specs,
            }
        })
        .collect()
}

// ── Specs → Statements ────────────────────────────────────────────

/// Builds the bulk and per-row statements for one kind of element.
pub trait WriteTemplate {
    type Spec;

    /// Split a batch into runs that can share one bulk statement. Runs are
    /// consecutive, so row order is preserved.
    fn groups<'a>(&self, specs: &'a [Self::Spec]) -> Vec<&'a [Self::Spec]>;

    /// One statement writing every element of a group.
    fn bulk(&self, group: &[Self::Spec]) -> Statement;

    /// The equivalent statement for a single element.
    fn single(&self, spec: &Self::Spec) -> Statement;

    /// Short identification of an element for log lines.
    fn describe(&self, spec: &Self::Spec) -> String;
}

/// Statements for one node file.
#[derive(Debug, Clone)]
pub struct NodeTemplate {
    label: String,
    mode: WriteMode,
}

impl NodeTemplate {
    pub fn new(label: &str, mode: WriteMode) -> Self {
        Self {
            label: label.to_string(),
            mode,
        }
    }

    fn cypher(&self, id: &str, props: &str) -> String {
        let label = quote_identifier(&self.label);
        match self.mode {
            WriteMode::Create => format!("CREATE (n:{label}) SET n.id = {id}, n += {props}"),
            WriteMode::Merge => format!("MERGE (n:{label} {{id: {id}}}) SET n += {props}"),
        }
    }

    fn record(spec: &NodeSpec) -> ParamValue {
        ParamValue::Map(
            [
                ("id".to_string(), ParamValue::from(&spec.id)),
                ("props".to_string(), ParamValue::from(&spec.properties)),
            ]
            .into_iter()
            .collect(),
        )
    }
}

impl WriteTemplate for NodeTemplate {
    type Spec = NodeSpec;

    fn groups<'a>(&self, specs: &'a [NodeSpec]) -> Vec<&'a [NodeSpec]> {
        if specs.is_empty() {
            Vec::new()
        } else {
            vec![specs]
        }
    }

    fn bulk(&self, group: &[NodeSpec]) -> Statement {
        let records: Vec<ParamValue> = group.iter().map(Self::record).collect();
        Statement::new(format!(
            "UNWIND $batch AS row {}",
            self.cypher("row.id", "row.props")
        ))
        .param("batch", records)
    }

    fn single(&self, spec: &NodeSpec) -> Statement {
        Statement::new(self.cypher("$id", "$props"))
            .param("id", &spec.id)
            .param("props", &spec.properties)
    }

    fn describe(&self, spec: &NodeSpec) -> String {
        format!("(:{} {{id: {}}})", self.label, spec.id)
    }
}

/// Statements for one edge file.
///
/// Endpoints are matched by `(label, id)` when a group has both endpoint
/// labels, and by `id` alone across all labels otherwise. A batch is split
/// into consecutive runs of rows sharing the same label pair, so no row is
/// matched under another row's labels.
#[derive(Debug, Clone)]
pub struct EdgeTemplate {
    rel_type: String,
    mode: WriteMode,
}

impl EdgeTemplate {
    pub fn new(rel_type: &str, mode: WriteMode) -> Self {
        Self {
            rel_type: rel_type.to_string(),
            mode,
        }
    }

    fn cypher(&self, labels: Option<(&str, &str)>, source: &str, target: &str, props: &str) -> String {
        let (a, b) = match labels {
            Some((sl, tl)) => (
                format!("(a:{} {{id: {source}}})", quote_identifier(sl)),
                format!("(b:{} {{id: {target}}})", quote_identifier(tl)),
            ),
            None => (
                format!("(a {{id: {source}}})"),
                format!("(b {{id: {target}}})"),
            ),
        };
        let rel = quote_identifier(&self.rel_type);
        match self.mode {
            WriteMode::Create => {
                format!("MATCH {a} MATCH {b} CREATE (a)-[r:{rel}]->(b) SET r += {props}")
            }
            WriteMode::Merge => {
                format!("MERGE {a} MERGE {b} MERGE (a)-[r:{rel}]->(b) SET r += {props}")
            }
        }
    }

    fn record(spec: &EdgeSpec) -> ParamValue {
        ParamValue::Map(
            [
                ("source_id".to_string(), ParamValue::from(&spec.source_id)),
                ("target_id".to_string(), ParamValue::from(&spec.target_id)),
                (
                    "source_label".to_string(),
                    ParamValue::from(spec.source_label.as_deref()),
                ),
                (
                    "target_label".to_string(),
                    ParamValue::from(spec.target_label.as_deref()),
                ),
                ("props".to_string(), ParamValue::from(&spec.properties)),
            ]
            .into_iter()
            .collect(),
        )
    }
}

impl WriteTemplate for EdgeTemplate {
    type Spec = EdgeSpec;

    fn groups<'a>(&self, specs: &'a [EdgeSpec]) -> Vec<&'a [EdgeSpec]> {
        let mut groups = Vec::new();
        let mut start = 0;
        for i in 1..=specs.len() {
            if i == specs.len() || specs[i].endpoint_labels() != specs[start].endpoint_labels() {
                groups.push(&specs[start..i]);
                start = i;
            }
        }
        groups
    }

    fn bulk(&self, group: &[EdgeSpec]) -> Statement {
        let labels = group.first().and_then(EdgeSpec::endpoint_labels);
        let records: Vec<ParamValue> = group.iter().map(Self::record).collect();
        Statement::new(format!(
            "UNWIND $batch AS row {}",
            self.cypher(labels, "row.source_id", "row.target_id", "row.props")
        ))
        .param("batch", records)
    }

    fn single(&self, spec: &EdgeSpec) -> Statement {
        Statement::new(self.cypher(spec.endpoint_labels(), "$source_id", "$target_id", "$props"))
            .param("source_id", &spec.source_id)
            .param("target_id", &spec.target_id)
            .param("props", &spec.properties)
    }

    fn describe(&self, spec: &EdgeSpec) -> String {
        format!(
            "({})-[:{}]->({})",
            spec.source_id, self.rel_type, spec.target_id
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use graphload_core::{NodeId, TypedValue};

    fn row(pairs: &[(&str, &str)]) -> Row {
        pairs.iter().copied().collect()
    }

    fn edge(source: i64, labels: Option<(&str, &str)>) -> EdgeSpec {
        EdgeSpec {
            rel_type: "KNOWS".into(),
            source_id: NodeId::Integer(source),
            target_id: NodeId::Integer(source + 100),
            source_label: labels.map(|(s, _)| s.to_string()),
            target_label: labels.map(|(_, t)| t.to_string()),
            properties: Properties::new(),
        }
    }

    #[test]
    fn node_row_drops_reserved_and_empty_fields() {
        let spec = node_from_row(
            "Person",
            &row(&[("id", "2"), ("labels", "Person"), ("name", "Bob"), ("age", "")]),
        )
        .unwrap();
        assert_eq!(spec.id, NodeId::Integer(2));
        assert_eq!(spec.properties.len(), 1);
        assert_eq!(
            spec.properties.get("name"),
            Some(&TypedValue::String("Bob".into()))
        );
    }

    #[test]
    fn node_row_without_id_is_malformed() {
        assert!(node_from_row("Person", &row(&[("name", "x")])).is_none());
        assert!(node_from_row("Person", &row(&[("id", ""), ("name", "x")])).is_none());
    }

    #[test]
    fn edge_row_cleans_keys_and_reduces_labels() {
        let spec = edge_from_row(
            "RUNS",
            &row(&[
                ("source", "p-1"),
                ("target", "7"),
                ("source_label", "OS:Process"),
                ("target_label", ""),
                ("type", "RUNS"),
                ("Date:Date", "2024-01-01"),
                ("weight", "-0.5"),
            ]),
        )
        .unwrap();
        assert_eq!(spec.source_id, NodeId::String("p-1".into()));
        assert_eq!(spec.target_id, NodeId::Integer(7));
        assert_eq!(spec.source_label.as_deref(), Some("OS"));
        assert_eq!(spec.target_label, None);
        assert!(spec.properties.contains_key("Date"));
        assert!(!spec.properties.contains_key("type"));
        assert_eq!(spec.properties.get("weight"), Some(&TypedValue::Float(-0.5)));
    }

    #[test]
    fn edge_row_reserved_keys_checked_after_cleanup() {
        let spec = edge_from_row(
            "R",
            &row(&[
                ("source", "1"),
                ("target", "2"),
                ("type:type", "X"),
                ("source:source", "9"),
                ("target_label:target_label", "City"),
                ("since:since", "2020"),
            ]),
        )
        .unwrap();
        for reserved in EDGE_RESERVED {
            assert!(!spec.properties.contains_key(reserved), "{reserved} leaked");
        }
        assert_eq!(spec.source_id, NodeId::Integer(1));
        assert_eq!(spec.properties.get("since"), Some(&TypedValue::Integer(2020)));
    }

    #[test]
    fn edge_row_missing_endpoint_is_malformed() {
        assert!(edge_from_row("R", &row(&[("source", "1"), ("target", "")])).is_none());
        assert!(edge_from_row("R", &row(&[("target", "1")])).is_none());
    }

    #[test]
    fn translate_preserves_order_across_batches() {
        let rows: Vec<Row> = (1..=5)
            .map(|i| {
                let id = i.to_string();
                row(&[("id", id.as_str())])
            })
            .chain(std::iter::once(row(&[("id", "")])))
            .collect();
        let batches = translate(&rows, 2, |r| node_from_row("N", r));

        assert_eq!(batches.len(), 3);
        let ids: Vec<Vec<NodeId>> = batches
            .iter()
            .map(|b| b.specs.iter().map(|s| s.id.clone()).collect())
            .collect();
        assert_eq!(
            ids,
            vec![
                vec![NodeId::Integer(1), NodeId::Integer(2)],
                vec![NodeId::Integer(3), NodeId::Integer(4)],
                vec![NodeId::Integer(5)],
            ]
        );
        assert_eq!(batches[2].skipped, 1);
        assert_eq!(batches[1].index, 1);
    }

    #[test]
    fn node_statements_by_mode() {
        let create = NodeTemplate::new("Person", WriteMode::Create);
        let merge = NodeTemplate::new("Person", WriteMode::Merge);
        let spec = node_from_row("Person", &row(&[("id", "1"), ("name", "Alice")])).unwrap();

        assert_eq!(
            create.bulk(std::slice::from_ref(&spec)).text,
            "UNWIND $batch AS row CREATE (n:`Person`) SET n.id = row.id, n += row.props"
        );
        assert_eq!(
            merge.bulk(std::slice::from_ref(&spec)).text,
            "UNWIND $batch AS row MERGE (n:`Person` {id: row.id}) SET n += row.props"
        );

        let single = merge.single(&spec);
        assert_eq!(single.text, "MERGE (n:`Person` {id: $id}) SET n += $props");
        assert_eq!(single.params.get("id"), Some(&ParamValue::Integer(1)));
    }

    #[test]
    fn single_statement_binds_quote_characters() {
        let template = NodeTemplate::new("Person", WriteMode::Create);
        let spec = node_from_row("Person", &row(&[("id", "o'brien"), ("nick", "\"x\"")])).unwrap();
        let st = template.single(&spec);
        assert!(!st.text.contains("o'brien"));
        assert_eq!(
            st.params.get("id"),
            Some(&ParamValue::String("o'brien".into()))
        );
    }

    #[test]
    fn edge_statements_use_labels_when_known() {
        let merge = EdgeTemplate::new("KNOWS", WriteMode::Merge);
        let labeled = [edge(1, Some(("Person", "Person")))];
        assert_eq!(
            merge.bulk(&labeled).text,
            "UNWIND $batch AS row MERGE (a:`Person` {id: row.source_id}) \
             MERGE (b:`Person` {id: row.target_id}) \
             MERGE (a)-[r:`KNOWS`]->(b) SET r += row.props"
        );

        let create = EdgeTemplate::new("KNOWS", WriteMode::Create);
        assert_eq!(
            create.single(&edge(1, None)).text,
            "MATCH (a {id: $source_id}) MATCH (b {id: $target_id}) \
             CREATE (a)-[r:`KNOWS`]->(b) SET r += $props"
        );
    }

    #[test]
    fn edge_groups_split_on_label_pair_changes() {
        let template = EdgeTemplate::new("KNOWS", WriteMode::Create);
        let specs = vec![
            edge(1, Some(("A", "B"))),
            edge(2, Some(("A", "B"))),
            edge(3, None),
            edge(4, Some(("A", "C"))),
            edge(5, Some(("A", "C"))),
        ];
        let sizes: Vec<usize> = template.groups(&specs).iter().map(|g| g.len()).collect();
        assert_eq!(sizes, vec![2, 1, 2]);
        assert!(template.groups(&[]).is_empty());
    }

    #[test]
    fn edge_record_carries_endpoint_labels() {
        let template = EdgeTemplate::new("KNOWS", WriteMode::Merge);
        let st = template.bulk(&[edge(1, Some(("Person", "City")))]);
        let records = st.params.get("batch").and_then(ParamValue::as_list).unwrap();
        let record = records[0].as_map().unwrap();
        assert_eq!(
            record.get("target_label"),
            Some(&ParamValue::String("City".into()))
        );
        assert_eq!(record.get("source_id"), Some(&ParamValue::Integer(1)));
    }
}
