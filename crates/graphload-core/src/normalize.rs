//! Label, relationship-type and property-key normalization.

/// File name prefix of node files (`nodes_<label>.csv`).
pub const NODE_FILE_PREFIX: &str = "nodes_";
/// File name prefix of edge files (`edges_<TYPE>.csv`).
pub const EDGE_FILE_PREFIX: &str = "edges_";
pub const CSV_SUFFIX: &str = ".csv";

/// Replace every `:` with `_`. Idempotent.
pub fn sanitize_label(raw: &str) -> String {
    raw.replace(':', "_")
}

/// First colon-delimited segment of a compound label (`OS:Process` -> `OS`).
///
/// Patterns bind a node to a single label, so only the first one is used for
/// endpoint matching. Blank input yields `None`.
pub fn first_label_segment(raw: &str) -> Option<String> {
    let first = raw.trim().split(':').next().unwrap_or_default().trim();
    (!first.is_empty()).then(|| first.to_string())
}

/// Collapse a duplicated `X:X` export artifact into `X`.
pub fn clean_property_key(key: &str) -> &str {
    match key.split_once(':') {
        Some((a, b)) if a == b => a,
        _ => key,
    }
}

/// Quote a label, relationship type or property name for Cypher text.
pub fn quote_identifier(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// `nodes_A:B.csv` -> `A_B`.
pub fn node_label_from_file(file_name: &str) -> Option<String> {
    file_name
        .strip_prefix(NODE_FILE_PREFIX)?
        .strip_suffix(CSV_SUFFIX)
        .filter(|s| !s.is_empty())
        .map(sanitize_label)
}

/// `edges_KNOWS.csv` -> `KNOWS`, verbatim.
pub fn relationship_type_from_file(file_name: &str) -> Option<String> {
    file_name
        .strip_prefix(EDGE_FILE_PREFIX)?
        .strip_suffix(CSV_SUFFIX)
        .filter(|s| !s.is_empty())
        .map(String::from)
}
