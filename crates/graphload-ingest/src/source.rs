//! Source directory layout: node/edge CSV files, schema descriptors and
//! tenant subdirectories.

use std::fs;
use std::path::{Path, PathBuf};

use graphload_core::normalize::{node_label_from_file, relationship_type_from_file};
use graphload_core::{ConstraintSpec, GraphTarget, IndexSpec, Row, TenantContext};

use crate::error::{IngestError, Result};

pub const INDEX_FILE: &str = "indexes.csv";
pub const CONSTRAINT_FILE: &str = "constraints.csv";

/// A node or edge CSV file and the label / relationship type it carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    /// Sanitized node label or verbatim relationship type.
    pub name: String,
}

/// The loadable files of one directory, each list sorted by file name.
#[derive(Debug, Clone, Default)]
pub struct SourceLayout {
    pub dir: PathBuf,
    pub node_files: Vec<SourceFile>,
    pub edge_files: Vec<SourceFile>,
}

impl SourceLayout {
    pub fn scan(dir: &Path) -> Result<Self> {
        if !dir.is_dir() {
            return Err(IngestError::SourceDirMissing(dir.to_path_buf()));
        }

        let mut file_names = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                file_names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        file_names.sort();

        let mut layout = Self {
            dir: dir.to_path_buf(),
            ..Default::default()
        };
        for file_name in file_names {
            let path = dir.join(&file_name);
            if let Some(label) = node_label_from_file(&file_name) {
                layout.node_files.push(SourceFile { path, name: label });
            } else if let Some(rel_type) = relationship_type_from_file(&file_name) {
                layout.edge_files.push(SourceFile {
                    path,
                    name: rel_type,
                });
            }
        }
        Ok(layout)
    }

    /// Distinct node labels, in file order.
    pub fn node_labels(&self) -> Vec<String> {
        let mut labels: Vec<String> = Vec::with_capacity(self.node_files.len());
        for file in &self.node_files {
            if !labels.contains(&file.name) {
                labels.push(file.name.clone());
            }
        }
        labels
    }
}

/// Read a whole CSV file into rows. The first line is the header.
///
/// Short records are tolerated: missing trailing fields read as empty.
pub fn read_rows(path: &Path) -> Result<Vec<Row>> {
    let csv_err = |source: csv::Error| IngestError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .map_err(csv_err)?;
    let headers = reader.headers().map_err(csv_err)?.clone();

    let mut rows: Vec<Row> = Vec::new();
    for record in reader.records() {
        let record = record.map_err(csv_err)?;
        rows.push(
            headers
                .iter()
                .enumerate()
                .map(|(i, name)| (name, record.get(i).unwrap_or_default()))
                .collect(),
        );
    }
    tracing::debug!(path = %path.display(), rows = rows.len(), "Read CSV file");
    Ok(rows)
}

/// Parsed `indexes.csv`, or `None` when the directory has no such file.
pub fn read_index_specs(dir: &Path) -> Result<Option<Vec<IndexSpec>>> {
    read_descriptor(&dir.join(INDEX_FILE), IndexSpec::from_row)
}

/// Parsed `constraints.csv`, or `None` when the directory has no such file.
pub fn read_constraint_specs(dir: &Path) -> Result<Option<Vec<ConstraintSpec>>> {
    read_descriptor(&dir.join(CONSTRAINT_FILE), ConstraintSpec::from_row)
}

fn read_descriptor<T>(path: &Path, parse: fn(&Row) -> T) -> Result<Option<Vec<T>>> {
    if !path.is_file() {
        return Ok(None);
    }
    let rows = read_rows(path)?;
    Ok(Some(rows.iter().map(parse).collect()))
}

/// Immediate subdirectories of `root` named `<prefix><tenant>`, sorted by
/// name, each mapped to the `<base>_<tenant>` target.
pub fn discover_tenants(
    root: &Path,
    base: &GraphTarget,
    prefix: &str,
) -> Result<Vec<TenantContext>> {
    if !root.is_dir() {
        return Err(IngestError::SourceDirMissing(root.to_path_buf()));
    }

    let mut dir_names = Vec::new();
    for entry in fs::read_dir(root)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let dir_name = entry.file_name().to_string_lossy().into_owned();
        if dir_name.starts_with(prefix) {
            dir_names.push(dir_name);
        }
    }
    dir_names.sort();

    let mut tenants = Vec::with_capacity(dir_names.len());
    for dir_name in dir_names {
        let name = dir_name[prefix.len()..].to_string();
        if name.is_empty() {
            tracing::warn!(dir = %dir_name, "Tenant directory has no name after the prefix, skipping");
            continue;
        }
        tenants.push(TenantContext {
            target: base.for_tenant(&name),
            source_dir: root.join(&dir_name),
            name,
        });
    }
    Ok(tenants)
}
