//! Layered configuration: `<prefix>.toml`, then `GRAPHLOAD__*` environment
//! variables. CLI flags are applied on top by the binary.

use graphload_graph::GraphConfig;
use serde::Deserialize;

use crate::error::{IngestError, Result};
use crate::orchestrator::DEFAULT_TENANT_PREFIX;
use crate::translate::{WriteMode, DEFAULT_BATCH_SIZE};

pub const ENV_PREFIX: &str = "GRAPHLOAD";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    /// `[neo4j]` section.
    #[serde(default)]
    pub neo4j: GraphConfig,
    /// `[load]` section.
    #[serde(default)]
    pub load: LoadConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoadConfig {
    /// Source root holding the CSV files (default: "csv_output").
    #[serde(default = "default_csv_dir")]
    pub csv_dir: String,

    /// Rows per bulk write.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Upsert instead of insert.
    #[serde(default)]
    pub merge_mode: bool,

    /// Load each tenant directory into its own graph.
    #[serde(default)]
    pub multi_graph: bool,

    #[serde(default = "default_tenant_prefix")]
    pub tenant_prefix: String,
}

fn default_csv_dir() -> String {
    "csv_output".to_string()
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

fn default_tenant_prefix() -> String {
    DEFAULT_TENANT_PREFIX.to_string()
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            csv_dir: default_csv_dir(),
            batch_size: default_batch_size(),
            merge_mode: false,
            multi_graph: false,
            tenant_prefix: default_tenant_prefix(),
        }
    }
}

impl LoadConfig {
    pub fn write_mode(&self) -> WriteMode {
        WriteMode::from_merge_flag(self.merge_mode)
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(graphload_core::CoreError::InvalidBatchSize(self.batch_size).into());
        }
        if self.tenant_prefix.is_empty() {
            return Err(IngestError::Config("tenant_prefix must not be empty".into()));
        }
        Ok(())
    }
}

/// Read settings from `<file_prefix>.toml` (optional) and the environment.
pub fn load_settings(file_prefix: &str) -> Result<Settings> {
    let cfg = config::Config::builder()
        .add_source(config::File::with_name(file_prefix).required(false))
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    Ok(cfg.try_deserialize()?)
}
