//! Error types for the graphload-ingest crate.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Source directory not found: {0}")]
    SourceDirMissing(PathBuf),

    #[error("Failed to read CSV {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Graph error: {0}")]
    Graph(#[from] graphload_graph::GraphError),

    #[error("Invalid input: {0}")]
    Core(#[from] graphload_core::CoreError),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl IngestError {
    /// Errors that stop the process: an unreachable server or a bad
    /// configuration. Everything else is a failed load that is reported and
    /// exits cleanly.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Graph(graphload_graph::GraphError::Connection(_))
                | Self::SourceDirMissing(_)
                | Self::Config(_)
        )
    }
}

impl From<config::ConfigError> for IngestError {
    fn from(e: config::ConfigError) -> Self {
        Self::Config(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, IngestError>;

#[cfg(test)]
mod tests {
    use super::*;
    use graphload_graph::GraphError;

    #[test]
    fn only_connection_and_config_errors_are_fatal() {
        assert!(IngestError::from(GraphError::Connection("refused".into())).is_fatal());
        assert!(IngestError::SourceDirMissing(PathBuf::from("/nope")).is_fatal());
        assert!(IngestError::Config("batch_size must be positive".into()).is_fatal());

        assert!(!IngestError::from(GraphError::Query("Database does not exist".into())).is_fatal());
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        assert!(!IngestError::from(io).is_fatal());
    }
}
