use thiserror::Error;

/// Errors raised while building core values from user input.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum CoreError {
    #[error("Graph name must not be empty")]
    EmptyGraphName,

    #[error("Batch size must be at least 1, got {0}")]
    InvalidBatchSize(usize),
}
