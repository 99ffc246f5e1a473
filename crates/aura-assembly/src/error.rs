//! Error types for aura-assembly

use thiserror::Error;

/// Assembly graph error type
#[derive(Debug, Error)]
pub enum Error {
    /// Graph file could not be read or written
    #[error("assembly file error at {path}: {source}")]
    Io {
        /// File path
        path: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Graph JSON is malformed or uses an unknown criteria kind
    #[error("invalid assembly JSON: {0}")]
    Parse(#[from] serde_json::Error),

    /// The graph has nothing to execute
    #[error("assembly '{0}' has no steps to execute")]
    EmptyStepOrder(String),

    /// Step order names a step that does not exist
    #[error("step order references unknown step '{0}'")]
    UnknownStep(String),

    /// Step order lists a step twice
    #[error("step '{0}' appears more than once in the step order")]
    DuplicateStep(String),

    /// A defined step is never scheduled
    #[error("step '{0}' is defined but missing from the step order")]
    UnscheduledStep(String),

    /// Map key and embedded id disagree
    #[error("step key '{key}' does not match step id '{id}'")]
    MismatchedStepId {
        /// Key in the steps map
        key: String,
        /// Id stored in the step
        id: String,
    },
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
