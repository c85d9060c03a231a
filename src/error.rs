//! Error types for pipeline evaluation
//!
//! Errors raised by user callbacks are carried through unchanged as
//! [`PipelineError::Callback`]; worker failures inside the parallel executor
//! stay attached to their partition as [`PipelineError::Partition`].

/// Boxed error produced by user-supplied callbacks and workers
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Main error type for pipeline operations
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// A map/filter/predicate callback returned an error
    #[error("Callback failed: {0}")]
    Callback(#[source] BoxError),

    /// A parallel worker failed for one partition
    #[error("Partition {index} failed: {source}")]
    Partition {
        index: usize,
        #[source]
        source: BoxError,
    },

    /// Configuration rejected by validation or parsing
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl PipelineError {
    /// Wrap any user error as a callback failure
    pub fn callback<E>(err: E) -> Self
    where
        E: Into<BoxError>,
    {
        PipelineError::Callback(err.into())
    }

    /// Partition index for executor failures
    pub fn partition_index(&self) -> Option<usize> {
        match self {
            PipelineError::Partition { index, .. } => Some(*index),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(err: serde_json::Error) -> Self {
        PipelineError::InvalidConfig(err.to_string())
    }
}

/// Result type for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;
