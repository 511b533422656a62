//! Error types for analysis runs.

/// Result type for analysis operations
pub type AnalysisResult<T> = Result<T, AnalysisError>;

/// Error type for analysis operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AnalysisError {
    /// More than one point shares the full coordinate tuple.
    /// Points must be merged into one weighted point per coordinate first.
    #[error("Duplicate key in spatial index: {0:?}")]
    DuplicateKey(Vec<i32>),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Worker pool error: {0}")]
    WorkerPool(String),

    #[error("Task cancelled")]
    Cancelled,

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<String> for AnalysisError {
    fn from(s: String) -> Self {
        AnalysisError::InternalError(s)
    }
}

impl From<&str> for AnalysisError {
    fn from(s: &str) -> Self {
        AnalysisError::InternalError(s.to_string())
    }
}
