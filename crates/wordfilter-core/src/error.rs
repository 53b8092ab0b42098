//! Error types for filter configuration

use thiserror::Error;

/// Errors raised when a configuration change is rejected.
///
/// A rejected change never partially applies: the `FilterState` is left
/// exactly as it was before the call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    /// Similarity threshold outside the inclusive `0..=100` range
    #[error("threshold must be between 0 and 100, got {0}")]
    InvalidThreshold(i64),

    /// Principal identifier that could not be parsed from text
    #[error("invalid principal id: {0:?}")]
    InvalidPrincipal(String),
}

/// Result type for filter operations
pub type FilterResult<T> = Result<T, FilterError>;
