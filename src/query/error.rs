//! Query error types
//!
//! Defines the conditions under which a panel target cannot be compiled.

use thiserror::Error;

/// Errors that can occur while building TSDS queries
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueryError {
    /// Parallel lists in the editor's target do not line up
    #[error("Misaligned target: {list} has {found} entries, expected {expected}")]
    MisalignedTarget {
        list: &'static str,
        expected: usize,
        found: usize,
    },

    /// A percentile aggregation has no percentile argument
    #[error("Missing percentile value for aggregation {index}")]
    MissingPercentile { index: usize },

    /// Unknown boolean or comparison operator
    #[error("Invalid operator: {0:?}")]
    InvalidOperator(String),

    /// Raw query mode with no query text
    #[error("Raw query target has no query text")]
    EmptyRawQuery,

    /// Target JSON could not be decoded
    #[error("Invalid target: {0}")]
    InvalidTarget(String),
}

/// Result type for query operations
pub type QueryResult<T> = Result<T, QueryError>;
