//! Metadata lookup error types

use crate::client::TransportError;
use thiserror::Error;

/// Errors that can occur during metadata lookups
#[derive(Error, Debug)]
pub enum SearchError {
    /// The backend request failed
    #[error("Search request failed: {0}")]
    Transport(#[from] TransportError),

    /// The addressed where condition does not exist in the target
    #[error("No where condition at group {group}, index {condition}")]
    ConditionNotFound { group: usize, condition: usize },
}

/// Result type for metadata lookups
pub type SearchResult<T> = Result<T, SearchError>;
