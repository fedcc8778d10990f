//! Search index error types.

use thiserror::Error;

/// Errors from search cluster operations.
///
/// Used by the `SearchIndexProvider` trait for all administrative and bulk
/// write calls against the search cluster.
#[derive(Debug, Clone, Error)]
pub enum SearchIndexError {
    /// Failed to establish connection to the search cluster.
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// An administrative call (close, open) failed.
    #[error("Index admin error: {0}")]
    AdminError(String),

    /// Applying the field mapping failed.
    #[error("Mapping error: {0}")]
    MappingError(String),

    /// Bulk indexing request failed or reported item failures.
    #[error("Bulk index error: {0}")]
    BulkIndexError(String),

    /// Failed to parse response from the search cluster.
    #[error("Parse error: {0}")]
    ParseError(String),
}

impl SearchIndexError {
    /// Create a connection error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::ConnectionError(msg.into())
    }

    /// Create an index admin error.
    pub fn admin(msg: impl Into<String>) -> Self {
        Self::AdminError(msg.into())
    }

    /// Create a mapping error.
    pub fn mapping(msg: impl Into<String>) -> Self {
        Self::MappingError(msg.into())
    }

    /// Create a bulk index error.
    pub fn bulk_index(msg: impl Into<String>) -> Self {
        Self::BulkIndexError(msg.into())
    }

    /// Create a parse error.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::ParseError(msg.into())
    }
}
