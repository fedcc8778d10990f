//! Error types for the ETL service.

use centric_etl_repository::{LifecycleError, SearchIndexError, SourceError, StagingStoreError};
use centric_etl_shared::InvalidStageSet;
use thiserror::Error;

/// Errors that abort a stage, and with it the rest of the run.
///
/// The message of the error is what ends up in the run summary.
#[derive(Error, Debug)]
pub enum EtlError {
    /// The requested stage combination is not allowed.
    #[error(transparent)]
    InvalidStages(#[from] InvalidStageSet),

    /// The staging store failed or is unreachable.
    #[error("Staging store error: {0}")]
    StagingStore(#[from] StagingStoreError),

    /// The source API failed or returned an unreadable page.
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    /// Provisioning or releasing the write index failed.
    #[error("Index lifecycle error: {0}")]
    Lifecycle(#[from] LifecycleError),

    /// A bulk write to the search cluster failed.
    #[error("Search index error: {0}")]
    SearchIndex(#[from] SearchIndexError),

    /// A staged record could not be shaped into a document.
    #[error("Document error: {0}")]
    DocumentError(String),
}

impl EtlError {
    /// Create a document error.
    pub fn document(msg: impl Into<String>) -> Self {
        Self::DocumentError(msg.into())
    }
}

/// Errors that can occur during service startup or while serving.
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The control surface could not bind or serve.
    #[error("Server error: {0}")]
    ServerError(#[from] std::io::Error),

    /// A run request was rejected.
    #[error("Run rejected: {0}")]
    RunRejected(String),

    /// A run finished with errors.
    #[error("Run failed: {0}")]
    RunFailed(String),

    /// The run queue worker is gone.
    #[error("Run queue closed")]
    QueueClosed,
}

impl ServiceError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }
}
