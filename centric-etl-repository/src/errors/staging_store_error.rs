use thiserror::Error;

/// Errors raised by the staging store.
///
/// Any of these is fatal for the current run: the pipeline cannot proceed
/// without its staging collections.
#[derive(Debug, Error)]
pub enum StagingStoreError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    #[error("Session closed")]
    SessionClosed,
}

impl StagingStoreError {
    pub fn invalid_document(msg: impl Into<String>) -> Self {
        Self::InvalidDocument(msg.into())
    }
}
