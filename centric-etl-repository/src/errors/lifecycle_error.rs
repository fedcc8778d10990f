use thiserror::Error;

use crate::errors::{RegistryError, SearchIndexError};

/// Errors from provisioning or releasing a write index.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    SearchIndex(#[from] SearchIndexError),
}
