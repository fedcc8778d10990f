use async_trait::async_trait;

use crate::errors::RegistryError;
use crate::types::{CreateIndexRequest, IndexHandle, IndexReleaseRequest};

/// Client of the external index registry that owns index naming and aliases.
#[async_trait]
pub trait IndexRegistry: Send + Sync {
    /// Ask the registry for a new, empty index.
    async fn create_index(&self, request: &CreateIndexRequest) -> Result<IndexHandle, RegistryError>;

    /// Atomically repoint an alias at the given release shards.
    ///
    /// Returns the registry's acknowledgement. Calling this twice repoints twice.
    async fn release_alias(&self, request: &IndexReleaseRequest) -> Result<bool, RegistryError>;
}
