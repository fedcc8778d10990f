//! Write-index lifecycle.
//!
//! Composes the index registry and the search cluster: a fresh index is
//! requested from the registry, the fixed mapping is applied to it, and once
//! loaded it is published under the read alias.

use std::sync::Arc;

use serde_json::Value;
use tracing::{error, info, instrument, warn};

use crate::errors::{LifecycleError, SearchIndexError};
use crate::interfaces::{IndexRegistry, SearchIndexProvider};
use crate::opensearch::sequence_centric_mapping;
use crate::types::{CreateIndexRequest, IndexHandle, IndexReleaseRequest};

/// Registry settings for the index lifecycle.
#[derive(Debug, Clone)]
pub struct IndexLifecycleConfig {
    /// Read alias repointed by every release.
    pub alias: String,
    /// Entity name sent with every index request.
    pub entity: String,
    /// Fail provisioning when the mapping cannot be applied.
    pub strict_mapping: bool,
}

impl IndexLifecycleConfig {
    pub fn new(alias: impl Into<String>, entity: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
            entity: entity.into(),
            strict_mapping: false,
        }
    }

    pub fn with_strict_mapping(mut self, strict_mapping: bool) -> Self {
        self.strict_mapping = strict_mapping;
        self
    }
}

/// Provisions and releases the write index of a load.
///
/// # Example
///
/// ```ignore
/// let lifecycle = IndexLifecycle::new(registry, provider, IndexLifecycleConfig::new("covid_centric", "covid"));
/// let index = lifecycle.provision_write_index().await?;
/// // ... bulk load into index.index_name ...
/// lifecycle.release_index(&index).await?;
/// ```
pub struct IndexLifecycle {
    registry: Arc<dyn IndexRegistry>,
    provider: Arc<dyn SearchIndexProvider>,
    config: IndexLifecycleConfig,
    mapping: Value,
}

impl IndexLifecycle {
    pub fn new(
        registry: Arc<dyn IndexRegistry>,
        provider: Arc<dyn SearchIndexProvider>,
        config: IndexLifecycleConfig,
    ) -> Self {
        Self {
            registry,
            provider,
            config,
            mapping: sequence_centric_mapping(),
        }
    }

    /// The search cluster the lifecycle provisions indices on.
    pub fn provider(&self) -> Arc<dyn SearchIndexProvider> {
        self.provider.clone()
    }

    /// Request a new, empty index and apply the document mapping to it.
    ///
    /// Registry failures are fatal. Mapping failures are logged and the index
    /// is returned anyway, unless `strict_mapping` is set.
    #[instrument(skip(self), fields(entity = %self.config.entity))]
    pub async fn provision_write_index(&self) -> Result<IndexHandle, LifecycleError> {
        let index = self
            .registry
            .create_index(&CreateIndexRequest::centric(&self.config.entity))
            .await?;

        if let Err(e) = self.configure_index(&index.index_name).await {
            error!(index = %index.index_name, error = %e, "Failed to apply index mapping");
            if self.config.strict_mapping {
                return Err(e.into());
            }
        }

        info!(index = %index.index_name, "Write index provisioned");
        Ok(index)
    }

    /// Repoint the read alias at `index`.
    ///
    /// Every call repoints again; callers release once per successful load.
    #[instrument(skip(self, index), fields(index = %index.index_name, alias = %self.config.alias))]
    pub async fn release_index(&self, index: &IndexHandle) -> Result<bool, LifecycleError> {
        let request = IndexReleaseRequest::for_index(&self.config.alias, index);
        let acknowledged = self.registry.release_alias(&request).await?;

        if acknowledged {
            info!("Index released");
        } else {
            warn!("Index release was not acknowledged");
        }
        Ok(acknowledged)
    }

    /// Close, map and reopen. The index is reopened even when mapping fails
    /// so that it stays writable.
    async fn configure_index(&self, index: &str) -> Result<(), SearchIndexError> {
        self.provider.close_index(index).await?;
        let mapped = self.provider.put_mapping(index, &self.mapping).await;
        let reopened = self.provider.open_index(index).await;
        mapped.and(reopened)
    }
}
