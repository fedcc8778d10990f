//! Search index provider trait definition.
//!
//! This module defines the abstract interface for the search cluster calls the
//! ETL needs, allowing for different backend implementations.

use async_trait::async_trait;
use serde_json::Value;

use crate::errors::SearchIndexError;
use crate::types::BulkDocument;

/// Abstracts the underlying search cluster (OpenSearch, Elasticsearch, etc.).
///
/// Index creation and aliasing are owned by the index registry; this trait only
/// covers the administrative calls needed to apply a mapping to a freshly issued
/// index and the bulk writes that populate it.
///
/// All methods return `Result<T, SearchIndexError>` for consistent error handling
/// across different backend implementations.
#[async_trait]
pub trait SearchIndexProvider: Send + Sync {
    /// Check that the cluster is reachable.
    async fn ping(&self) -> Result<(), SearchIndexError>;

    /// Close an index so its mapping can be changed.
    ///
    /// # Arguments
    ///
    /// * `index` - Concrete index name
    async fn close_index(&self, index: &str) -> Result<(), SearchIndexError>;

    /// Apply a field mapping to a closed index.
    ///
    /// # Arguments
    ///
    /// * `index` - Concrete index name
    /// * `mapping` - The mapping body (`{"properties": {...}}`)
    async fn put_mapping(&self, index: &str, mapping: &Value) -> Result<(), SearchIndexError>;

    /// Reopen a closed index.
    async fn open_index(&self, index: &str) -> Result<(), SearchIndexError>;

    /// Index a batch of documents in one bulk request.
    ///
    /// Each document is written under its own `id`. An empty batch is a no-op.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - If every document was indexed
    /// * `Err(SearchIndexError)` - If the request failed or any item was rejected
    async fn bulk_index(
        &self,
        index: &str,
        documents: &[BulkDocument],
    ) -> Result<(), SearchIndexError>;
}
