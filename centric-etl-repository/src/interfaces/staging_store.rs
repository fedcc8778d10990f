//! Staging store trait definitions.
//!
//! The staging store is a set of JSON document collections: one per source
//! entity kind, one for derived documents and one for run summaries.

use async_trait::async_trait;
use centric_etl_shared::StagingCollection;
use futures::stream::BoxStream;
use serde_json::Value;
use std::sync::Arc;

use crate::errors::StagingStoreError;
use crate::types::Filter;

/// Lazily consumed sequence of documents returned by [`StagingStore::find`].
pub type DocumentStream<'a> = BoxStream<'a, Result<Value, StagingStoreError>>;

/// An open session against the staging store.
///
/// A session is opened once per run by a [`StoreConnector`] and shared by
/// every stage of that run. Implementations do no locking of their own beyond
/// what their backend provides: runs are serialized by the run queue.
#[async_trait]
pub trait StagingStore: Send + Sync {
    /// Delete every document in `collection` matching `filter`.
    ///
    /// # Returns
    ///
    /// * `Ok(u64)` - Number of documents removed
    /// * `Err(StagingStoreError)` - If the backend call fails
    async fn delete_many(
        &self,
        collection: StagingCollection,
        filter: &Filter,
    ) -> Result<u64, StagingStoreError>;

    /// Append documents to `collection`. An empty slice is a no-op.
    async fn insert_many(
        &self,
        collection: StagingCollection,
        documents: &[Value],
    ) -> Result<(), StagingStoreError>;

    /// Append one document to `collection`.
    async fn insert_one(
        &self,
        collection: StagingCollection,
        document: &Value,
    ) -> Result<(), StagingStoreError>;

    /// Stream the documents of `collection` matching `filter` in insertion order.
    ///
    /// Documents are pulled from the backend as the stream is polled; the
    /// whole result set is never buffered.
    fn find(&self, collection: StagingCollection, filter: Filter) -> DocumentStream<'_>;

    /// Return the first document of `collection` matching `filter`, if any.
    async fn find_one(
        &self,
        collection: StagingCollection,
        filter: &Filter,
    ) -> Result<Option<Value>, StagingStoreError>;

    /// Release the session's resources. Further calls fail.
    async fn close(&self);
}

/// Process-wide handle able to open staging store sessions.
///
/// Constructed once at startup and handed to the orchestrator, which opens
/// one session at the start of every run and closes it at the end.
#[async_trait]
pub trait StoreConnector: Send + Sync {
    async fn connect(&self) -> Result<Arc<dyn StagingStore>, StagingStoreError>;
}
