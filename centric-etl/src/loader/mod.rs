//! Load stage.
//!
//! Streams the sequence-centric documents into a freshly provisioned index in
//! fixed-size bulk batches, then publishes the index under the read alias.

use std::sync::Arc;

use centric_etl_repository::types::{BulkDocument, Filter};
use centric_etl_repository::{IndexLifecycle, SearchIndexProvider, StagingStore};
use centric_etl_shared::{LoadSummary, StagingCollection};
use futures::StreamExt;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::errors::EtlError;
use crate::timer::Timer;

/// Configuration for the bulk loader.
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    /// Number of documents sent in one bulk request.
    pub batch_size: usize,
    /// Batches between two progress log lines.
    pub progress_interval: u64,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            batch_size: 50,
            progress_interval: 25,
        }
    }
}

/// Loader that indexes the derived documents into a new index.
///
/// Batches are submitted strictly one after another, and the index is only
/// released once every batch has been accepted. A failed batch aborts the
/// load and leaves the new index unreleased.
pub struct BulkLoader {
    store: Arc<dyn StagingStore>,
    lifecycle: Arc<IndexLifecycle>,
    provider: Arc<dyn SearchIndexProvider>,
    config: LoaderConfig,
}

impl BulkLoader {
    /// Create a new loader with the default batch size of 50.
    pub fn new(store: Arc<dyn StagingStore>, lifecycle: Arc<IndexLifecycle>) -> Self {
        Self::with_config(store, lifecycle, LoaderConfig::default())
    }

    /// Create a new loader with custom configuration.
    pub fn with_config(
        store: Arc<dyn StagingStore>,
        lifecycle: Arc<IndexLifecycle>,
        config: LoaderConfig,
    ) -> Self {
        let provider = lifecycle.provider();
        Self {
            store,
            lifecycle,
            provider,
            config: LoaderConfig {
                batch_size: config.batch_size.max(1),
                progress_interval: config.progress_interval.max(1),
            },
        }
    }

    /// Run the load stage.
    #[instrument(skip(self))]
    pub async fn load(&self) -> Result<LoadSummary, EtlError> {
        let timer = Timer::start();
        info!("Starting load");

        let index = self.lifecycle.provision_write_index().await?;
        info!(index = %index.index_name, "Uploading documents to new index");

        let mut documents = self
            .store
            .find(StagingCollection::SequenceCentric, Filter::all());
        let mut batch: Vec<BulkDocument> = Vec::with_capacity(self.config.batch_size);
        let mut batches: u64 = 0;
        let mut total: u64 = 0;

        while let Some(document) = documents.next().await {
            batch.push(Self::to_bulk_document(document?)?);
            total += 1;

            if batch.len() >= self.config.batch_size {
                batches += 1;
                if batches % self.config.progress_interval == 0 {
                    debug!(batches, documents = total, "Submitting batch");
                }
                self.provider.bulk_index(&index.index_name, &batch).await?;
                batch.clear();
            }
        }
        drop(documents);

        // The remainder is always submitted; an empty batch is a no-op.
        self.provider.bulk_index(&index.index_name, &batch).await?;
        info!(index = %index.index_name, documents = total, "Done uploading documents");

        if !self.lifecycle.release_index(&index).await? {
            warn!(index = %index.index_name, "Registry did not acknowledge the release");
        }

        let summary = LoadSummary {
            index: index.index_name,
            duration: timer.elapsed_ms(),
        };
        info!(index = %summary.index, duration_ms = summary.duration, "Finished load");
        Ok(summary)
    }

    /// Key a staged document by its `sequence_id`.
    fn to_bulk_document(mut source: Value) -> Result<BulkDocument, EtlError> {
        if let Some(object) = source.as_object_mut() {
            object.remove("_id");
        }
        let id = match source.get("sequence_id") {
            Some(Value::String(id)) => id.clone(),
            _ => {
                return Err(EtlError::document(
                    "sequence-centric document without sequence_id",
                ))
            }
        };
        Ok(BulkDocument { id, source })
    }
}
