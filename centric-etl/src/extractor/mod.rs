//! Extract stage.
//!
//! Replaces every source collection in the staging store with the current
//! contents of its Data Connect table.

mod reader;

pub use reader::PageReader;

use std::sync::Arc;

use centric_etl_repository::types::Filter;
use centric_etl_repository::{PageFetcher, StagingStore};
use centric_etl_shared::{EntityKind, ExtractSummary, StagingCollection};
use futures::future::try_join_all;
use serde_json::Value;
use tracing::{debug, info, instrument};

use crate::errors::EtlError;
use crate::timer::Timer;

/// Pulls every source table into its staging collection.
pub struct Extractor {
    store: Arc<dyn StagingStore>,
    fetcher: Arc<dyn PageFetcher>,
}

impl Extractor {
    pub fn new(store: Arc<dyn StagingStore>, fetcher: Arc<dyn PageFetcher>) -> Self {
        Self { store, fetcher }
    }

    /// Run the extract stage.
    ///
    /// All entity kinds are drained concurrently; within one kind pages are
    /// fetched and stored one after another. The first failure aborts the
    /// stage and leaves the other collections in whatever state they reached.
    #[instrument(skip(self))]
    pub async fn extract(&self) -> Result<ExtractSummary, EtlError> {
        let timer = Timer::start();
        info!("Starting extract");

        let counts = try_join_all(EntityKind::ALL.into_iter().map(|kind| self.extract_kind(kind)))
            .await?;

        let summary = ExtractSummary {
            counts: counts.into_iter().collect(),
            duration: timer.elapsed_ms(),
        };
        info!(counts = ?summary.counts, duration_ms = summary.duration, "Finished extract");
        Ok(summary)
    }

    /// Clear one collection, then stage every page of its table.
    async fn extract_kind(&self, kind: EntityKind) -> Result<(EntityKind, u64), EtlError> {
        let collection = StagingCollection::from(kind);
        let removed = self.store.delete_many(collection, &Filter::all()).await?;
        debug!(collection = %collection, removed, "Cleared staged records");

        let mut reader = PageReader::new(self.fetcher.clone(), self.fetcher.table_url(kind));
        let mut count: u64 = 0;
        while let Some(batch) = reader.next_page().await? {
            if batch.is_empty() {
                continue;
            }
            let documents: Vec<Value> = batch.into_iter().map(Value::Object).collect();
            self.store.insert_many(collection, &documents).await?;
            count += documents.len() as u64;
            debug!(collection = %collection, added = documents.len(), total = count, "Staged page");
        }

        info!(collection = %collection, count, "Table extracted");
        Ok((kind, count))
    }
}
