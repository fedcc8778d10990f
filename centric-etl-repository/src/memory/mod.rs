//! In-memory staging store.
//!
//! Used to drive the pipeline without a database. Documents survive across
//! sessions for as long as the connector lives, which mirrors a real store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use centric_etl_shared::StagingCollection;
use futures::stream::{self, StreamExt};
use serde_json::Value;

use crate::errors::StagingStoreError;
use crate::interfaces::{DocumentStream, StagingStore, StoreConnector};
use crate::types::Filter;

/// Staging store keeping every collection in a `Vec` in insertion order.
#[derive(Default)]
pub struct InMemoryStagingStore {
    collections: RwLock<HashMap<StagingCollection, Vec<Value>>>,
    closed: AtomicBool,
    closes: AtomicUsize,
}

impl InMemoryStagingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every document currently in `collection`.
    pub fn documents(&self, collection: StagingCollection) -> Vec<Value> {
        self.read().get(&collection).cloned().unwrap_or_default()
    }

    /// Number of documents currently in `collection`.
    pub fn count(&self, collection: StagingCollection) -> usize {
        self.read().get(&collection).map(Vec::len).unwrap_or(0)
    }

    /// Whether the last session handed out has been closed.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// How many times a session over this store has been closed.
    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    fn reopen(&self) {
        self.closed.store(false, Ordering::SeqCst);
    }

    fn ensure_open(&self) -> Result<(), StagingStoreError> {
        if self.is_closed() {
            Err(StagingStoreError::SessionClosed)
        } else {
            Ok(())
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<StagingCollection, Vec<Value>>> {
        self.collections
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<StagingCollection, Vec<Value>>> {
        self.collections
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn ensure_object(document: &Value) -> Result<(), StagingStoreError> {
    if document.is_object() {
        Ok(())
    } else {
        Err(StagingStoreError::invalid_document(
            "staged documents must be JSON objects",
        ))
    }
}

#[async_trait]
impl StagingStore for InMemoryStagingStore {
    async fn delete_many(
        &self,
        collection: StagingCollection,
        filter: &Filter,
    ) -> Result<u64, StagingStoreError> {
        self.ensure_open()?;
        let mut collections = self.write();
        let Some(documents) = collections.get_mut(&collection) else {
            return Ok(0);
        };
        let before = documents.len();
        documents.retain(|document| !filter.matches(document));
        Ok((before - documents.len()) as u64)
    }

    async fn insert_many(
        &self,
        collection: StagingCollection,
        documents: &[Value],
    ) -> Result<(), StagingStoreError> {
        self.ensure_open()?;
        for document in documents {
            ensure_object(document)?;
        }
        if documents.is_empty() {
            return Ok(());
        }
        self.write()
            .entry(collection)
            .or_default()
            .extend(documents.iter().cloned());
        Ok(())
    }

    async fn insert_one(
        &self,
        collection: StagingCollection,
        document: &Value,
    ) -> Result<(), StagingStoreError> {
        self.insert_many(collection, std::slice::from_ref(document))
            .await
    }

    fn find(&self, collection: StagingCollection, filter: Filter) -> DocumentStream<'_> {
        if let Err(e) = self.ensure_open() {
            return stream::once(async move { Err(e) }).boxed();
        }
        let matching: Vec<Result<Value, StagingStoreError>> = self
            .read()
            .get(&collection)
            .map(|documents| {
                documents
                    .iter()
                    .filter(|document| filter.matches(document))
                    .cloned()
                    .map(Ok)
                    .collect()
            })
            .unwrap_or_default();
        stream::iter(matching).boxed()
    }

    async fn find_one(
        &self,
        collection: StagingCollection,
        filter: &Filter,
    ) -> Result<Option<Value>, StagingStoreError> {
        self.ensure_open()?;
        Ok(self.read().get(&collection).and_then(|documents| {
            documents
                .iter()
                .find(|document| filter.matches(document))
                .cloned()
        }))
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

/// Connector handing out sessions over one shared [`InMemoryStagingStore`].
#[derive(Clone, Default)]
pub struct InMemoryConnector {
    store: Arc<InMemoryStagingStore>,
    connects: Arc<AtomicUsize>,
}

impl InMemoryConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// The backing store, for inspection.
    pub fn store(&self) -> Arc<InMemoryStagingStore> {
        self.store.clone()
    }

    /// Number of sessions opened so far.
    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StoreConnector for InMemoryConnector {
    async fn connect(&self) -> Result<Arc<dyn StagingStore>, StagingStoreError> {
        self.store.reopen();
        self.connects.fetch_add(1, Ordering::SeqCst);
        Ok(self.store.clone())
    }
}
