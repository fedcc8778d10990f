//! Interface definitions for the external collaborators.
//!
//! Every collaborator sits behind a trait so the pipeline can be driven by
//! fakes in tests and by the concrete adapters in production.

mod index_registry;
mod page_fetcher;
mod search_index_provider;
mod staging_store;

pub use index_registry::IndexRegistry;
pub use page_fetcher::PageFetcher;
pub use search_index_provider::SearchIndexProvider;
pub use staging_store::{DocumentStream, StagingStore, StoreConnector};
