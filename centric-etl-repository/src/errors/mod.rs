//! Error types for the ETL repository.
//!
//! One error type per external collaborator: the staging store, the source
//! API, the index registry and the search cluster.

mod lifecycle_error;
mod registry_error;
mod search_index_error;
mod source_error;
mod staging_store_error;

pub use lifecycle_error::LifecycleError;
pub use registry_error::RegistryError;
pub use search_index_error::SearchIndexError;
pub use source_error::SourceError;
pub use staging_store_error::StagingStoreError;
