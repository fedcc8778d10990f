//! OpenSearch implementation of the search index provider.
//!
//! This module provides a concrete implementation of `SearchIndexProvider`
//! using OpenSearch as the backend, and the fixed sequence-centric mapping.

mod index_config;
mod provider;

pub use index_config::{sequence_centric_mapping, SearchClusterConfig};
pub use provider::OpenSearchProvider;
