//! OpenSearch provider implementation.
//!
//! This module provides the concrete implementation of `SearchIndexProvider`
//! using the OpenSearch Rust crate.

use async_trait::async_trait;
use opensearch::{
    auth::Credentials,
    http::request::JsonBody,
    http::response::Response,
    http::transport::{SingleNodeConnectionPool, TransportBuilder},
    indices::{IndicesCloseParts, IndicesOpenParts, IndicesPutMappingParts},
    BulkParts, OpenSearch,
};
use serde_json::{json, Value};
use tracing::{debug, error, info};
use url::Url;

use crate::errors::SearchIndexError;
use crate::interfaces::SearchIndexProvider;
use crate::opensearch::index_config::SearchClusterConfig;
use crate::types::BulkDocument;

/// Maximum number of rejected item ids quoted in a bulk error message.
const MAX_REPORTED_FAILURES: usize = 5;

/// OpenSearch provider implementation.
///
/// # Example
///
/// ```ignore
/// use centric_etl_repository::opensearch::{OpenSearchProvider, SearchClusterConfig};
///
/// let config = SearchClusterConfig::new("http://localhost:9200");
/// let provider = OpenSearchProvider::new(&config)?;
/// provider.ping().await?;
/// ```
pub struct OpenSearchProvider {
    client: OpenSearch,
}

impl OpenSearchProvider {
    /// Create a new OpenSearch provider for the configured cluster.
    ///
    /// No request is sent; use [`SearchIndexProvider::ping`] to verify connectivity.
    ///
    /// # Returns
    ///
    /// * `Ok(OpenSearchProvider)` - A new provider instance
    /// * `Err(SearchIndexError)` - If the URL is invalid or the transport cannot be built
    pub fn new(config: &SearchClusterConfig) -> Result<Self, SearchIndexError> {
        let parsed_url =
            Url::parse(&config.url).map_err(|e| SearchIndexError::connection(e.to_string()))?;

        let conn_pool = SingleNodeConnectionPool::new(parsed_url);
        let mut builder = TransportBuilder::new(conn_pool).disable_proxy();
        if let Some((user, password)) = config.credentials() {
            builder = builder.auth(Credentials::Basic(user.to_string(), password.to_string()));
        }
        let transport = builder
            .build()
            .map_err(|e| SearchIndexError::connection(e.to_string()))?;

        info!(
            url = %config.url,
            authenticated = config.credentials().is_some(),
            "Created OpenSearch provider"
        );

        Ok(Self {
            client: OpenSearch::new(transport),
        })
    }

    /// Build the alternating action/document body of a bulk request.
    fn bulk_body(documents: &[BulkDocument]) -> Vec<JsonBody<Value>> {
        let mut body: Vec<JsonBody<Value>> = Vec::with_capacity(documents.len() * 2);
        for document in documents {
            body.push(json!({ "index": { "_id": document.id } }).into());
            body.push(document.source.clone().into());
        }
        body
    }

    /// Collect the ids of rejected items from a bulk response.
    fn failed_items(response: &Value) -> Vec<String> {
        response["items"]
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| {
                        let action = &item["index"];
                        if action.get("error").is_some() {
                            Some(action["_id"].as_str().unwrap_or("<unknown>").to_string())
                        } else {
                            None
                        }
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Turn a non-success response into an error built by `make_error`.
    async fn check_status(
        response: Response,
        operation: &str,
        make_error: fn(String) -> SearchIndexError,
    ) -> Result<Response, SearchIndexError> {
        let status = response.status_code();
        if status.is_success() {
            return Ok(response);
        }
        let error_body = response.text().await.unwrap_or_default();
        error!(status = %status, body = %error_body, operation, "Search cluster request failed");
        Err(make_error(format!(
            "{} failed with status {}: {}",
            operation, status, error_body
        )))
    }
}

#[async_trait]
impl SearchIndexProvider for OpenSearchProvider {
    async fn ping(&self) -> Result<(), SearchIndexError> {
        let response = self
            .client
            .ping()
            .send()
            .await
            .map_err(|e| SearchIndexError::connection(e.to_string()))?;
        Self::check_status(response, "Ping", SearchIndexError::ConnectionError).await?;
        Ok(())
    }

    async fn close_index(&self, index: &str) -> Result<(), SearchIndexError> {
        let response = self
            .client
            .indices()
            .close(IndicesCloseParts::Index(&[index]))
            .send()
            .await
            .map_err(|e| SearchIndexError::admin(e.to_string()))?;
        Self::check_status(response, "Close index", SearchIndexError::AdminError).await?;

        debug!(index = %index, "Index closed");
        Ok(())
    }

    async fn put_mapping(&self, index: &str, mapping: &Value) -> Result<(), SearchIndexError> {
        let response = self
            .client
            .indices()
            .put_mapping(IndicesPutMappingParts::Index(&[index]))
            .body(mapping.clone())
            .send()
            .await
            .map_err(|e| SearchIndexError::mapping(e.to_string()))?;
        Self::check_status(response, "Put mapping", SearchIndexError::MappingError).await?;

        debug!(index = %index, "Mapping applied");
        Ok(())
    }

    async fn open_index(&self, index: &str) -> Result<(), SearchIndexError> {
        let response = self
            .client
            .indices()
            .open(IndicesOpenParts::Index(&[index]))
            .send()
            .await
            .map_err(|e| SearchIndexError::admin(e.to_string()))?;
        Self::check_status(response, "Open index", SearchIndexError::AdminError).await?;

        debug!(index = %index, "Index opened");
        Ok(())
    }

    /// Index documents with a single `_bulk` request.
    ///
    /// A response flagged with `errors: true` fails the whole call; the ids of
    /// the first few rejected documents are quoted in the error.
    async fn bulk_index(
        &self,
        index: &str,
        documents: &[BulkDocument],
    ) -> Result<(), SearchIndexError> {
        if documents.is_empty() {
            return Ok(());
        }

        let response = self
            .client
            .bulk(BulkParts::Index(index))
            .body(Self::bulk_body(documents))
            .send()
            .await
            .map_err(|e| SearchIndexError::bulk_index(e.to_string()))?;
        let response =
            Self::check_status(response, "Bulk index", SearchIndexError::BulkIndexError).await?;

        let body: Value = response
            .json()
            .await
            .map_err(|e| SearchIndexError::parse(e.to_string()))?;

        if body["errors"].as_bool().unwrap_or(false) {
            let failed = Self::failed_items(&body);
            let quoted: Vec<&str> = failed
                .iter()
                .take(MAX_REPORTED_FAILURES)
                .map(|id| id.as_str())
                .collect();
            return Err(SearchIndexError::bulk_index(format!(
                "{} of {} documents rejected by {} (first: {})",
                failed.len(),
                documents.len(),
                index,
                quoted.join(", ")
            )));
        }

        debug!(index = %index, count = documents.len(), "Bulk request indexed");
        Ok(())
    }
}
