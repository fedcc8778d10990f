//! Rollcall index registry client.
//!
//! Rollcall owns index naming: it issues fresh indices on
//! `POST /indices/create` and swaps aliases on `POST /aliases/release`.

use async_trait::async_trait;
use reqwest::Client as ReqwestClient;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{error, info};

use crate::errors::RegistryError;
use crate::interfaces::IndexRegistry;
use crate::types::{CreateIndexRequest, IndexHandle, IndexReleaseRequest};
use crate::utils::join_url;

pub struct RollcallClient {
    host: String,
    client: ReqwestClient,
}

impl RollcallClient {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            client: ReqwestClient::new(),
        }
    }

    async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, RegistryError>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let url = join_url(&self.host, path);
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| RegistryError::request(format!("{}: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(url = %url, status = %status, body = %body, "Registry request failed");
            return Err(RegistryError::StatusError {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| RegistryError::parse(format!("{}: {}", url, e)))
    }
}

#[async_trait]
impl IndexRegistry for RollcallClient {
    async fn create_index(&self, request: &CreateIndexRequest) -> Result<IndexHandle, RegistryError> {
        info!(entity = %request.entity, "Fetching next index");
        let index: IndexHandle = self.post("/indices/create", request).await?;

        if index.index_name.trim().is_empty() {
            return Err(RegistryError::InvalidIndex(format!(
                "empty index name for release {}",
                index.release
            )));
        }

        info!(index = %index.index_name, "New index");
        Ok(index)
    }

    async fn release_alias(&self, request: &IndexReleaseRequest) -> Result<bool, RegistryError> {
        info!(alias = %request.alias, release = %request.release, "Releasing alias");
        self.post("/aliases/release", request).await
    }
}
