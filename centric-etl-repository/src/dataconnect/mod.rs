//! Data Connect API client.
//!
//! Each source table is exposed at
//! `{host}/table/{prefix}.{table}_table/data` and returns pages of rows plus
//! an optional link to the next page.

use async_trait::async_trait;
use centric_etl_shared::EntityKind;
use reqwest::Client as ReqwestClient;
use tracing::debug;

use crate::errors::SourceError;
use crate::interfaces::PageFetcher;
use crate::types::Page;
use crate::utils::{join_url, resolve_url};

/// Default table namespace of the COVID cloud dataset.
pub const DEFAULT_TABLE_PREFIX: &str = "viralai2.oicr_covidcloud";

/// Production page fetcher over HTTP.
///
/// # Example
///
/// ```ignore
/// use centric_etl_repository::dataconnect::{DataConnectClient, DEFAULT_TABLE_PREFIX};
///
/// let client = DataConnectClient::new("https://collection.example.org", DEFAULT_TABLE_PREFIX);
/// let page = client.fetch_page(&client.table_url(EntityKind::Host)).await?;
/// ```
pub struct DataConnectClient {
    host: String,
    table_prefix: String,
    client: ReqwestClient,
}

impl DataConnectClient {
    pub fn new(host: impl Into<String>, table_prefix: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            table_prefix: table_prefix.into(),
            client: ReqwestClient::new(),
        }
    }
}

#[async_trait]
impl PageFetcher for DataConnectClient {
    fn table_url(&self, kind: EntityKind) -> String {
        join_url(
            &self.host,
            &format!("table/{}.{}_table/data", self.table_prefix, kind.table_name()),
        )
    }

    async fn fetch_page(&self, url: &str) -> Result<Page, SourceError> {
        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| SourceError::transport(url, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let mut page: Page = response
            .json()
            .await
            .map_err(|e| SourceError::decode(url, e.to_string()))?;

        if let Some(next) = page.pagination.next_page_url.take() {
            page.pagination.next_page_url = Some(resolve_url(url, &next));
        }

        debug!(url = %url, rows = page.data.len(), has_next = page.pagination.next_page_url.is_some(), "Fetched page");
        Ok(page)
    }
}
