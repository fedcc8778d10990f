use async_trait::async_trait;
use centric_etl_shared::EntityKind;

use crate::errors::SourceError;
use crate::types::Page;

/// Fetches single pages from the paginated source API.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// URL of the first page of the table holding `kind`.
    fn table_url(&self, kind: EntityKind) -> String;

    /// Fetch and decode the page at `url`.
    ///
    /// Transport failures, non-success statuses and undecodable bodies are
    /// all reported as `SourceError`. No retry is attempted.
    async fn fetch_page(&self, url: &str) -> Result<Page, SourceError>;
}
