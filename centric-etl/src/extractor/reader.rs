//! Pull iterator over the pages of one source table.

use std::sync::Arc;

use centric_etl_repository::{PageFetcher, SourceError};
use centric_etl_shared::Record;

/// Drains one table page by page.
///
/// Holds at most one page: the caller receives each batch and the reader only
/// keeps the link to the next one. The reader is not restartable; once it has
/// returned `None` or an error, every further call returns `None`.
pub struct PageReader {
    fetcher: Arc<dyn PageFetcher>,
    next_url: Option<String>,
}

impl PageReader {
    /// Create a reader starting at `start_url`.
    pub fn new(fetcher: Arc<dyn PageFetcher>, start_url: impl Into<String>) -> Self {
        Self {
            fetcher,
            next_url: Some(start_url.into()),
        }
    }

    /// Fetch the next page.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(batch))` - The rows of the next page, possibly empty
    /// * `Ok(None)` - The previous page carried no next link
    /// * `Err(SourceError)` - The page could not be fetched or decoded
    pub async fn next_page(&mut self) -> Result<Option<Vec<Record>>, SourceError> {
        let Some(url) = self.next_url.take() else {
            return Ok(None);
        };
        let page = self.fetcher.fetch_page(&url).await?;
        self.next_url = page
            .pagination
            .next_page_url
            .filter(|next| !next.is_empty());
        Ok(Some(page.data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use centric_etl_repository::types::{Page, Pagination};
    use centric_etl_shared::EntityKind;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Serves fixed pages keyed by URL and records every request.
    struct MockFetcher {
        pages: HashMap<String, (usize, Option<String>)>,
        requested: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl PageFetcher for MockFetcher {
        fn table_url(&self, kind: EntityKind) -> String {
            format!("mock://{}", kind.table_name())
        }

        async fn fetch_page(&self, url: &str) -> Result<Page, SourceError> {
            self.requested.lock().unwrap().push(url.to_string());
            let (rows, next) = self
                .pages
                .get(url)
                .cloned()
                .ok_or_else(|| SourceError::decode(url, "unknown page"))?;
            Ok(Page {
                data: (0..rows)
                    .map(|i| json!({"row": i}).as_object().cloned().unwrap())
                    .collect(),
                pagination: Pagination {
                    next_page_url: next,
                },
            })
        }
    }

    fn fetcher(pages: &[(&str, usize, Option<&str>)]) -> Arc<MockFetcher> {
        Arc::new(MockFetcher {
            pages: pages
                .iter()
                .map(|(url, rows, next)| (url.to_string(), (*rows, next.map(String::from))))
                .collect(),
            requested: Mutex::new(Vec::new()),
        })
    }

    #[tokio::test]
    async fn test_follows_next_links_until_absent() {
        let fetcher = fetcher(&[("p1", 2, Some("p2")), ("p2", 0, Some("p3")), ("p3", 1, None)]);
        let mut reader = PageReader::new(fetcher.clone(), "p1");

        let mut sizes = Vec::new();
        while let Some(batch) = reader.next_page().await.unwrap() {
            sizes.push(batch.len());
        }

        assert_eq!(sizes, vec![2, 0, 1]);
        assert_eq!(*fetcher.requested.lock().unwrap(), vec!["p1", "p2", "p3"]);
        assert!(reader.next_page().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_error_ends_the_reader() {
        let fetcher = fetcher(&[("p1", 1, Some("missing"))]);
        let mut reader = PageReader::new(fetcher.clone(), "p1");

        assert!(reader.next_page().await.unwrap().is_some());
        assert!(reader.next_page().await.is_err());
        assert!(reader.next_page().await.unwrap().is_none());
        assert_eq!(fetcher.requested.lock().unwrap().len(), 2);
    }
}
