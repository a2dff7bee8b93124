use tokio_util::sync::CancellationToken;

use crate::extract::RecordExtractor;
use crate::fetch::PageFetcher;
use crate::models::{Record, SearchQuery};
use crate::site::SiteProfile;
use crate::traits::PageSession;

/// Walks pages `1..=pages` of one search, in order, over a single session.
///
/// An empty or failing page contributes no records; the crawl always
/// continues to the next page.
#[derive(Debug, Clone)]
pub struct Paginator {
    site: SiteProfile,
    fetcher: PageFetcher,
    extractor: RecordExtractor,
}

impl Paginator {
    pub fn new(site: SiteProfile, fetcher: PageFetcher) -> Self {
        let extractor = RecordExtractor::new(&site);
        Self {
            site,
            fetcher,
            extractor,
        }
    }

    /// Collect every extractable record across all pages, page order first,
    /// then block order. Stops early (returning what it has) on cancellation.
    pub async fn crawl<S: PageSession>(
        &self,
        session: &mut S,
        query: &SearchQuery,
        cancel: &CancellationToken,
    ) -> Vec<Record> {
        let mut records = Vec::new();

        for page in 1..=query.pages() {
            if cancel.is_cancelled() {
                tracing::warn!(page, collected = records.len(), "Crawl cancelled");
                break;
            }

            let url = self.site.page_url(query.location(), page);
            tracing::info!(site = %self.site.name, page, %url, "Fetching page");

            let blocks = self
                .fetcher
                .fetch(session, &url, &self.site.selectors.block, cancel)
                .await;

            let before = records.len();
            for block in &blocks {
                if let Some(record) = self.extractor.extract(block, records.len() + 1).await {
                    records.push(record);
                }
            }

            tracing::info!(
                page,
                blocks = blocks.len(),
                extracted = records.len() - before,
                "Page done"
            );
        }

        records
    }
}
