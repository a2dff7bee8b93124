use tokio_util::sync::CancellationToken;

use crate::error::AppError;
use crate::fetch::{FetchConfig, PageFetcher};
use crate::filter::{filter_relevant, filter_time_range};
use crate::models::{QueryParams, Record};
use crate::paginate::Paginator;
use crate::site::SiteProfile;
use crate::taxonomy::Taxonomy;
use crate::traits::{PageSession, SessionFactory};

/// Orchestrates one search: validate → crawl → relevance → time window → renumber.
///
/// Generic over the page provider via [`SessionFactory`], so tests run
/// without a browser or network. Each [`Pipeline::run`] opens its own
/// session and closes it before returning.
pub struct Pipeline<F>
where
    F: SessionFactory,
{
    sessions: F,
    site: SiteProfile,
    taxonomy: Taxonomy,
    fetch_config: FetchConfig,
}

impl<F> Pipeline<F>
where
    F: SessionFactory,
{
    /// Create a pipeline for one site with the built-in flood taxonomy.
    pub fn new(sessions: F, site: SiteProfile) -> Self {
        Self {
            sessions,
            site,
            taxonomy: Taxonomy::flood(),
            fetch_config: FetchConfig::default(),
        }
    }

    pub fn with_taxonomy(mut self, taxonomy: Taxonomy) -> Self {
        self.taxonomy = taxonomy;
        self
    }

    pub fn with_fetch_config(mut self, config: FetchConfig) -> Self {
        self.fetch_config = config;
        self
    }

    pub fn site(&self) -> &SiteProfile {
        &self.site
    }

    /// Run the full pipeline for `params`.
    ///
    /// Only configuration, query and session-startup errors are returned;
    /// page and record failures shrink the result instead. The returned records are indexed
    /// `1..=len` in order.
    pub async fn run(
        &self,
        params: QueryParams,
        cancel: &CancellationToken,
    ) -> Result<Vec<Record>, AppError> {
        // 1. Validate before touching the provider
        let query = params.validate()?;
        self.site.validate()?;

        tracing::info!(
            site = %self.site.name,
            location = %query.location(),
            pages = query.pages(),
            terms = %self.site.search_terms(query.location()),
            "Starting search"
        );

        // 2. Crawl within a scoped session
        let paginator = Paginator::new(
            self.site.clone(),
            PageFetcher::new(query.page_timeout(), self.fetch_config),
        );
        let mut session = self.sessions.open().await?;
        let crawled = paginator.crawl(&mut session, &query, cancel).await;
        if let Err(e) = session.close().await {
            tracing::warn!(error = %e, "Failed to close page session");
        }
        tracing::info!(count = crawled.len(), "Crawl finished");

        // 3. Relevance, then time window; both keep relative order
        let relevant = filter_relevant(crawled, &self.taxonomy, query.required_location());
        let mut records = filter_time_range(relevant, query.range());

        // 4. Renumber survivors
        for (i, record) in records.iter_mut().enumerate() {
            record.index = i + 1;
        }

        tracing::info!(
            site = %self.site.name,
            location = %query.location(),
            count = records.len(),
            "Search complete"
        );
        Ok(records)
    }
}
