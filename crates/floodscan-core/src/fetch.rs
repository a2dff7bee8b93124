use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::AppError;
use crate::traits::PageSession;

/// Retry tuning for page fetches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchConfig {
    /// Extra attempts for a page whose load failed with a retryable error.
    pub max_retries: u32,
    /// Pause before each retry.
    pub retry_backoff: Duration,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_retries: 1,
            retry_backoff: Duration::from_millis(500),
        }
    }
}

impl FetchConfig {
    /// Read configuration from environment variables.
    ///
    /// - `FLOODSCAN_MAX_RETRIES` (optional, defaults to 1)
    /// - `FLOODSCAN_RETRY_BACKOFF_MS` (optional, defaults to 500)
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`FetchConfig::from_env`], reading values through `lookup`.
    pub fn from_lookup<L>(lookup: L) -> Result<Self, AppError>
    where
        L: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let max_retries = match lookup("FLOODSCAN_MAX_RETRIES") {
            None => defaults.max_retries,
            Some(raw) => raw.trim().parse::<u32>().map_err(|_| {
                AppError::ConfigError(format!(
                    "Invalid FLOODSCAN_MAX_RETRIES '{raw}': must be a non-negative integer"
                ))
            })?,
        };

        let retry_backoff = match lookup("FLOODSCAN_RETRY_BACKOFF_MS") {
            None => defaults.retry_backoff,
            Some(raw) => {
                let ms: u64 = raw.trim().parse().map_err(|_| {
                    AppError::ConfigError(format!(
                        "Invalid FLOODSCAN_RETRY_BACKOFF_MS '{raw}': must be milliseconds"
                    ))
                })?;
                Duration::from_millis(ms)
            }
        };

        Ok(Self {
            max_retries,
            retry_backoff,
        })
    }
}

/// Loads one search page and waits for its result blocks.
///
/// Every failure is absorbed here: a page that times out, errors, or is
/// cancelled yields no blocks, so one bad page never aborts a crawl.
#[derive(Debug, Clone)]
pub struct PageFetcher {
    timeout: Duration,
    config: FetchConfig,
}

impl PageFetcher {
    pub fn new(timeout: Duration, config: FetchConfig) -> Self {
        Self { timeout, config }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn fetch<S: PageSession>(
        &self,
        session: &mut S,
        url: &str,
        block_selector: &str,
        cancel: &CancellationToken,
    ) -> Vec<S::Block> {
        let mut attempt = 0;
        loop {
            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(AppError::Cancelled),
                r = self.try_fetch(session, url, block_selector) => r,
            };

            match outcome {
                Ok(blocks) => {
                    if blocks.is_empty() {
                        tracing::warn!(%url, "No result blocks on page");
                    } else {
                        tracing::debug!(%url, count = blocks.len(), "Found result blocks");
                    }
                    return blocks;
                }
                Err(AppError::Timeout(after)) => {
                    tracing::warn!(%url, timeout = ?after, "Timed out waiting for results: no content at this page");
                    return Vec::new();
                }
                Err(AppError::Cancelled) => {
                    tracing::info!(%url, "Page fetch cancelled");
                    return Vec::new();
                }
                Err(e) if e.is_retryable() && attempt < self.config.max_retries => {
                    attempt += 1;
                    tracing::warn!(%url, error = %e, attempt, "Page fetch failed, retrying");
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return Vec::new(),
                        _ = tokio::time::sleep(self.config.retry_backoff) => {}
                    }
                }
                Err(e) => {
                    tracing::error!(%url, error = %e, "Page fetch failed");
                    return Vec::new();
                }
            }
        }
    }

    async fn try_fetch<S: PageSession>(
        &self,
        session: &mut S,
        url: &str,
        block_selector: &str,
    ) -> Result<Vec<S::Block>, AppError> {
        let limit = self.timeout;

        tokio::time::timeout(limit, session.load(url))
            .await
            .map_err(|_| AppError::Timeout(limit))??;

        tokio::time::timeout(
            self.timeout,
            session.wait_for_blocks(block_selector, self.timeout),
        )
        .await
        .map_err(|_| AppError::Timeout(limit))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::*;

    fn fetcher() -> PageFetcher {
        PageFetcher::new(
            Duration::from_millis(100),
            FetchConfig {
                max_retries: 2,
                retry_backoff: Duration::from_millis(1),
            },
        )
    }

    #[test]
    fn test_config_defaults() {
        let config = FetchConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config, FetchConfig::default());
    }

    #[test]
    fn test_config_from_lookup() {
        let config = FetchConfig::from_lookup(|key| match key {
            "FLOODSCAN_MAX_RETRIES" => Some("3".into()),
            "FLOODSCAN_RETRY_BACKOFF_MS" => Some(" 250 ".into()),
            _ => None,
        })
        .unwrap();
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.retry_backoff, Duration::from_millis(250));
    }

    #[test]
    fn test_config_rejects_garbage() {
        let err = FetchConfig::from_lookup(|key| {
            (key == "FLOODSCAN_MAX_RETRIES").then(|| "-1".to_string())
        })
        .unwrap_err();
        assert!(matches!(err, AppError::ConfigError(_)));
    }

    #[tokio::test]
    async fn returns_blocks() {
        let factory = MockSessionFactory::with_pages(vec![MockPage::Blocks(flood_articles("a", 2))]);
        let mut session = factory.session();

        let blocks = fetcher()
            .fetch(&mut session, "https://news.test/1", BLOCK, &CancellationToken::new())
            .await;

        assert_eq!(blocks.len(), 2);
        assert_eq!(factory.loads(), vec!["https://news.test/1"]);
    }

    #[tokio::test]
    async fn provider_timeout_yields_empty_without_retry() {
        let factory = MockSessionFactory::with_pages(vec![
            MockPage::Error(AppError::Timeout(Duration::from_secs(10))),
            MockPage::Blocks(flood_articles("never", 1)),
        ]);
        let mut session = factory.session();

        let blocks = fetcher()
            .fetch(&mut session, "https://news.test/1", BLOCK, &CancellationToken::new())
            .await;

        assert!(blocks.is_empty());
        assert_eq!(factory.loads().len(), 1);
    }

    #[tokio::test]
    async fn hung_wait_is_bounded_by_timeout() {
        let factory = MockSessionFactory::with_pages(vec![MockPage::Hang]);
        let mut session = factory.session();

        let blocks = fetcher()
            .fetch(&mut session, "https://news.test/1", BLOCK, &CancellationToken::new())
            .await;

        assert!(blocks.is_empty());
    }

    #[tokio::test]
    async fn retryable_load_error_is_retried() {
        let factory = MockSessionFactory::with_pages(vec![MockPage::Blocks(flood_articles("a", 3))])
            .with_load_errors(vec![Some(AppError::NetworkError("connection reset".into()))]);
        let mut session = factory.session();

        let blocks = fetcher()
            .fetch(&mut session, "https://news.test/1", BLOCK, &CancellationToken::new())
            .await;

        assert_eq!(blocks.len(), 3);
        assert_eq!(factory.loads().len(), 2);
    }

    #[tokio::test]
    async fn retries_are_bounded() {
        let factory = MockSessionFactory::with_pages(vec![]).with_load_errors(vec![
            Some(AppError::NetworkError("down".into())),
            Some(AppError::NetworkError("down".into())),
            Some(AppError::NetworkError("down".into())),
            Some(AppError::NetworkError("down".into())),
        ]);
        let mut session = factory.session();

        let blocks = fetcher()
            .fetch(&mut session, "https://news.test/1", BLOCK, &CancellationToken::new())
            .await;

        assert!(blocks.is_empty());
        // one attempt + two retries
        assert_eq!(factory.loads().len(), 3);
    }

    #[tokio::test]
    async fn non_retryable_error_yields_empty() {
        let factory = MockSessionFactory::with_pages(vec![MockPage::Error(AppError::BrowserError(
            "target crashed".into(),
        ))]);
        let mut session = factory.session();

        let blocks = fetcher()
            .fetch(&mut session, "https://news.test/1", BLOCK, &CancellationToken::new())
            .await;

        assert!(blocks.is_empty());
        assert_eq!(factory.loads().len(), 1);
    }

    #[tokio::test]
    async fn cancellation_interrupts_wait() {
        let factory = MockSessionFactory::with_pages(vec![MockPage::Hang]);
        let mut session = factory.session();
        let cancel = CancellationToken::new();
        let slow = PageFetcher::new(Duration::from_secs(3600), FetchConfig::default());

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let blocks = slow
            .fetch(&mut session, "https://news.test/1", BLOCK, &cancel)
            .await;
        assert!(blocks.is_empty());
    }
}
