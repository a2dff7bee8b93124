use url::Url;

use crate::error::AppError;
use crate::models::{NO_SUMMARY, Record};
use crate::site::{SelectorMap, SiteProfile};
use crate::traits::ResultBlock;

/// Turns result blocks into [`Record`]s with per-field fallbacks.
///
/// Title and link form one required unit; summary and publish time degrade
/// to defaults. No error leaves [`RecordExtractor::extract`].
#[derive(Debug, Clone)]
pub struct RecordExtractor {
    selectors: SelectorMap,
    base: Option<Url>,
    source: String,
}

impl RecordExtractor {
    pub fn new(site: &SiteProfile) -> Self {
        Self {
            selectors: site.selectors.clone(),
            base: site.base(),
            source: site.name.clone(),
        }
    }

    /// Extract one block, or `None` if it lacks a usable title and link.
    pub async fn extract<B: ResultBlock>(&self, block: &B, index: usize) -> Option<Record> {
        let (title, link) = match self.title_and_link(block).await {
            Ok(pair) => pair,
            Err(e) => {
                tracing::warn!(index, error = %e, "Skipping result block without title/link");
                return None;
            }
        };

        let summary = match block.text(&self.selectors.summary).await {
            Ok(text) => text,
            Err(e) => {
                tracing::debug!(index, error = %e, "No summary, using placeholder");
                NO_SUMMARY.to_string()
            }
        };

        let published_at = self.published_at(block, index).await;

        Some(Record {
            index,
            title,
            link,
            summary,
            published_at,
            source: self.source.clone(),
        })
    }

    async fn title_and_link<B: ResultBlock>(&self, block: &B) -> Result<(String, String), AppError> {
        let selector = &self.selectors.title_link;
        let title = block.text(selector).await?;
        if title.is_empty() {
            return Err(AppError::Generic(format!("empty title at '{selector}'")));
        }

        let href = block
            .attribute(Some(selector), &self.selectors.link_attribute)
            .await?
            .map(|h| h.trim().to_string())
            .filter(|h| !h.is_empty())
            .ok_or_else(|| {
                AppError::Generic(format!(
                    "missing '{}' attribute at '{selector}'",
                    self.selectors.link_attribute
                ))
            })?;

        Ok((title, self.resolve_link(&href)))
    }

    fn resolve_link(&self, href: &str) -> String {
        match &self.base {
            Some(base) => base
                .join(href)
                .map(|u| u.to_string())
                .unwrap_or_else(|_| href.to_string()),
            None => href.to_string(),
        }
    }

    async fn published_at<B: ResultBlock>(
        &self,
        block: &B,
        index: usize,
    ) -> Option<chrono::DateTime<chrono::FixedOffset>> {
        let attr = self.selectors.timestamp_attribute.as_deref()?;
        let raw = match block
            .attribute(self.selectors.timestamp_selector.as_deref(), attr)
            .await
        {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                tracing::debug!(index, attr, "No publish time attribute");
                return None;
            }
            Err(e) => {
                tracing::debug!(index, error = %e, "Could not read publish time");
                return None;
            }
        };

        let parsed = self.selectors.timestamp_format.parse(&raw);
        if parsed.is_none() {
            tracing::debug!(index, value = %raw, "Unparseable publish time");
        }
        parsed
    }
}
