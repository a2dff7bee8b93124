use std::time::Duration;

use chrono::{DateTime, FixedOffset};

use crate::error::AppError;

/// Summary used when a result block has no summary element.
pub const NO_SUMMARY: &str = "Không có tóm tắt";

/// One article listing extracted from a search-result block.
///
/// `title` and `link` are never empty. Only the pipeline changes `index`
/// after extraction.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Record {
    /// 1-based position in the list this record currently belongs to.
    pub index: usize,
    pub title: String,
    pub link: String,
    pub summary: String,
    /// Publish time in UTC+7, when the site exposes a parseable one.
    pub published_at: Option<DateTime<FixedOffset>>,
    /// Name of the site profile that produced this record.
    pub source: String,
}

/// Inclusive publish-time window. Either bound may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeRange {
    pub start: Option<DateTime<FixedOffset>>,
    pub end: Option<DateTime<FixedOffset>>,
}

impl TimeRange {
    pub fn new(
        start: Option<DateTime<FixedOffset>>,
        end: Option<DateTime<FixedOffset>>,
    ) -> Result<Self, AppError> {
        if let (Some(s), Some(e)) = (start, end) {
            if s > e {
                return Err(AppError::InvalidQuery(format!(
                    "start date {s} is after end date {e}"
                )));
            }
        }
        Ok(Self { start, end })
    }

    /// A range with no bounds admits everything.
    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }
}

/// Raw, caller-supplied query parameters. Validate with [`QueryParams::validate`].
#[derive(Debug, Clone)]
pub struct QueryParams {
    pub location: String,
    pub pages: u32,
    pub page_timeout: Duration,
    pub start: Option<DateTime<FixedOffset>>,
    pub end: Option<DateTime<FixedOffset>>,
    /// Also require the location itself to appear in title or summary.
    pub require_location: bool,
}

impl QueryParams {
    /// Parameters for `location` with 3 pages, a 10 s per-page timeout and no
    /// time window.
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            pages: 3,
            page_timeout: Duration::from_secs(10),
            start: None,
            end: None,
            require_location: false,
        }
    }

    /// Check every invariant and produce an immutable [`SearchQuery`].
    pub fn validate(self) -> Result<SearchQuery, AppError> {
        let location = self.location.trim().to_string();
        if location.is_empty() {
            return Err(AppError::InvalidQuery("location must not be empty".into()));
        }
        if self.pages == 0 {
            return Err(AppError::InvalidQuery("page count must be at least 1".into()));
        }
        if self.page_timeout.is_zero() {
            return Err(AppError::InvalidQuery(
                "per-page timeout must be greater than zero".into(),
            ));
        }
        let range = TimeRange::new(self.start, self.end)?;

        Ok(SearchQuery {
            location,
            pages: self.pages,
            page_timeout: self.page_timeout,
            range,
            require_location: self.require_location,
        })
    }
}

/// A validated query. Only obtainable through [`QueryParams::validate`].
#[derive(Debug, Clone)]
pub struct SearchQuery {
    location: String,
    pages: u32,
    page_timeout: Duration,
    range: TimeRange,
    require_location: bool,
}

impl SearchQuery {
    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn pages(&self) -> u32 {
        self.pages
    }

    pub fn page_timeout(&self) -> Duration {
        self.page_timeout
    }

    pub fn range(&self) -> &TimeRange {
        &self.range
    }

    /// The location token the relevance filter must also find, if any.
    pub fn required_location(&self) -> Option<&str> {
        self.require_location.then_some(self.location.as_str())
    }
}
