//! Per-site search configuration.
//!
//! Everything that differs between news sites (search URL shape, CSS
//! selectors, where the publish time lives) is data in a [`SiteProfile`],
//! so a single pipeline serves every site. Profiles are either built in
//! ([`builtin_sites`]) or loaded from a JSON array file ([`load_sites`]).

use std::path::Path;

use url::Url;
use url::form_urlencoded::byte_serialize;

use crate::dates::{parse_date_label, parse_epoch_seconds};
use crate::error::AppError;

const QUERY_PLACEHOLDER: &str = "{query}";
const PAGE_PLACEHOLDER: &str = "{page}";

/// Selector keys for the fields of one result block.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SelectorMap {
    /// Matches every result block on a search page.
    pub block: String,
    /// Element whose text is the title and whose attribute is the link.
    pub title_link: String,
    #[serde(default = "default_link_attribute")]
    pub link_attribute: String,
    pub summary: String,
    /// Attribute holding the publish time, if the site exposes one.
    #[serde(default)]
    pub timestamp_attribute: Option<String>,
    /// Element carrying `timestamp_attribute`; the block itself when absent.
    #[serde(default)]
    pub timestamp_selector: Option<String>,
    #[serde(default)]
    pub timestamp_format: TimestampFormat,
}

/// How the raw publish-time attribute is encoded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimestampFormat {
    /// Unix epoch seconds, e.g. `1762326000`.
    #[default]
    EpochSeconds,
    /// A `yyyyMMdd` prefix, e.g. `20251105103015927`; day precision.
    DateLabel,
}

impl TimestampFormat {
    pub fn parse(self, raw: &str) -> Option<chrono::DateTime<chrono::FixedOffset>> {
        match self {
            Self::EpochSeconds => parse_epoch_seconds(raw),
            Self::DateLabel => parse_date_label(raw),
        }
    }
}

fn default_link_attribute() -> String {
    "href".to_string()
}

/// Search configuration for one news site.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SiteProfile {
    /// Short identifier, e.g. `"vnexpress"`.
    pub name: String,
    /// Search URL with `{query}` and `{page}` placeholders.
    pub search_url: String,
    /// Topic words put in front of the location when searching.
    #[serde(default)]
    pub search_prefix: String,
    /// Base for resolving relative article links.
    #[serde(default)]
    pub base_url: Option<String>,
    pub selectors: SelectorMap,
}

impl SiteProfile {
    /// Reject profiles the pipeline cannot use.
    pub fn validate(&self) -> Result<(), AppError> {
        let err = |msg: String| Err(AppError::ConfigError(format!("site '{}': {msg}", self.name)));

        if self.name.trim().is_empty() {
            return Err(AppError::ConfigError("site name must not be empty".into()));
        }
        for placeholder in [QUERY_PLACEHOLDER, PAGE_PLACEHOLDER] {
            if !self.search_url.contains(placeholder) {
                return err(format!("search_url is missing {placeholder}"));
            }
        }
        let required = [
            ("block", &self.selectors.block),
            ("title_link", &self.selectors.title_link),
            ("link_attribute", &self.selectors.link_attribute),
            ("summary", &self.selectors.summary),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return err(format!("selector '{field}' must not be empty"));
            }
        }
        if let Some(base) = &self.base_url {
            if let Err(e) = Url::parse(base) {
                return err(format!("invalid base_url '{base}': {e}"));
            }
        }
        Ok(())
    }

    /// Search terms sent to the site for a location.
    pub fn search_terms(&self, location: &str) -> String {
        format!("{} {}", self.search_prefix.trim(), location.trim())
            .trim()
            .to_string()
    }

    /// URL of result page `page` (1-based) for `location`.
    pub fn page_url(&self, location: &str, page: u32) -> String {
        let encoded: String = byte_serialize(self.search_terms(location).as_bytes()).collect();
        self.search_url
            .replace(QUERY_PLACEHOLDER, &encoded)
            .replace(PAGE_PLACEHOLDER, &page.to_string())
    }

    /// Parsed `base_url`, if configured and valid.
    pub fn base(&self) -> Option<Url> {
        self.base_url.as_deref().and_then(|b| Url::parse(b).ok())
    }
}

/// Profiles for the sites floodscan supports out of the box.
pub fn builtin_sites() -> Vec<SiteProfile> {
    vec![
        SiteProfile {
            name: "vnexpress".into(),
            search_url: "https://timkiem.vnexpress.net/?q={query}&page={page}".into(),
            search_prefix: "bão lũ".into(),
            base_url: Some("https://vnexpress.net".into()),
            selectors: SelectorMap {
                block: "article.item-news".into(),
                title_link: "h3.title-news a".into(),
                link_attribute: default_link_attribute(),
                summary: "p.description".into(),
                timestamp_attribute: Some("data-publishtime".into()),
                timestamp_selector: None,
                timestamp_format: TimestampFormat::EpochSeconds,
            },
        },
        SiteProfile {
            name: "dantri".into(),
            search_url: "https://dantri.com.vn/tim-kiem/{query}.htm?date=21&pi={page}".into(),
            search_prefix: "bão lũ".into(),
            base_url: Some("https://dantri.com.vn".into()),
            selectors: SelectorMap {
                block: ".article-item".into(),
                title_link: ".dt-text-black-mine".into(),
                link_attribute: default_link_attribute(),
                summary: ".article-excerpt".into(),
                timestamp_attribute: Some("data-id".into()),
                timestamp_selector: Some(".article-excerpt span".into()),
                timestamp_format: TimestampFormat::DateLabel,
            },
        },
    ]
}

/// Load and validate a JSON array of site profiles.
pub fn load_sites(path: &Path) -> Result<Vec<SiteProfile>, AppError> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        AppError::ConfigError(format!("Failed to read sites file {}: {e}", path.display()))
    })?;
    let sites: Vec<SiteProfile> = serde_json::from_str(&raw)?;
    if sites.is_empty() {
        return Err(AppError::ConfigError(format!(
            "sites file {} contains no profiles",
            path.display()
        )));
    }
    for site in &sites {
        site.validate()?;
    }
    tracing::debug!(count = sites.len(), path = %path.display(), "Loaded site profiles");
    Ok(sites)
}

/// Find a profile by case-insensitive name.
pub fn find_site<'a>(sites: &'a [SiteProfile], name: &str) -> Result<&'a SiteProfile, AppError> {
    sites
        .iter()
        .find(|s| s.name.eq_ignore_ascii_case(name.trim()))
        .ok_or_else(|| {
            let known: Vec<&str> = sites.iter().map(|s| s.name.as_str()).collect();
            AppError::ConfigError(format!(
                "unknown site '{name}' (available: {})",
                known.join(", ")
            ))
        })
}
