use std::time::Duration;

use thiserror::Error;

/// Application-wide error types for floodscan.
#[derive(Error, Debug)]
pub enum AppError {
    /// Missing or invalid configuration (site profile, taxonomy, provider binary).
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Caller-supplied query parameters were rejected before any fetch.
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// A selector matched nothing inside a result block.
    #[error("Element not found: {selector}")]
    ElementNotFound { selector: String },

    /// Waiting for a page or its result blocks timed out.
    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    /// The page provider could not navigate to a URL.
    #[error("Navigation error: {0}")]
    NavigationError(String),

    /// HTTP request failed (static-HTML provider).
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// Network/connection error.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// The headless browser failed outside of navigation.
    #[error("Browser error: {0}")]
    BrowserError(String),

    /// The operation was cancelled by the caller.
    #[error("Operation cancelled")]
    Cancelled,

    /// JSON serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Generic error.
    #[error("{0}")]
    Generic(String),
}

impl AppError {
    /// Returns true if this error is transient and worth retrying.
    ///
    /// Timeouts are deliberately excluded: a page that never shows result
    /// blocks is treated as having no content, not as a flaky load.
    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::NetworkError(_) => true,
            AppError::HttpError(msg) | AppError::NavigationError(msg) => {
                msg.contains("timeout") || msg.contains("connect") || msg.contains("reset")
            }
            _ => false,
        }
    }

    /// Returns true if this error must abort the whole search instead of
    /// skipping one site.
    pub fn is_fatal(&self) -> bool {
        matches!(self, AppError::ConfigError(_) | AppError::InvalidQuery(_))
    }

    pub fn element_not_found(selector: &str) -> Self {
        AppError::ElementNotFound {
            selector: selector.to_string(),
        }
    }
}
