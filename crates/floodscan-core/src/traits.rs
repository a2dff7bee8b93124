use std::future::Future;
use std::time::Duration;

use crate::error::AppError;

/// One listing entry on a search-results page.
///
/// Field lookups are scoped to the block: `selector` is matched against the
/// block's descendants.
pub trait ResultBlock: Send + Sync {
    /// Trimmed text of the first element matching `selector`.
    ///
    /// Returns [`AppError::ElementNotFound`] when nothing matches.
    fn text(&self, selector: &str) -> impl Future<Output = Result<String, AppError>> + Send;

    /// Value of attribute `name` on the first element matching `selector`,
    /// or on the block itself when `selector` is `None`.
    ///
    /// A missing element is [`AppError::ElementNotFound`]; a present element
    /// without the attribute is `Ok(None)`.
    fn attribute(
        &self,
        selector: Option<&str>,
        name: &str,
    ) -> impl Future<Output = Result<Option<String>, AppError>> + Send;
}

/// A live page-provider session (one browser tab, one HTTP client, ...).
///
/// Sessions are stateful and serve one load at a time.
pub trait PageSession: Send {
    type Block: ResultBlock;

    /// Navigate to `url`.
    fn load(&mut self, url: &str) -> impl Future<Output = Result<(), AppError>> + Send;

    /// Wait until at least one element matches `selector` on the loaded
    /// page and return all matches.
    ///
    /// Implementations return [`AppError::Timeout`] once `timeout` elapses,
    /// or `Ok(vec![])` if the page can never produce blocks.
    fn wait_for_blocks(
        &mut self,
        selector: &str,
        timeout: Duration,
    ) -> impl Future<Output = Result<Vec<Self::Block>, AppError>> + Send;

    /// Release the session's resources.
    fn close(self) -> impl Future<Output = Result<(), AppError>> + Send;
}

/// Opens a fresh [`PageSession`] per pipeline run.
pub trait SessionFactory: Send + Sync + Clone {
    type Session: PageSession;

    fn open(&self) -> impl Future<Output = Result<Self::Session, AppError>> + Send;
}
