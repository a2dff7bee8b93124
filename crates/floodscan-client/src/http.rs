use std::sync::Arc;
use std::time::Duration;

use floodscan_core::error::AppError;
use floodscan_core::traits::{PageSession, ResultBlock, SessionFactory};
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Static-HTML page provider using reqwest and scraper.
///
/// Suitable for sites whose search results are rendered server-side.
/// The HTTP client is shared by all sessions; each session holds only the
/// last loaded document.
#[derive(Clone)]
pub struct HttpSessionFactory {
    client: Client,
    timeout: Duration,
}

impl HttpSessionFactory {
    pub fn new() -> Result<Self, AppError> {
        Self::with_timeout(Duration::from_secs(30))
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, AppError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::HttpError(e.to_string()))?;

        Ok(Self {
            client,
            timeout,
        })
    }
}

impl SessionFactory for HttpSessionFactory {
    type Session = HttpSession;

    async fn open(&self) -> Result<HttpSession, AppError> {
        Ok(HttpSession {
            client: self.client.clone(),
            timeout: self.timeout,
            html: None,
        })
    }
}

pub struct HttpSession {
    client: Client,
    timeout: Duration,
    html: Option<String>,
}

impl PageSession for HttpSession {
    type Block = HtmlBlock;

    async fn load(&mut self, url: &str) -> Result<(), AppError> {
        self.html = None;

        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                AppError::Timeout(self.timeout)
            } else if e.is_connect() {
                AppError::NetworkError(format!("Connection failed: {e}"))
            } else {
                AppError::HttpError(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::HttpError(format!(
                "HTTP {} for {}",
                status.as_u16(),
                url
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| AppError::HttpError(format!("Failed to read response body: {e}")))?;
        tracing::debug!(%url, bytes = body.len(), "Loaded page");
        self.html = Some(body);
        Ok(())
    }

    async fn wait_for_blocks(
        &mut self,
        selector: &str,
        _timeout: Duration,
    ) -> Result<Vec<HtmlBlock>, AppError> {
        // A static document never changes, so there is nothing to wait for.
        let html = self
            .html
            .as_deref()
            .ok_or_else(|| AppError::Generic("no page loaded".into()))?;
        select_blocks(html, selector)
    }

    async fn close(self) -> Result<(), AppError> {
        Ok(())
    }
}

/// One result block, addressed by its position among the page's matches.
///
/// `scraper::Html` is not `Send`, so the block keeps the shared page source
/// and re-selects itself from a freshly parsed document for each lookup.
/// Parsing the whole document keeps the block's real parent context, so
/// table rows and cells survive (a body-context fragment parse drops them).
#[derive(Debug, Clone)]
pub struct HtmlBlock {
    page: Arc<str>,
    block_selector: Arc<str>,
    position: usize,
}

impl HtmlBlock {
    fn with_block<T>(
        &self,
        f: impl FnOnce(ElementRef<'_>) -> Result<T, AppError>,
    ) -> Result<T, AppError> {
        let sel = parse_selector(&self.block_selector)?;
        let document = Html::parse_document(&self.page);
        let block = document
            .select(&sel)
            .nth(self.position)
            .ok_or_else(|| AppError::element_not_found(&self.block_selector))?;
        f(block)
    }

    fn with_first<T>(
        &self,
        selector: &str,
        f: impl FnOnce(ElementRef<'_>) -> T,
    ) -> Result<T, AppError> {
        let sel = parse_selector(selector)?;
        self.with_block(|block| {
            block
                .select(&sel)
                .next()
                .map(f)
                .ok_or_else(|| AppError::element_not_found(selector))
        })
    }
}

impl ResultBlock for HtmlBlock {
    async fn text(&self, selector: &str) -> Result<String, AppError> {
        self.with_first(selector, |el| normalize_whitespace(el.text()))
    }

    async fn attribute(&self, selector: Option<&str>, name: &str) -> Result<Option<String>, AppError> {
        match selector {
            None => self.with_block(|el| Ok(el.value().attr(name).map(str::to_string))),
            Some(sel) => self.with_first(sel, |el| el.value().attr(name).map(str::to_string)),
        }
    }
}

/// Select every element matching `selector` in a full document.
pub fn select_blocks(html: &str, selector: &str) -> Result<Vec<HtmlBlock>, AppError> {
    let sel = parse_selector(selector)?;
    let count = Html::parse_document(html).select(&sel).count();
    let page: Arc<str> = Arc::from(html);
    let block_selector: Arc<str> = Arc::from(selector);
    Ok((0..count)
        .map(|position| HtmlBlock {
            page: Arc::clone(&page),
            block_selector: Arc::clone(&block_selector),
            position,
        })
        .collect())
}

fn parse_selector(selector: &str) -> Result<Selector, AppError> {
    Selector::parse(selector)
        .map_err(|e| AppError::ConfigError(format!("Invalid selector '{selector}': {e}")))
}

fn normalize_whitespace<'a>(parts: impl Iterator<Item = &'a str>) -> String {
    parts
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}
