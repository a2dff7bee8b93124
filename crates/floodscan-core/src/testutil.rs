//! Test utilities: mock implementations of the page-provider traits.
//!
//! Handwritten mocks for dependency injection in unit tests.
//! All mocks use `Arc<Mutex<_>>` for interior mutability, allowing
//! test assertions on recorded calls.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::error::AppError;
use crate::site::{SelectorMap, SiteProfile, TimestampFormat};
use crate::traits::{PageSession, ResultBlock, SessionFactory};

pub const BLOCK: &str = "div.item";
pub const TITLE_LINK: &str = "a.title";
pub const SUMMARY: &str = "p.summary";
pub const TIMESTAMP_ATTR: &str = "data-time";

/// Site profile whose selectors match [`MockBlock::article`].
pub fn test_site() -> SiteProfile {
    SiteProfile {
        name: "mock".into(),
        search_url: "https://news.test/search?q={query}&page={page}".into(),
        search_prefix: "bão lũ".into(),
        base_url: Some("https://news.test".into()),
        selectors: SelectorMap {
            block: BLOCK.into(),
            title_link: TITLE_LINK.into(),
            link_attribute: "href".into(),
            summary: SUMMARY.into(),
            timestamp_attribute: Some(TIMESTAMP_ATTR.into()),
            timestamp_selector: None,
            timestamp_format: TimestampFormat::EpochSeconds,
        },
    }
}

// ---------------------------------------------------------------------------
// MockBlock
// ---------------------------------------------------------------------------

/// In-memory result block keyed by selector.
#[derive(Debug, Clone, Default)]
pub struct MockBlock {
    texts: HashMap<String, String>,
    attrs: HashMap<(Option<String>, String), String>,
    /// When set, every lookup fails with this message.
    broken: Option<String>,
}

impl MockBlock {
    pub fn new() -> Self {
        Self::default()
    }

    /// A complete block for [`test_site`].
    pub fn article(title: &str, href: &str, summary: &str) -> Self {
        Self::new()
            .with_text(TITLE_LINK, title)
            .with_attr(Some(TITLE_LINK), "href", href)
            .with_text(SUMMARY, summary)
    }

    /// A block that fails every lookup with a browser error.
    pub fn broken(message: &str) -> Self {
        Self {
            broken: Some(message.to_string()),
            ..Self::default()
        }
    }

    pub fn with_text(mut self, selector: &str, text: &str) -> Self {
        self.texts.insert(selector.to_string(), text.to_string());
        self
    }

    pub fn with_attr(mut self, selector: Option<&str>, name: &str, value: &str) -> Self {
        if let Some(sel) = selector {
            self.texts.entry(sel.to_string()).or_default();
        }
        self.attrs.insert(
            (selector.map(str::to_string), name.to_string()),
            value.to_string(),
        );
        self
    }

    pub fn with_timestamp(self, raw: &str) -> Self {
        self.with_attr(None, TIMESTAMP_ATTR, raw)
    }

    pub fn without(mut self, selector: &str) -> Self {
        self.texts.remove(selector);
        self.attrs.retain(|(sel, _), _| sel.as_deref() != Some(selector));
        self
    }
}

impl ResultBlock for MockBlock {
    async fn text(&self, selector: &str) -> Result<String, AppError> {
        if let Some(msg) = &self.broken {
            return Err(AppError::BrowserError(msg.clone()));
        }
        self.texts
            .get(selector)
            .map(|t| t.trim().to_string())
            .ok_or_else(|| AppError::element_not_found(selector))
    }

    async fn attribute(&self, selector: Option<&str>, name: &str) -> Result<Option<String>, AppError> {
        if let Some(msg) = &self.broken {
            return Err(AppError::BrowserError(msg.clone()));
        }
        if let Some(sel) = selector {
            if !self.texts.contains_key(sel) {
                return Err(AppError::element_not_found(sel));
            }
        }
        Ok(self
            .attrs
            .get(&(selector.map(str::to_string), name.to_string()))
            .cloned())
    }
}

// ---------------------------------------------------------------------------
// MockSession / MockSessionFactory
// ---------------------------------------------------------------------------

/// What one `wait_for_blocks` call produces.
#[derive(Debug)]
pub enum MockPage {
    Blocks(Vec<MockBlock>),
    Error(AppError),
    /// Never resolves; exercises timeouts and cancellation.
    Hang,
}

#[derive(Default)]
struct SessionState {
    pages: VecDeque<MockPage>,
    load_errors: VecDeque<Option<AppError>>,
    loads: Vec<String>,
    opened: usize,
    closed: usize,
}

/// Mock session factory. Every session it opens shares one scripted state,
/// so tests can inspect loads and close counts afterwards.
#[derive(Clone, Default)]
pub struct MockSessionFactory {
    state: Arc<Mutex<SessionState>>,
    open_error: Arc<Mutex<Option<AppError>>>,
}

impl MockSessionFactory {
    /// Each entry answers one `wait_for_blocks` call, in order. Once the
    /// script runs out, pages are empty.
    pub fn with_pages(pages: Vec<MockPage>) -> Self {
        let factory = Self::default();
        factory.state.lock().unwrap().pages = pages.into();
        factory
    }

    pub fn with_open_error(error: AppError) -> Self {
        let factory = Self::default();
        *factory.open_error.lock().unwrap() = Some(error);
        factory
    }

    /// Script the outcome of successive `load` calls (`None` = success).
    pub fn with_load_errors(self, errors: Vec<Option<AppError>>) -> Self {
        self.state.lock().unwrap().load_errors = errors.into();
        self
    }

    pub fn loads(&self) -> Vec<String> {
        self.state.lock().unwrap().loads.clone()
    }

    pub fn opened(&self) -> usize {
        self.state.lock().unwrap().opened
    }

    pub fn closed(&self) -> usize {
        self.state.lock().unwrap().closed
    }

    /// A session sharing this factory's state without counting as opened.
    pub fn session(&self) -> MockSession {
        MockSession {
            state: Arc::clone(&self.state),
        }
    }
}

impl SessionFactory for MockSessionFactory {
    type Session = MockSession;

    async fn open(&self) -> Result<MockSession, AppError> {
        if let Some(e) = self.open_error.lock().unwrap().take() {
            return Err(e);
        }
        self.state.lock().unwrap().opened += 1;
        Ok(self.session())
    }
}

pub struct MockSession {
    state: Arc<Mutex<SessionState>>,
}

impl PageSession for MockSession {
    type Block = MockBlock;

    async fn load(&mut self, url: &str) -> Result<(), AppError> {
        let mut state = self.state.lock().unwrap();
        state.loads.push(url.to_string());
        match state.load_errors.pop_front().flatten() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    async fn wait_for_blocks(
        &mut self,
        _selector: &str,
        _timeout: Duration,
    ) -> Result<Vec<MockBlock>, AppError> {
        let next = self.state.lock().unwrap().pages.pop_front();
        match next {
            Some(MockPage::Blocks(blocks)) => Ok(blocks),
            Some(MockPage::Error(e)) => Err(e),
            Some(MockPage::Hang) => std::future::pending().await,
            None => Ok(Vec::new()),
        }
    }

    async fn close(self) -> Result<(), AppError> {
        self.state.lock().unwrap().closed += 1;
        Ok(())
    }
}

/// `n` distinct flood-related articles, titled `"{prefix} {i}"`.
pub fn flood_articles(prefix: &str, n: usize) -> Vec<MockBlock> {
    (1..=n)
        .map(|i| {
            MockBlock::article(
                &format!("{prefix} {i}: mưa lũ"),
                &format!("/{prefix}-{i}.html"),
                "Nước dâng cao",
            )
        })
        .collect()
}
