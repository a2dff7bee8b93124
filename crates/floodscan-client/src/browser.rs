use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chromiumoxide::element::Element;
use chromiumoxide::{Browser, BrowserConfig, Page};
use floodscan_core::error::AppError;
use floodscan_core::traits::{PageSession, ResultBlock, SessionFactory};
use futures::StreamExt;
use tokio::task::JoinHandle;

const POLL_INTERVAL: Duration = Duration::from_millis(250);

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Launch options for the headless browser.
#[derive(Debug, Clone)]
pub struct BrowserOptions {
    /// Explicit Chrome/Chromium binary. Must exist when set.
    pub chrome_bin: Option<PathBuf>,
    pub window_size: (u32, u32),
    pub user_agent: String,
    /// Bound on every CDP request, including navigation.
    pub request_timeout: Duration,
}

impl Default for BrowserOptions {
    fn default() -> Self {
        Self {
            chrome_bin: None,
            window_size: (1920, 1080),
            user_agent: USER_AGENT.to_string(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Headless-browser page provider using Chromium via the Chrome DevTools Protocol.
///
/// Renders JavaScript before result blocks are queried, which the
/// client-rendered search pages need. Each session launches its own
/// Chromium process with one tab; closing the session (or dropping it)
/// shuts the process down.
///
/// # Example
///
/// ```rust,no_run
/// use floodscan_client::{BrowserOptions, BrowserSessionFactory};
/// use floodscan_core::traits::{PageSession, SessionFactory};
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let factory = BrowserSessionFactory::new(BrowserOptions::default())?;
/// let mut session = factory.open().await?;
/// session.load("https://timkiem.vnexpress.net/?q=b%C3%A3o").await?;
/// session.close().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct BrowserSessionFactory {
    options: BrowserOptions,
    chrome_bin: PathBuf,
}

impl BrowserSessionFactory {
    /// Resolve the browser binary up front.
    ///
    /// Fails with [`AppError::ConfigError`] if no Chrome/Chromium can be
    /// found, so callers can report it before running any query.
    pub fn new(options: BrowserOptions) -> Result<Self, AppError> {
        let chrome_bin = match &options.chrome_bin {
            Some(path) if path.exists() => path.clone(),
            Some(path) => {
                return Err(AppError::ConfigError(format!(
                    "Chrome binary not found at {}",
                    path.display()
                )));
            }
            None => find_chrome_binary().ok_or_else(|| {
                AppError::ConfigError(
                    "No Chrome/Chromium binary found; install one or set CHROME_BIN".into(),
                )
            })?,
        };
        tracing::info!("Using Chrome binary: {}", chrome_bin.display());

        Ok(Self {
            options,
            chrome_bin,
        })
    }

    pub fn chrome_bin(&self) -> &Path {
        &self.chrome_bin
    }

    fn config(&self) -> Result<BrowserConfig, AppError> {
        let (width, height) = self.options.window_size;
        BrowserConfig::builder()
            .chrome_executable(&self.chrome_bin)
            .no_sandbox()
            .disable_default_args()
            .request_timeout(self.options.request_timeout)
            .window_size(width, height)
            .arg("--headless=new")
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg("--disable-popup-blocking")
            .arg("--disable-translate")
            .arg("--no-first-run")
            .arg("--disable-blink-features=AutomationControlled")
            .arg(format!("--user-agent={}", self.options.user_agent))
            .build()
            .map_err(|e| AppError::ConfigError(format!("Browser config error: {e}")))
    }
}

impl SessionFactory for BrowserSessionFactory {
    type Session = BrowserSession;

    async fn open(&self) -> Result<BrowserSession, AppError> {
        let (mut browser, mut handler) = Browser::launch(self.config()?)
            .await
            .map_err(|e| AppError::BrowserError(format!("Failed to launch browser: {e}")))?;

        // The CDP handler must be polled continuously for the connection to work.
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    tracing::warn!("Browser CDP handler error: {event:?}");
                    break;
                }
            }
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                let _ = browser.close().await;
                handler_task.abort();
                return Err(AppError::BrowserError(format!("Failed to open tab: {e}")));
            }
        };

        tracing::debug!("Browser session opened");
        Ok(BrowserSession {
            browser,
            page,
            handler_task,
        })
    }
}

/// One Chromium process with a single tab, owned by a pipeline run.
pub struct BrowserSession {
    browser: Browser,
    page: Page,
    handler_task: JoinHandle<()>,
}

impl PageSession for BrowserSession {
    type Block = BrowserBlock;

    async fn load(&mut self, url: &str) -> Result<(), AppError> {
        self.page
            .goto(url)
            .await
            .map_err(|e| AppError::NavigationError(format!("Failed to navigate to {url}: {e}")))?;
        Ok(())
    }

    async fn wait_for_blocks(
        &mut self,
        selector: &str,
        timeout: Duration,
    ) -> Result<Vec<BrowserBlock>, AppError> {
        let deadline = Instant::now() + timeout;
        loop {
            // querySelectorAll errors or comes back empty until content renders
            if let Ok(elements) = self.page.find_elements(selector).await {
                if !elements.is_empty() {
                    return Ok(elements.into_iter().map(BrowserBlock).collect());
                }
            }
            if Instant::now() >= deadline {
                return Err(AppError::Timeout(timeout));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn close(mut self) -> Result<(), AppError> {
        let _ = self.page.clone().close().await;
        self.browser
            .close()
            .await
            .map_err(|e| AppError::BrowserError(format!("Failed to close browser: {e}")))?;
        let _ = self.browser.wait().await;
        tracing::debug!("Browser session closed");
        Ok(())
    }
}

// `Browser` kills its child process on drop; the handler task must go too.
impl Drop for BrowserSession {
    fn drop(&mut self) {
        self.handler_task.abort();
    }
}

/// A result block backed by a live DOM element.
pub struct BrowserBlock(Element);

impl BrowserBlock {
    async fn locate(&self, selector: &str) -> Result<Element, AppError> {
        self.0
            .find_element(selector)
            .await
            .map_err(|_| AppError::element_not_found(selector))
    }
}

impl ResultBlock for BrowserBlock {
    async fn text(&self, selector: &str) -> Result<String, AppError> {
        let element = self.locate(selector).await?;
        let text = element
            .inner_text()
            .await
            .map_err(|e| AppError::BrowserError(format!("Failed to read text of '{selector}': {e}")))?;
        Ok(text.unwrap_or_default().trim().to_string())
    }

    async fn attribute(&self, selector: Option<&str>, name: &str) -> Result<Option<String>, AppError> {
        let value = match selector {
            None => self.0.attribute(name).await,
            Some(sel) => self.locate(sel).await?.attribute(name).await,
        };
        value.map_err(|e| AppError::BrowserError(format!("Failed to read attribute '{name}': {e}")))
    }
}

/// Tries to locate a Chrome/Chromium binary.
///
/// Checks `$CHROME_BIN` first, then the real binary inside a snap install
/// (the `/snap/bin/chromium` wrapper strips headless flags), then
/// well-known system paths, then every directory on `$PATH`.
fn find_chrome_binary() -> Option<PathBuf> {
    if let Ok(p) = std::env::var("CHROME_BIN") {
        let path = PathBuf::from(&p);
        if path.exists() {
            return Some(path);
        }
    }

    let candidates: &[&str] = &[
        // Snap (Ubuntu default)
        "/snap/chromium/current/usr/lib/chromium-browser/chrome",
        // Flatpak
        "/var/lib/flatpak/exports/bin/org.chromium.Chromium",
        // Common apt / manual installs
        "/usr/bin/google-chrome-stable",
        "/usr/bin/google-chrome",
        "/usr/bin/chromium",
        "/usr/bin/chromium-browser",
        // macOS
        "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
        "/Applications/Chromium.app/Contents/MacOS/Chromium",
    ];
    if let Some(found) = candidates.iter().map(PathBuf::from).find(|p| p.exists()) {
        return Some(found);
    }

    let names = ["google-chrome-stable", "google-chrome", "chromium", "chromium-browser", "chrome"];
    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var)
        .flat_map(|dir| names.iter().map(move |n| dir.join(n)))
        .find(|p| p.is_file())
}
