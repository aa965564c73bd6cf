//! Shared headless-browser pool for scrapers that need rendered pages.
//!
//! One Chrome process is launched lazily and reused across scrapes. Each
//! scrape gets an isolated browser context (separate cookies and cache,
//! optionally its own proxy), so concurrent sessions cannot leak state
//! into each other. The context is disposed when the session closes.

#[cfg(feature = "browser")]
use std::path::PathBuf;
#[cfg(feature = "browser")]
use std::sync::Arc;
#[cfg(feature = "browser")]
use std::time::Duration;

#[cfg(feature = "browser")]
use anyhow::Context;
use anyhow::Result;
use serde::Deserialize;
#[cfg(feature = "browser")]
use tokio::sync::Mutex;
#[cfg(feature = "browser")]
use tracing::{debug, info, warn};

#[cfg(feature = "browser")]
use chromiumoxide::cdp::browser_protocol::emulation::SetUserAgentOverrideParams;
#[cfg(feature = "browser")]
use chromiumoxide::cdp::browser_protocol::target::{
    CreateBrowserContextParams, CreateTargetParams,
};
#[cfg(feature = "browser")]
use chromiumoxide::{Browser, BrowserConfig, Page};
#[cfg(feature = "browser")]
use futures::StreamExt;

/// Browser launch settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BrowserSettings {
    pub headless: bool,
    /// Explicit Chrome binary. When unset, common install paths and PATH
    /// are searched.
    pub chrome_executable: Option<String>,
    pub chrome_args: Vec<String>,
    /// Seconds allowed for launch and per-session setup calls.
    pub setup_timeout_secs: u64,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            headless: true,
            chrome_executable: None,
            chrome_args: Vec::new(),
            setup_timeout_secs: 30,
        }
    }
}

#[cfg(feature = "browser")]
const CHROME_PATHS: &[&str] = &[
    "/usr/bin/google-chrome",
    "/usr/bin/google-chrome-stable",
    "/usr/bin/chromium",
    "/usr/bin/chromium-browser",
    "/snap/bin/chromium",
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "/Applications/Chromium.app/Contents/MacOS/Chromium",
    "/opt/google/chrome/google-chrome",
];

/// Lazily launched, shared Chrome instance.
#[cfg(feature = "browser")]
pub struct BrowserPool {
    settings: BrowserSettings,
    browser: Arc<Mutex<Option<Browser>>>,
}

/// One isolated scraping session: a dedicated browser context and page.
#[cfg(feature = "browser")]
pub struct BrowserSession {
    page: Page,
    context_id: chromiumoxide::cdp::browser_protocol::browser::BrowserContextId,
    browser: Arc<Mutex<Option<Browser>>>,
}

#[cfg(feature = "browser")]
impl BrowserPool {
    pub fn new(settings: BrowserSettings) -> Self {
        Self {
            settings,
            browser: Arc::new(Mutex::new(None)),
        }
    }

    fn find_chrome(&self) -> Result<PathBuf> {
        if let Some(ref path) = self.settings.chrome_executable {
            return Ok(PathBuf::from(path));
        }

        for path in CHROME_PATHS {
            let p = std::path::Path::new(path);
            if p.exists() {
                debug!("found Chrome at {path}");
                return Ok(p.to_path_buf());
            }
        }

        for cmd in &[
            "google-chrome",
            "google-chrome-stable",
            "chromium",
            "chromium-browser",
        ] {
            if let Ok(output) = std::process::Command::new("which").arg(cmd).output() {
                if output.status.success() {
                    let path = String::from_utf8_lossy(&output.stdout).trim().to_string();
                    if !path.is_empty() {
                        debug!("found Chrome in PATH: {path}");
                        return Ok(PathBuf::from(path));
                    }
                }
            }
        }

        Err(anyhow::anyhow!(
            "Chrome/Chromium not found; install it or set browser.chrome_executable"
        ))
    }

    async fn launch(&self) -> Result<Browser> {
        info!(headless = self.settings.headless, "launching browser");

        let chrome_path = self.find_chrome()?;
        // Fixed viewport and locale keep rendered layouts deterministic
        let mut builder = BrowserConfig::builder()
            .chrome_executable(chrome_path)
            .window_size(1280, 900)
            .arg("--lang=en-US");

        // with_head means NOT headless
        if !self.settings.headless {
            builder = builder.with_head();
        }

        builder = builder
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--disable-infobars")
            .arg("--disable-dev-shm-usage")
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--disable-background-networking")
            .arg("--disable-sync")
            .arg("--disable-translate")
            .arg("--no-sandbox")
            .arg("--disable-gpu");

        for arg in &self.settings.chrome_args {
            builder = builder.arg(arg.as_str());
        }

        let config = builder
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build browser config: {e}"))?;

        let launch_timeout = Duration::from_secs(self.settings.setup_timeout_secs);
        let (browser, mut handler) = tokio::time::timeout(launch_timeout, Browser::launch(config))
            .await
            .map_err(|_| anyhow::anyhow!("browser launch timed out"))?
            .context("failed to launch browser")?;

        tokio::spawn(async move {
            while let Some(h) = handler.next().await {
                if h.is_err() {
                    break;
                }
            }
        });

        Ok(browser)
    }

    /// Open an isolated session. Launches the browser on first use.
    ///
    /// The lock is held only for launch and context setup, never while the
    /// caller drives the page.
    pub async fn open_session(
        &self,
        user_agent: &str,
        proxy: Option<&str>,
    ) -> Result<BrowserSession> {
        let setup_timeout = Duration::from_secs(self.settings.setup_timeout_secs);
        let mut guard = self.browser.lock().await;

        if guard.is_none() {
            *guard = Some(self.launch().await?);
        }
        let browser = guard
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("browser not initialized after launch"))?;

        let mut context_params = CreateBrowserContextParams::default();
        if let Some(proxy) = proxy {
            context_params.proxy_server = Some(proxy.to_string());
        }
        let context_id = tokio::time::timeout(
            setup_timeout,
            browser.create_browser_context(context_params),
        )
        .await
        .map_err(|_| anyhow::anyhow!("browser context creation timed out"))?
        .context("failed to create browser context")?;

        // From here on the context exists in the shared browser; every
        // failure path must dispose it or it leaks across retries.
        let page_result: Result<Page> = async {
            let target = CreateTargetParams::builder()
                .url("about:blank")
                .browser_context_id(context_id.clone())
                .build()
                .map_err(|e| anyhow::anyhow!("invalid target params: {e}"))?;
            tokio::time::timeout(setup_timeout, browser.new_page(target))
                .await
                .map_err(|_| anyhow::anyhow!("page creation timed out"))?
                .context("failed to open page")
        }
        .await;
        let page = match page_result {
            Ok(page) => page,
            Err(e) => {
                if let Err(derr) = browser.dispose_browser_context(context_id).await {
                    debug!("context dispose failed: {derr}");
                }
                return Err(e);
            }
        };
        drop(guard);

        let session = BrowserSession {
            page,
            context_id,
            browser: Arc::clone(&self.browser),
        };
        if let Err(e) = session
            .page
            .execute(SetUserAgentOverrideParams::new(user_agent.to_string()))
            .await
        {
            session.close().await;
            return Err(anyhow::Error::from(e).context("failed to set user agent"));
        }

        Ok(session)
    }

    /// Shut down the shared browser, if running.
    pub async fn shutdown(&self) {
        let mut guard = self.browser.lock().await;
        if let Some(mut browser) = guard.take() {
            if let Err(e) = browser.close().await {
                warn!("browser close failed: {e}");
            }
            let _ = browser.wait().await;
        }
    }
}

#[cfg(feature = "browser")]
impl BrowserSession {
    pub fn page(&self) -> &Page {
        &self.page
    }

    /// Close the page and dispose the backing context. Errors are logged,
    /// not returned; cleanup failure must not mask scrape results.
    pub async fn close(self) {
        if let Err(e) = self.page.close().await {
            debug!("page close failed: {e}");
        }
        let guard = self.browser.lock().await;
        if let Some(browser) = guard.as_ref() {
            if let Err(e) = browser.dispose_browser_context(self.context_id).await {
                debug!("context dispose failed: {e}");
            }
        }
    }
}

// Stub for builds without the browser feature
#[cfg(not(feature = "browser"))]
pub struct BrowserPool {
    _settings: BrowserSettings,
}

#[cfg(not(feature = "browser"))]
impl BrowserPool {
    pub fn new(settings: BrowserSettings) -> Self {
        Self {
            _settings: settings,
        }
    }

    pub async fn open_session(&self, _user_agent: &str, _proxy: Option<&str>) -> Result<()> {
        Err(anyhow::anyhow!(
            "browser support not compiled; rebuild with --features browser"
        ))
    }

    pub async fn shutdown(&self) {}
}
