//! CDP browser lifecycle with the wallet extension loaded.
//!
//! Launches Chromium with the unpacked extension, keeps track of which page
//! is focused and implements [`Driver`] on top of chromiumoxide.

use crate::driver::{Driver, ElementState, WindowHandle};
use crate::locator::Locator;
use crate::stealth::StealthProfile;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::AddScriptToEvaluateOnNewDocumentParams;
use chromiumoxide::element::Element;
use chromiumoxide::error::CdpError;
use chromiumoxide::Page;
use futures::StreamExt;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace};
use url::Url;

/// Reports visibility (bit 0) and enabled state (bit 1) of `this`.
const ELEMENT_STATE_FN: &str = r#"function() {
  const style = window.getComputedStyle(this);
  const rect = this.getBoundingClientRect();
  const visible = style.visibility !== 'hidden' && style.display !== 'none'
    && rect.width > 0 && rect.height > 0;
  return (visible ? 1 : 0) + (this.disabled ? 0 : 2);
}"#;

/// How long to wait for Chromium's first tab after launch.
const FIRST_PAGE_ATTEMPTS: u32 = 20;

/// Configuration for launching the browser.
#[derive(Debug, Clone)]
pub struct LaunchConfig {
    /// Custom Chrome/Chromium binary path.
    pub browser_path: Option<PathBuf>,
    /// Extensions do not load in classic headless mode; defaults to headed.
    pub headless: bool,
    /// Browser window size.
    pub window_size: (u32, u32),
    /// Unpacked extension directory.
    pub extension_dir: Option<PathBuf>,
    /// Profile directory; a temporary one when unset.
    pub user_data_dir: Option<PathBuf>,
    pub stealth: StealthProfile,
    /// Extra Chromium switches.
    pub args: Vec<String>,
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self {
            browser_path: None,
            headless: false,
            window_size: (1440, 900),
            extension_dir: None,
            user_data_dir: None,
            stealth: StealthProfile::default(),
            args: Vec::new(),
        }
    }
}

impl LaunchConfig {
    /// Chromium switches derived from this config.
    pub fn chrome_args(&self) -> Vec<String> {
        let mut args = vec![
            "--no-sandbox".to_string(),
            "--disable-dev-shm-usage".to_string(),
            "--disable-blink-features=AutomationControlled".to_string(),
            "--no-first-run".to_string(),
            "--no-default-browser-check".to_string(),
            "--remote-allow-origins=*".to_string(),
        ];
        if let Some(ref dir) = self.extension_dir {
            args.push(format!("--disable-extensions-except={}", dir.display()));
        }
        if self.headless {
            args.push("--headless=new".to_string());
        }
        args.extend(self.args.iter().cloned());
        args
    }
}

/// A launched browser and the page currently focused.
pub struct ChromeDriver {
    browser: Mutex<Browser>,
    current: RwLock<Option<Page>>,
    stealth_script: String,
    handler: JoinHandle<()>,
}

impl ChromeDriver {
    /// Launch Chromium and focus its first tab.
    pub async fn launch(config: LaunchConfig) -> Result<Self> {
        let mut builder = BrowserConfig::builder()
            .disable_default_args()
            .window_size(config.window_size.0, config.window_size.1);

        if let Some(ref path) = config.browser_path {
            builder = builder.chrome_executable(path);
        }

        // Headless is passed as a switch so the new headless mode is used
        builder = builder.with_head();

        if let Some(ref dir) = config.user_data_dir {
            builder = builder.user_data_dir(dir);
        }

        if let Some(ref dir) = config.extension_dir {
            builder = builder.extension(dir.display().to_string());
        }

        for arg in config.chrome_args() {
            builder = builder.arg(arg);
        }

        let browser_config = builder.build().map_err(|e| anyhow::anyhow!("{}", e))?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .context("Failed to launch browser")?;

        let handler = tokio::spawn(async move {
            while let Some(h) = handler.next().await {
                if h.is_err() {
                    break;
                }
            }
        });

        info!(
            extension = ?config.extension_dir,
            headless = config.headless,
            "Browser launched"
        );

        let driver = Self {
            browser: Mutex::new(browser),
            current: RwLock::new(None),
            stealth_script: config.stealth.script(),
            handler,
        };

        let first = driver.first_page().await?;
        driver.apply_stealth(&first).await?;
        *driver.current.write().await = Some(first);

        Ok(driver)
    }

    async fn first_page(&self) -> Result<Page> {
        for _ in 0..FIRST_PAGE_ATTEMPTS {
            if let Some(page) = self.pages().await?.into_iter().next() {
                return Ok(page);
            }
            tokio::time::sleep(Duration::from_millis(250)).await;
        }

        let browser = self.browser.lock().await;
        browser
            .new_page("about:blank")
            .await
            .context("Failed to create new page")
    }

    async fn pages(&self) -> Result<Vec<Page>> {
        let mut browser = self.browser.lock().await;
        browser
            .fetch_targets()
            .await
            .context("Failed to fetch targets")?;
        browser.pages().await.context("Failed to list pages")
    }

    async fn apply_stealth(&self, page: &Page) -> Result<()> {
        page.execute(AddScriptToEvaluateOnNewDocumentParams::new(
            self.stealth_script.clone(),
        ))
        .await
        .context("Failed to install stealth script")?;
        Ok(())
    }

    async fn page(&self) -> Result<Page> {
        let guard = self.current.read().await;
        guard.clone().context("No focused page")
    }

    async fn elements(&self, locator: &Locator) -> Result<Vec<Element>> {
        let page = self.page().await?;
        let found = match locator {
            Locator::Css(selector) => page.find_elements(selector.as_str()).await,
            Locator::Xpath(selector) => page.find_xpaths(selector.as_str()).await,
        };
        match found {
            Ok(elements) => Ok(elements),
            Err(e) if is_connection_error(&e) => {
                Err(e).with_context(|| format!("Lost browser connection searching '{}'", locator))
            }
            // Protocol-level failures mean nothing matched yet
            Err(e) => {
                trace!(%locator, error = %e, "no match");
                Ok(Vec::new())
            }
        }
    }

    async fn element(&self, locator: &Locator, nth: usize) -> Result<Element> {
        self.elements(locator)
            .await?
            .into_iter()
            .nth(nth)
            .with_context(|| format!("Element not found '{}' (index {})", locator, nth))
    }
}

/// The browser or its connection is gone, retrying cannot help.
fn is_connection_error(error: &CdpError) -> bool {
    matches!(
        error,
        CdpError::Ws(_)
            | CdpError::Io(_)
            | CdpError::NoResponse
            | CdpError::ChannelSendError(_)
            | CdpError::Timeout
            | CdpError::LaunchExit(..)
            | CdpError::LaunchTimeout(_)
            | CdpError::LaunchIo(..)
    )
}

fn handle_of(page: &Page) -> WindowHandle {
    let id: &str = page.target_id().as_ref();
    WindowHandle::new(id)
}

/// `to` differs from `from` only in its fragment.
fn is_fragment_change(from: &str, to: &str) -> bool {
    match (Url::parse(from), Url::parse(to)) {
        (Ok(mut from), Ok(mut to)) => {
            // Dropping the fragment reloads the document
            let has_fragment = to.fragment().is_some();
            let changed = from.fragment() != to.fragment();
            from.set_fragment(None);
            to.set_fragment(None);
            has_fragment && changed && from == to
        }
        _ => false,
    }
}

#[async_trait]
impl Driver for ChromeDriver {
    async fn window_handles(&self) -> Result<Vec<WindowHandle>> {
        Ok(self.pages().await?.iter().map(handle_of).collect())
    }

    async fn current_window(&self) -> Result<WindowHandle> {
        Ok(handle_of(&self.page().await?))
    }

    async fn switch_to_window(&self, handle: &WindowHandle) -> Result<()> {
        let page = self
            .pages()
            .await?
            .into_iter()
            .find(|p| handle_of(p) == *handle)
            .with_context(|| format!("Window {} not found", handle))?;

        page.bring_to_front()
            .await
            .with_context(|| format!("Failed to focus window {}", handle))?;
        debug!(window = %handle, "Switched window");
        *self.current.write().await = Some(page);
        Ok(())
    }

    async fn open_window(&self, url: &str) -> Result<WindowHandle> {
        let page = {
            let browser = self.browser.lock().await;
            browser
                .new_page("about:blank")
                .await
                .context("Failed to create new page")?
        };
        self.apply_stealth(&page).await?;
        page.goto(url)
            .await
            .with_context(|| format!("Navigation failed: {}", url))?;

        let handle = handle_of(&page);
        *self.current.write().await = Some(page);
        Ok(handle)
    }

    async fn current_url(&self) -> Result<String> {
        let page = self.page().await?;
        Ok(page
            .url()
            .await
            .context("Failed to get URL")?
            .unwrap_or_default())
    }

    async fn navigate(&self, url: &str) -> Result<()> {
        let page = self.page().await?;
        let current = page.url().await?.unwrap_or_default();

        // Same-document routes never fire a load event
        if is_fragment_change(&current, url) {
            let hash = url.split_once('#').map(|(_, h)| h).unwrap_or_default();
            page.evaluate(format!(
                "window.location.hash = {}",
                serde_json::Value::from(hash)
            ))
            .await
            .with_context(|| format!("Failed to set hash route: {}", url))?;
            return Ok(());
        }

        page.goto(url)
            .await
            .with_context(|| format!("Navigation failed: {}", url))?;
        Ok(())
    }

    async fn refresh(&self) -> Result<()> {
        self.page().await?.reload().await.context("Reload failed")?;
        Ok(())
    }

    async fn inspect(&self, locator: &Locator) -> Result<Vec<ElementState>> {
        let mut states = Vec::new();
        for element in self.elements(locator).await? {
            // Detached between search and probe: treat as hidden
            let bits = match element.call_js_fn(ELEMENT_STATE_FN, false).await {
                Ok(returns) => returns
                    .result
                    .value
                    .and_then(|v| v.as_u64())
                    .unwrap_or(0),
                Err(_) => 0,
            };
            states.push(ElementState {
                visible: bits & 1 != 0,
                enabled: bits & 2 != 0,
            });
        }
        Ok(states)
    }

    async fn click(&self, locator: &Locator, nth: usize) -> Result<()> {
        self.element(locator, nth)
            .await?
            .click()
            .await
            .with_context(|| format!("Click failed on '{}'", locator))?;
        Ok(())
    }

    async fn type_text(&self, locator: &Locator, nth: usize, text: &str) -> Result<()> {
        let element = self.element(locator, nth).await?;

        // Click to focus first, then type
        element
            .click()
            .await
            .with_context(|| format!("Failed to focus '{}'", locator))?;
        element
            .type_str(text)
            .await
            .with_context(|| format!("Failed to type into '{}'", locator))?;
        Ok(())
    }

    async fn select_value(&self, locator: &Locator, value: &str) -> Result<()> {
        let element = self.element(locator, 0).await?;
        let function = format!(
            "function() {{ this.value = {}; this.dispatchEvent(new Event('change', {{ bubbles: true }})); }}",
            serde_json::Value::from(value)
        );
        element
            .call_js_fn(function, false)
            .await
            .with_context(|| format!("Failed to select '{}' in '{}'", value, locator))?;
        Ok(())
    }

    async fn text(&self, locator: &Locator) -> Result<Option<String>> {
        match self.elements(locator).await?.into_iter().next() {
            Some(element) => element
                .inner_text()
                .await
                .with_context(|| format!("Failed to read text of '{}'", locator)),
            None => Ok(None),
        }
    }

    async fn close(&self) -> Result<()> {
        let mut browser = self.browser.lock().await;
        browser.close().await.context("Failed to close browser")?;
        match browser.wait().await {
            Ok(status) => debug!(?status, "Browser process exited"),
            Err(e) => debug!(error = %e, "Failed to wait for browser process"),
        }
        self.handler.abort();
        info!("Browser closed");
        Ok(())
    }
}
