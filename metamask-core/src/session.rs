//! The context every wallet action runs in.
//!
//! Owns the driver, the extension window handle, the extension base URL, the
//! wait policies and the locator profile. Built once by [`WalletSession::bootstrap`].

use crate::driver::{Driver, WindowHandle};
use crate::error::{ActionError, ActionResult};
use crate::locator::{Locator, LocatorProfile};
use crate::wait::{WaitPolicies, WaitPolicy};
use std::future::Future;
use tracing::{debug, error, info, warn};
use url::Url;

/// Number of windows once the extension has opened its onboarding tab.
const EXPECTED_WINDOWS: usize = 2;

pub struct WalletSession<D: Driver> {
    driver: D,
    extension: WindowHandle,
    base_url: String,
    waits: WaitPolicies,
    locators: LocatorProfile,
}

impl<D: Driver> WalletSession<D> {
    /// Find the extension's window in a freshly launched browser.
    ///
    /// Waits for exactly two windows, then switches among them until one
    /// shows the onboarding marker of `locators`. Focus returns to the window
    /// that held it on entry.
    pub async fn bootstrap(
        driver: D,
        waits: WaitPolicies,
        locators: LocatorProfile,
    ) -> ActionResult<Self> {
        let original = driver.current_window().await?;

        waits
            .default
            .window_count(&driver, EXPECTED_WINDOWS)
            .await?;

        let marker = locators.onboarding_marker.as_str();
        let driver_ref = &driver;
        let found = waits
            .default
            .until(format!("a window with '{}' in its URL", marker), move || async move {
                for handle in driver_ref.window_handles().await? {
                    driver_ref.switch_to_window(&handle).await?;
                    let url = driver_ref.current_url().await?;
                    if url.contains(marker) {
                        return Ok(Some((handle, url)));
                    }
                }
                Ok::<_, anyhow::Error>(None)
            })
            .await;

        let restored = driver.switch_to_window(&original).await;
        let (extension, url) = found?;
        restored?;

        let base_url = strip_fragment(&url);
        info!(window = %extension, base_url = %base_url, "Found extension window");

        Ok(Self {
            driver,
            extension,
            base_url,
            waits,
            locators,
        })
    }

    /// Build a session from parts already known.
    pub fn from_parts(
        driver: D,
        extension: WindowHandle,
        base_url: impl Into<String>,
        waits: WaitPolicies,
        locators: LocatorProfile,
    ) -> Self {
        Self {
            driver,
            extension,
            base_url: base_url.into(),
            waits,
            locators,
        }
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn extension_window(&self) -> &WindowHandle {
        &self.extension
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn waits(&self) -> &WaitPolicies {
        &self.waits
    }

    pub fn locators(&self) -> &LocatorProfile {
        &self.locators
    }

    /// Run `body` with the extension window focused.
    ///
    /// Before the body: switch to the extension, load its base URL, dismiss
    /// the popover. After it: dismiss the popover again. The window focused
    /// on entry is focused again on every exit path.
    pub async fn in_extension<T, F>(&self, action: &str, body: F) -> ActionResult<T>
    where
        F: Future<Output = ActionResult<T>>,
    {
        let caller = self.driver.current_window().await?;
        debug!(action, from = %caller, "Entering extension window");

        let outcome = async {
            self.driver.switch_to_window(&self.extension).await?;
            self.driver.navigate(&self.base_url).await?;
            self.dismiss_popover().await?;
            let value = body.await?;
            self.dismiss_popover().await?;
            Ok::<T, ActionError>(value)
        }
        .await;

        let restored = self.driver.switch_to_window(&caller).await;
        match (outcome, restored) {
            (Err(e), restored) => {
                // Unconfirmed outcomes were already logged by `confirm`
                if !matches!(e, ActionError::Unconfirmed { .. }) {
                    error!(action, "{} failed: {}", action, e);
                }
                if let Err(restore_err) = restored {
                    error!(action, "Failed to restore window {}: {}", caller, restore_err);
                }
                Err(e)
            }
            (Ok(_), Err(restore_err)) => Err(restore_err.into()),
            (Ok(value), Ok(())) => Ok(value),
        }
    }

    /// Close the informational popover if it shows up within the fast wait.
    pub async fn dismiss_popover(&self) -> ActionResult<bool> {
        match self.fast_wait().click(&self.driver, &self.locators.popover_close).await {
            Ok(()) => {
                debug!("Popover closed");
                Ok(true)
            }
            Err(e) if e.is_timeout() => {
                warn!("No popover");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Text of the network label in the extension header.
    pub async fn active_network(&self) -> ActionResult<String> {
        let locator = self.locators.network_display.clone();
        self.in_extension("read active network", async {
            self.default_wait().visible(&self.driver, &locator).await?;
            let text = self.driver.text(&locator).await?.unwrap_or_default();
            Ok::<_, ActionError>(text.trim().to_string())
        })
        .await
    }

    /// Open the dApp under test in a new window and leave it focused.
    pub async fn open_dapp(&self, url: &str) -> ActionResult<WindowHandle> {
        let handle = self.driver.open_window(url).await?;
        info!(url, window = %handle, "Opened dApp window");
        Ok(handle)
    }

    /// Shut the browser down.
    pub async fn close(self) -> ActionResult<()> {
        self.driver.close().await?;
        Ok(())
    }

    pub(crate) fn fast_wait(&self) -> &WaitPolicy {
        &self.waits.fast
    }

    pub(crate) fn default_wait(&self) -> &WaitPolicy {
        &self.waits.default
    }

    pub(crate) fn slow_wait(&self) -> &WaitPolicy {
        &self.waits.slow
    }

    pub(crate) async fn click(&self, locator: &Locator) -> ActionResult<()> {
        self.default_wait().click(&self.driver, locator).await
    }

    pub(crate) async fn fill(&self, locator: &Locator, text: &str) -> ActionResult<()> {
        self.default_wait().fill(&self.driver, locator, text).await
    }

    /// Wait for the success signal of `action`, logging the outcome.
    ///
    /// Driver errors pass through unlogged; [`Self::in_extension`] reports them.
    pub(crate) async fn confirm<T>(
        &self,
        action: &str,
        wait: impl Future<Output = ActionResult<T>>,
    ) -> ActionResult<()> {
        match wait.await {
            Ok(_) => {
                info!("{} success", action);
                Ok(())
            }
            Err(e) if e.is_timeout() => {
                error!("{} failed", action);
                Err(ActionError::unconfirmed(action, e))
            }
            Err(e) => Err(e),
        }
    }
}

impl<D: Driver> std::fmt::Debug for WalletSession<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletSession")
            .field("extension", &self.extension)
            .field("base_url", &self.base_url)
            .field("locators", &self.locators.name)
            .finish_non_exhaustive()
    }
}

fn strip_fragment(url: &str) -> String {
    match Url::parse(url) {
        Ok(mut parsed) => {
            parsed.set_fragment(None);
            parsed.to_string()
        }
        Err(_) => url.split('#').next().unwrap_or(url).to_string(),
    }
}
