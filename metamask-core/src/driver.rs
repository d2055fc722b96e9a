//! Browser capability surface the wallet routines are written against.
//!
//! [`crate::chrome::ChromeDriver`] implements it over CDP; tests implement it
//! in memory.

use crate::locator::Locator;
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier of one browser tab/window.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WindowHandle(pub String);

impl WindowHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WindowHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Observed state of one element matching a locator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ElementState {
    pub visible: bool,
    pub enabled: bool,
}

impl ElementState {
    pub const HIDDEN: Self = Self {
        visible: false,
        enabled: true,
    };

    pub const READY: Self = Self {
        visible: true,
        enabled: true,
    };

    /// Visible and enabled, the point at which a click lands.
    pub fn clickable(&self) -> bool {
        self.visible && self.enabled
    }
}

/// Commands a wallet routine may issue against the focused window.
///
/// Element commands address the `nth` match of a locator in document order.
#[async_trait]
pub trait Driver: Send + Sync {
    async fn window_handles(&self) -> Result<Vec<WindowHandle>>;

    async fn current_window(&self) -> Result<WindowHandle>;

    async fn switch_to_window(&self, handle: &WindowHandle) -> Result<()>;

    /// Open a new window at `url` and focus it.
    async fn open_window(&self, url: &str) -> Result<WindowHandle>;

    async fn current_url(&self) -> Result<String>;

    async fn navigate(&self, url: &str) -> Result<()>;

    async fn refresh(&self) -> Result<()>;

    /// One entry per matching element; empty when nothing matches.
    async fn inspect(&self, locator: &Locator) -> Result<Vec<ElementState>>;

    async fn click(&self, locator: &Locator, nth: usize) -> Result<()>;

    async fn type_text(&self, locator: &Locator, nth: usize, text: &str) -> Result<()>;

    /// Pick the `<option>` with the given value in a `<select>`.
    async fn select_value(&self, locator: &Locator, value: &str) -> Result<()>;

    /// Rendered text of the first match.
    async fn text(&self, locator: &Locator) -> Result<Option<String>>;

    async fn close(&self) -> Result<()>;
}
