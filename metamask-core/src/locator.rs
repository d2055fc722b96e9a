//! Selector tables for the extension UI.
//!
//! The extension's DOM changes with every release. Everything release-specific
//! lives in a [`LocatorProfile`] so the routines in [`crate::actions`] stay
//! the same across releases.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// How to find an element.
///
/// A `{}` in the selector is a placeholder filled by [`Locator::arg`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "by", content = "value", rename_all = "lowercase")]
pub enum Locator {
    Css(String),
    Xpath(String),
}

impl Locator {
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }

    pub fn xpath(selector: impl Into<String>) -> Self {
        Self::Xpath(selector.into())
    }

    /// Button whose text is exactly `text`.
    pub fn button_text(text: &str) -> Self {
        Self::Xpath(format!("//button[text()={}]", xpath_literal(text)))
    }

    pub fn selector(&self) -> &str {
        match self {
            Self::Css(s) | Self::Xpath(s) => s,
        }
    }

    /// Fill the `{}` placeholder.
    ///
    /// XPath arguments are quoted as string literals, CSS arguments are
    /// inserted verbatim.
    pub fn arg(&self, value: impl fmt::Display) -> Self {
        match self {
            Self::Css(s) => Self::Css(s.replace("{}", &value.to_string())),
            Self::Xpath(s) => Self::Xpath(s.replace("{}", &xpath_literal(&value.to_string()))),
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Css(s) => write!(f, "css={}", s),
            Self::Xpath(s) => write!(f, "xpath={}", s),
        }
    }
}

/// Quote `text` as an XPath 1.0 string literal.
///
/// XPath has no escape sequences, so text holding both quote kinds is built
/// with `concat()`.
pub fn xpath_literal(text: &str) -> String {
    if !text.contains('\'') {
        return format!("'{}'", text);
    }
    if !text.contains('"') {
        return format!("\"{}\"", text);
    }
    let parts: Vec<String> = text
        .split('\'')
        .map(|part| format!("'{}'", part))
        .collect();
    format!("concat({})", parts.join(", \"'\", "))
}

/// Every selector and route the wallet routines need for one extension release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocatorProfile {
    pub name: String,

    /// Substring of the extension URL while onboarding is showing.
    pub onboarding_marker: String,
    /// Fragment route of the add-network form, appended to the base URL.
    pub add_network_route: String,

    /// Close control of the informational popover.
    pub popover_close: Locator,
    pub loading_overlay: Locator,

    /// Clicked in order before the recovery phrase form shows.
    pub onboarding_start: Vec<Locator>,
    pub srp_word_count: Locator,
    /// Input for word `{}` (zero based).
    pub srp_word: Locator,
    pub srp_confirm: Option<Locator>,
    pub password_new: Locator,
    pub password_confirm: Locator,
    pub password_terms: Locator,
    pub password_submit: Locator,
    /// Clicked in order after the password is submitted.
    pub onboarding_finish: Vec<Locator>,

    /// Only clickable once the home screen is idle.
    pub account_overview: Locator,

    pub network_form_inputs: Locator,
    pub network_form_save: Locator,
    pub network_added_switch: Locator,
    pub network_display: Locator,
    /// Entry `{}` of the network list.
    pub network_item: Locator,
    /// Label showing `{}` as the active network.
    pub active_network: Locator,

    pub account_menu: Locator,
    pub import_account_entry: Locator,
    pub private_key_input: Locator,
    pub import_account_confirm: Locator,

    /// Clicked in order on a connection request.
    pub connect_steps: Vec<Locator>,
    /// Clicked in order on a token approval request.
    pub approve_steps: Vec<Locator>,

    pub sign_button: Locator,
    pub assets_tab: Locator,

    pub activity_tab: Locator,
    pub pending_transactions: Locator,
    pub confirm_button: Locator,
    pub pending_status: Locator,
}

impl Default for LocatorProfile {
    fn default() -> Self {
        Self::v11()
    }
}

impl LocatorProfile {
    /// Look up a built-in profile.
    pub fn named(name: &str) -> Option<Self> {
        match name {
            "v10" => Some(Self::v10()),
            "v11" => Some(Self::v11()),
            _ => None,
        }
    }

    /// Load a profile from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// MetaMask 11.x, the `data-testid` based onboarding.
    pub fn v11() -> Self {
        let footer_next = Locator::css("button[data-testid='page-container-footer-next']");
        let primary = Locator::xpath("//button[contains(@class, 'btn-primary')]");

        Self {
            name: "v11".to_string(),
            onboarding_marker: "home.html#onboarding".to_string(),
            add_network_route: "#settings/networks/add-network".to_string(),
            popover_close: Locator::css("button[data-testid='popover-close']"),
            loading_overlay: Locator::css("div[class='loading-overlay__container']"),
            onboarding_start: vec![
                Locator::css("input[data-testid='onboarding-terms-checkbox']"),
                Locator::css("button[data-testid='onboarding-import-wallet']"),
                Locator::css("button[data-testid='metametrics-no-thanks']"),
            ],
            srp_word_count: Locator::xpath(
                "//div[@class='import-srp__container']//select[@class='dropdown__select']",
            ),
            srp_word: Locator::css("input[data-testid='import-srp__srp-word-{}']"),
            srp_confirm: Some(Locator::css("button[data-testid='import-srp-confirm']")),
            password_new: Locator::css("input[data-testid='create-password-new']"),
            password_confirm: Locator::css("input[data-testid='create-password-confirm']"),
            password_terms: Locator::css("input[data-testid='create-password-terms']"),
            password_submit: Locator::css("button[data-testid='create-password-import']"),
            onboarding_finish: vec![
                Locator::css("button[data-testid='onboarding-complete-done']"),
                Locator::css("button[data-testid='pin-extension-next']"),
                Locator::css("button[data-testid='pin-extension-done']"),
            ],
            account_overview: Locator::css("button[data-testid='eth-overview-send']"),
            network_form_inputs: Locator::xpath(
                "//div[@class='networks-tab__add-network-form-body']//input",
            ),
            network_form_save: Locator::xpath(
                "//div[contains(@class, 'networks-tab__add-network-form-footer')]//button[contains(@class, 'btn-primary')]",
            ),
            network_added_switch: Locator::xpath(
                "//button[contains(@class, 'home__new-network-added__switch-to-button')]",
            ),
            network_display: Locator::css("button[data-testid='network-display']"),
            network_item: Locator::xpath("//span[text()={}]"),
            active_network: Locator::xpath("//p[text()={}]"),
            account_menu: Locator::css("button[data-testid='account-menu-icon']"),
            import_account_entry: Locator::xpath(
                "(//section[contains(@class, 'multichain-account-menu-popover')]//button[contains(@class, 'mm-button-base--size-sm')])[2]",
            ),
            private_key_input: Locator::css("#private-key-box"),
            import_account_confirm: Locator::css(
                "button[data-testid='import-account-confirm-button']",
            ),
            connect_steps: vec![footer_next.clone(), footer_next],
            approve_steps: vec![primary.clone(), primary],
            sign_button: Locator::button_text("Sign"),
            assets_tab: Locator::button_text("Assets"),
            activity_tab: Locator::button_text("Activity"),
            pending_transactions: Locator::css("div.transaction-list__pending-transactions"),
            confirm_button: Locator::button_text("Confirm"),
            pending_status: Locator::css(".transaction-status--pending"),
        }
    }

    /// MetaMask 10.x, the `first-time-flow` onboarding.
    pub fn v10() -> Self {
        Self {
            name: "v10".to_string(),
            onboarding_marker: "home.html#initialize".to_string(),
            add_network_route: "#settings/networks/add-network".to_string(),
            popover_close: Locator::css("button[data-testid='popover-close']"),
            loading_overlay: Locator::css("div[class='loading-overlay__container']"),
            onboarding_start: vec![
                Locator::css("button.first-time-flow__button"),
                Locator::css("button[data-testid='page-container-footer-cancel']"),
                Locator::button_text("Import wallet"),
            ],
            srp_word_count: Locator::xpath(
                "//div[contains(@class, 'import-srp__number-of-words-dropdown')]//select",
            ),
            srp_word: Locator::css("#import-srp__srp-word-{}"),
            srp_confirm: None,
            password_new: Locator::css("#password"),
            password_confirm: Locator::css("#confirm-password"),
            password_terms: Locator::css("#create-new-vault__terms-checkbox"),
            password_submit: Locator::css("button.create-new-vault__submit-button"),
            onboarding_finish: vec![Locator::button_text("All Done")],
            account_overview: Locator::css("button[data-testid='eth-overview-send']"),
            network_form_inputs: Locator::xpath(
                "//div[contains(@class, 'networks-tab__add-network-form-body')]//input",
            ),
            network_form_save: Locator::xpath(
                "//div[contains(@class, 'networks-tab__add-network-form-footer')]//button[contains(@class, 'btn-primary')]",
            ),
            network_added_switch: Locator::xpath(
                "//button[contains(@class, 'home__new-network-added__switch-to-button')]",
            ),
            network_display: Locator::css("div.network-display"),
            network_item: Locator::xpath(
                "//li[contains(@class, 'network-dropdown-list')]//span[text()={}]",
            ),
            active_network: Locator::xpath(
                "//div[contains(@class, 'network-display')]//span[text()={}]",
            ),
            account_menu: Locator::css("div.account-menu__icon"),
            import_account_entry: Locator::xpath(
                "//div[contains(@class, 'account-menu__item')]//div[text()='Import Account']",
            ),
            private_key_input: Locator::css("#private-key-box"),
            import_account_confirm: Locator::button_text("Import"),
            connect_steps: vec![Locator::button_text("Next"), Locator::button_text("Connect")],
            approve_steps: vec![
                Locator::button_text("Next"),
                Locator::button_text("Approve"),
            ],
            sign_button: Locator::button_text("Sign"),
            assets_tab: Locator::css("li[data-testid='home__asset-tab']"),
            activity_tab: Locator::css("li[data-testid='home__activity-tab']"),
            pending_transactions: Locator::css("div.transaction-list__pending-transactions"),
            confirm_button: Locator::css("button[data-testid='page-container-footer-next']"),
            pending_status: Locator::css(".transaction-status--pending"),
        }
    }
}
