//! MetaMask automation core library.
//!
//! Drives the MetaMask extension inside a Chromium instance so dApp
//! end-to-end tests can import a wallet, manage networks and answer the
//! extension's connection, approval, signature and transaction requests.
//!
//! Typical flow:
//! 1. [`provision::ExtensionProvisioner`] fetches and unpacks the extension.
//! 2. [`chrome::ChromeDriver::launch`] starts the browser with it loaded.
//! 3. [`session::WalletSession::bootstrap`] finds the extension window.
//! 4. Routines in [`actions`] run against the session.

pub mod actions;
pub mod chrome;
pub mod driver;
pub mod error;
pub mod locator;
pub mod provision;
pub mod session;
pub mod stealth;
pub mod wait;

pub use actions::{AddNetworkInput, ChangeNetworkInput, ImportKeyInput, SetupInput};
pub use chrome::{ChromeDriver, LaunchConfig};
pub use driver::{Driver, ElementState, WindowHandle};
pub use error::{ActionError, ActionResult};
pub use locator::{Locator, LocatorProfile};
pub use provision::ExtensionProvisioner;
pub use session::WalletSession;
pub use stealth::StealthProfile;
pub use wait::{WaitPolicies, WaitPolicy};
