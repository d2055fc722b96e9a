//! Import an account from a raw private key.

use crate::driver::Driver;
use crate::error::{ActionError, ActionResult};
use crate::session::WalletSession;
use serde::{Deserialize, Serialize};
use tracing::info;
use validator::{Validate, ValidationError};

const ACTION: &str = "Import PK";

#[derive(Clone, Serialize, Deserialize, Validate)]
pub struct ImportKeyInput {
    /// 32-byte hex private key, optionally 0x-prefixed
    #[validate(custom(function = "validate_private_key"))]
    pub private_key: String,
}

impl ImportKeyInput {
    pub fn new(private_key: impl Into<String>) -> Self {
        Self {
            private_key: private_key.into(),
        }
    }
}

impl std::fmt::Debug for ImportKeyInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImportKeyInput").finish_non_exhaustive()
    }
}

fn validate_private_key(key: &str) -> Result<(), ValidationError> {
    let hex = key.strip_prefix("0x").unwrap_or(key);
    if hex.len() == 64 && hex.chars().all(|c| c.is_ascii_hexdigit()) {
        Ok(())
    } else {
        Err(ValidationError::new("private_key"))
    }
}

pub async fn execute<D: Driver>(session: &WalletSession<D>, input: ImportKeyInput) -> ActionResult<()> {
    input
        .validate()
        .map_err(|e| ActionError::rejected(format!("Validation failed: {}", e)))?;

    info!("Importing account");
    session
        .in_extension(ACTION, steps(session, &input.private_key))
        .await
}

async fn steps<D: Driver>(session: &WalletSession<D>, private_key: &str) -> ActionResult<()> {
    let driver = session.driver();
    let locators = session.locators();

    session.click(&locators.account_menu).await?;
    session.click(&locators.import_account_entry).await?;
    session.fill(&locators.private_key_input, private_key).await?;
    session.click(&locators.import_account_confirm).await?;

    // Only clickable once the import dialog has closed
    session
        .confirm(
            ACTION,
            session
                .default_wait()
                .clickable(driver, &locators.account_overview),
        )
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "bb334564f93fc3a40a3b6a89e0560101bb86e5b75c773381f1e6d2f37fc5c5ba";

    #[test]
    fn test_valid_keys() {
        assert!(ImportKeyInput::new(KEY).validate().is_ok());
        assert!(ImportKeyInput::new(format!("0x{}", KEY)).validate().is_ok());
    }

    #[test]
    fn test_invalid_keys() {
        assert!(ImportKeyInput::new("").validate().is_err());
        assert!(ImportKeyInput::new(&KEY[..63]).validate().is_err());
        assert!(ImportKeyInput::new(KEY.replace('b', "g")).validate().is_err());
    }

    #[test]
    fn test_debug_hides_key() {
        assert!(!format!("{:?}", ImportKeyInput::new(KEY)).contains(KEY));
    }
}
