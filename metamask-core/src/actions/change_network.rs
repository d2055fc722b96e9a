//! Switch the active network.

use crate::driver::Driver;
use crate::error::{ActionError, ActionResult};
use crate::session::WalletSession;
use serde::{Deserialize, Serialize};
use tracing::info;
use validator::Validate;

const ACTION: &str = "Change network";

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ChangeNetworkInput {
    /// Network name as listed in the network selector
    #[validate(length(min = 1))]
    pub name: String,
}

impl ChangeNetworkInput {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

pub async fn execute<D: Driver>(
    session: &WalletSession<D>,
    input: ChangeNetworkInput,
) -> ActionResult<()> {
    input
        .validate()
        .map_err(|e| ActionError::rejected(format!("Validation failed: {}", e)))?;

    info!(name = %input.name, "Change network");
    session.in_extension(ACTION, steps(session, &input.name)).await
}

async fn steps<D: Driver>(session: &WalletSession<D>, name: &str) -> ActionResult<()> {
    let driver = session.driver();
    let locators = session.locators();

    session.click(&locators.network_display).await?;

    // Present is enough: the list scrolls the entry into view on click
    let item = locators.network_item.arg(name);
    session.default_wait().present(driver, &item).await?;
    driver.click(&item, 0).await?;

    session
        .confirm(
            ACTION,
            session
                .default_wait()
                .clickable(driver, &locators.active_network.arg(name)),
        )
        .await
}
