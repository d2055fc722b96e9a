//! Add a custom network through the settings form.

use crate::driver::Driver;
use crate::error::{ActionError, ActionResult};
use crate::session::WalletSession;
use serde::{Deserialize, Serialize};
use tracing::info;
use validator::{Validate, ValidationError};

const ACTION: &str = "Add network";

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AddNetworkInput {
    /// Network name shown in the network list
    #[validate(length(min = 1))]
    pub name: String,

    /// JSON-RPC endpoint
    #[validate(url)]
    pub rpc_url: String,

    /// Chain ID, decimal or 0x-prefixed hex
    #[validate(custom(function = "validate_chain_id"))]
    pub chain_id: String,

    /// Native currency symbol
    #[validate(length(min = 1))]
    pub currency_symbol: String,
}

impl AddNetworkInput {
    pub fn new(
        name: impl Into<String>,
        rpc_url: impl Into<String>,
        chain_id: impl Into<String>,
        currency_symbol: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            rpc_url: rpc_url.into(),
            chain_id: chain_id.into(),
            currency_symbol: currency_symbol.into(),
        }
    }
}

fn validate_chain_id(chain_id: &str) -> Result<(), ValidationError> {
    let valid = match chain_id.strip_prefix("0x") {
        Some(hex) => !hex.is_empty() && hex.chars().all(|c| c.is_ascii_hexdigit()),
        None => !chain_id.is_empty() && chain_id.chars().all(|c| c.is_ascii_digit()),
    };
    if valid {
        Ok(())
    } else {
        Err(ValidationError::new("chain_id"))
    }
}

pub async fn execute<D: Driver>(
    session: &WalletSession<D>,
    input: AddNetworkInput,
) -> ActionResult<()> {
    input
        .validate()
        .map_err(|e| ActionError::rejected(format!("Validation failed: {}", e)))?;

    info!(name = %input.name, chain_id = %input.chain_id, "Adding network");
    session.in_extension(ACTION, steps(session, &input)).await
}

async fn steps<D: Driver>(session: &WalletSession<D>, input: &AddNetworkInput) -> ActionResult<()> {
    let driver = session.driver();
    let locators = session.locators();

    let route = format!("{}{}", session.base_url(), locators.add_network_route);
    driver.navigate(&route).await?;

    let inputs = &locators.network_form_inputs;
    let count = session.default_wait().all_visible(driver, inputs).await?;
    let values = [
        input.name.as_str(),
        input.rpc_url.as_str(),
        input.chain_id.as_str(),
        input.currency_symbol.as_str(),
    ];
    if count < values.len() {
        return Err(ActionError::unconfirmed(
            ACTION,
            format!("form has {} inputs, expected {}", count, values.len()),
        ));
    }

    for (nth, value) in values.iter().enumerate() {
        driver.type_text(inputs, nth, value).await?;
    }

    session.click(&locators.network_form_save).await?;

    session
        .confirm(
            ACTION,
            session
                .default_wait()
                .click(driver, &locators.network_added_switch),
        )
        .await
}
