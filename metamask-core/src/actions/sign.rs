//! Sign a message request.
//!
//! The signature request sometimes renders only after a reload, so the Sign
//! button is probed under the fast wait and the page refreshed once if it is
//! missing.

use crate::driver::Driver;
use crate::error::ActionResult;
use crate::session::WalletSession;
use tracing::warn;

const ACTION: &str = "Sign";

pub async fn execute<D: Driver>(session: &WalletSession<D>) -> ActionResult<()> {
    session.in_extension(ACTION, steps(session)).await
}

async fn steps<D: Driver>(session: &WalletSession<D>) -> ActionResult<()> {
    let driver = session.driver();
    let locators = session.locators();

    match session
        .fast_wait()
        .clickable(driver, &locators.sign_button)
        .await
    {
        Ok(_) => {}
        Err(e) if e.is_timeout() => {
            warn!("Sign refresh");
            driver.refresh().await?;
        }
        Err(e) => return Err(e),
    }

    session.click(&locators.sign_button).await?;

    session
        .confirm(
            ACTION,
            session.default_wait().visible(driver, &locators.assets_tab),
        )
        .await
}
