//! Approve a token spending request.

use crate::driver::Driver;
use crate::error::ActionResult;
use crate::session::WalletSession;

const ACTION: &str = "Approve";

pub async fn execute<D: Driver>(session: &WalletSession<D>) -> ActionResult<()> {
    session.in_extension(ACTION, steps(session)).await
}

async fn steps<D: Driver>(session: &WalletSession<D>) -> ActionResult<()> {
    let locators = session.locators();

    for step in &locators.approve_steps {
        session.click(step).await?;
    }

    session
        .confirm(
            ACTION,
            session
                .default_wait()
                .clickable(session.driver(), &locators.account_overview),
        )
        .await
}
