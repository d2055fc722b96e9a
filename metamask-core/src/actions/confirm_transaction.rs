//! Confirm a pending transaction and watch it leave the pending state.

use crate::driver::Driver;
use crate::error::{ActionError, ActionResult};
use crate::session::WalletSession;
use tracing::error;

const ACTION: &str = "Confirm transaction";

pub async fn execute<D: Driver>(session: &WalletSession<D>) -> ActionResult<()> {
    session.in_extension(ACTION, steps(session)).await
}

async fn steps<D: Driver>(session: &WalletSession<D>) -> ActionResult<()> {
    let driver = session.driver();
    let locators = session.locators();

    let pending = async {
        session.click(&locators.activity_tab).await?;
        session
            .default_wait()
            .visible(driver, &locators.pending_transactions)
            .await?;
        Ok::<_, ActionError>(())
    }
    .await;

    // The confirm button may still be up even without a listed transaction
    match pending {
        Ok(()) => {}
        Err(e) if e.is_timeout() => error!("No transaction"),
        Err(e) => return Err(e),
    }

    session.click(&locators.confirm_button).await?;

    // Pending status shows up once submitted and goes away once mined
    session
        .confirm(ACTION, async {
            let slow = session.slow_wait();
            slow.visible(driver, &locators.pending_status).await?;
            slow.invisible(driver, &locators.pending_status).await
        })
        .await
}
