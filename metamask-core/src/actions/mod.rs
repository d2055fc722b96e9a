//! Wallet action routines.
//!
//! Every routine runs inside [`WalletSession::in_extension`] and returns
//! `Ok(())` once its success signal is observed. A failed step ends the
//! routine with an [`crate::ActionError`]; whether to go on is up to the
//! caller.

pub mod add_network;
pub mod approve;
pub mod change_network;
pub mod confirm_transaction;
pub mod connect;
pub mod import_key;
pub mod setup;
pub mod sign;

pub use add_network::AddNetworkInput;
pub use change_network::ChangeNetworkInput;
pub use import_key::ImportKeyInput;
pub use setup::SetupInput;

use crate::driver::Driver;
use crate::error::ActionResult;
use crate::session::WalletSession;

impl<D: Driver> WalletSession<D> {
    /// Import a wallet from its recovery phrase and set its password.
    pub async fn setup_wallet(&self, input: SetupInput) -> ActionResult<()> {
        setup::execute(self, input).await
    }

    pub async fn add_network(&self, input: AddNetworkInput) -> ActionResult<()> {
        add_network::execute(self, input).await
    }

    pub async fn change_network(&self, input: ChangeNetworkInput) -> ActionResult<()> {
        change_network::execute(self, input).await
    }

    pub async fn import_private_key(&self, input: ImportKeyInput) -> ActionResult<()> {
        import_key::execute(self, input).await
    }

    /// Accept the connection request a dApp has raised.
    pub async fn connect_wallet(&self) -> ActionResult<()> {
        connect::execute(self).await
    }

    pub async fn approve(&self) -> ActionResult<()> {
        approve::execute(self).await
    }

    pub async fn sign(&self) -> ActionResult<()> {
        sign::execute(self).await
    }

    pub async fn confirm_transaction(&self) -> ActionResult<()> {
        confirm_transaction::execute(self).await
    }
}
