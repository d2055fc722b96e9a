//! MetaMask driving script.
//!
//! Provides two subcommands:
//! - `run` (default): provision the extension, launch Chromium, import the
//!   wallet and optionally set up a network, an extra account and a dApp
//!   connection, then hold the browser open
//! - `fetch`: download and unpack the extension only

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use metamask_core::{
    ActionResult, AddNetworkInput, ChangeNetworkInput, ChromeDriver, ExtensionProvisioner,
    ImportKeyInput, LaunchConfig, Locator, LocatorProfile, SetupInput, WaitPolicies,
    WalletSession,
};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info};

const DEFAULT_PACKAGE_URL: &str =
    "https://github.com/MetaMask/metamask-extension/releases/download/v11.16.0/metamask-chrome-11.16.0.zip";

#[derive(Parser)]
#[command(name = "metamask-runner", about = "MetaMask wallet automation for dApp tests")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Set up the wallet and connect it to a dApp (default when no subcommand given)
    Run(RunArgs),

    /// Download and unpack the extension, print its directory
    Fetch(FetchArgs),
}

#[derive(clap::Args, Debug, Clone)]
struct PackageArgs {
    /// Extension release package to download
    #[clap(long, default_value = DEFAULT_PACKAGE_URL)]
    url: String,

    /// Download cache directory (defaults to METAMASK_CACHE_DIR, then the working directory)
    #[clap(long)]
    cache_dir: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct FetchArgs {
    #[clap(flatten)]
    log: runner_common::LogArgs,

    #[clap(flatten)]
    package: PackageArgs,
}

#[derive(clap::Args, Debug, Clone)]
struct NetworkArgs {
    /// Custom network to add and switch to
    #[clap(long, requires_all = ["rpc_url", "chain_id", "currency_symbol"])]
    network_name: Option<String>,

    #[clap(long)]
    rpc_url: Option<String>,

    #[clap(long)]
    chain_id: Option<String>,

    #[clap(long)]
    currency_symbol: Option<String>,
}

#[derive(Parser, Debug)]
struct RunArgs {
    #[clap(flatten)]
    log: runner_common::LogArgs,

    #[clap(flatten)]
    package: PackageArgs,

    /// Built-in selector profile matching the extension release
    #[clap(long, default_value = "v11", value_parser = ["v10", "v11"])]
    locators: String,

    /// Selector profile JSON file, overrides --locators
    #[clap(long)]
    locators_file: Option<PathBuf>,

    /// Custom Chrome/Chromium binary path
    #[clap(long)]
    browser_path: Option<PathBuf>,

    /// Run Chromium in new headless mode
    #[clap(long)]
    headless: bool,

    /// Browser profile directory
    #[clap(long)]
    user_data_dir: Option<PathBuf>,

    #[clap(long, env = "METAMASK_RECOVERY_PHRASE", hide_env_values = true)]
    recovery_phrase: String,

    #[clap(long, env = "METAMASK_PASSWORD", hide_env_values = true)]
    password: String,

    /// Extra account to import
    #[clap(long, env = "METAMASK_PRIVATE_KEY", hide_env_values = true)]
    private_key: Option<String>,

    #[clap(flatten)]
    network: NetworkArgs,

    /// dApp to open and connect the wallet to
    #[clap(long)]
    dapp_url: Option<String>,

    /// Text of the dApp button that raises the connection request
    #[clap(long, default_value = "Connect")]
    dapp_connect_button: String,

    /// Seconds to keep the browser open before closing it
    #[clap(long, default_value = "60")]
    hold_secs: u64,

    /// Continue with the next step when a wallet action fails
    #[clap(long)]
    keep_going: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        None => run(RunArgs::parse_from(["metamask-runner"])).await,
        Some(Command::Run(args)) => run(args).await,
        Some(Command::Fetch(args)) => fetch(args).await,
    }
}

fn provisioner(package: &PackageArgs) -> anyhow::Result<ExtensionProvisioner> {
    match package.cache_dir {
        Some(ref dir) => ExtensionProvisioner::with_dir(dir.clone()),
        None => ExtensionProvisioner::new(),
    }
}

async fn fetch(args: FetchArgs) -> anyhow::Result<()> {
    runner_common::init_logging(&args.log)?;

    let dir = provisioner(&args.package)?
        .provision(&args.package.url)
        .await?;
    println!("{}", dir.display());
    Ok(())
}

fn locator_profile(args: &RunArgs) -> anyhow::Result<LocatorProfile> {
    if let Some(ref path) = args.locators_file {
        return LocatorProfile::from_file(path);
    }
    LocatorProfile::named(&args.locators)
        .with_context(|| format!("Unknown locator profile: {}", args.locators))
}

/// Stop on a failed action unless `--keep-going` was given.
fn check(step: &str, result: ActionResult<()>, keep_going: bool) -> anyhow::Result<()> {
    match result {
        Ok(()) => Ok(()),
        Err(e) if keep_going => {
            error!(step, "Continuing after failure: {}", e);
            Ok(())
        }
        Err(e) => {
            error!(step, "Aborting: {}", e);
            Err(e).with_context(|| format!("{} failed", step))
        }
    }
}

/// Combine the run outcome with the browser shutdown result. A failed run
/// keeps its own error; the close error is only logged then.
fn finish(outcome: anyhow::Result<()>, closed: ActionResult<()>) -> anyhow::Result<()> {
    match (outcome, closed) {
        (Err(e), Err(close_err)) => {
            error!("Failed to close browser: {}", close_err);
            Err(e)
        }
        (Ok(()), Err(close_err)) => Err(close_err).context("Failed to close browser"),
        (outcome, Ok(())) => outcome,
    }
}

async fn run(args: RunArgs) -> anyhow::Result<()> {
    runner_common::init_logging(&args.log)?;

    let locators = locator_profile(&args)?;
    let extension_dir = provisioner(&args.package)?
        .provision(&args.package.url)
        .await?;

    let driver = ChromeDriver::launch(LaunchConfig {
        browser_path: args.browser_path.clone(),
        headless: args.headless,
        extension_dir: Some(extension_dir),
        user_data_dir: args.user_data_dir.clone(),
        ..Default::default()
    })
    .await?;

    let waits = WaitPolicies::default();
    let session = WalletSession::bootstrap(driver, waits, locators)
        .await
        .context("Extension window not found")?;

    let outcome = drive(&session, &args).await;

    if outcome.is_ok() && args.hold_secs > 0 {
        info!(secs = args.hold_secs, "Holding browser open");
        tokio::time::sleep(Duration::from_secs(args.hold_secs)).await;
    }

    let closed = session.close().await;
    finish(outcome, closed)
}

async fn drive(session: &WalletSession<ChromeDriver>, args: &RunArgs) -> anyhow::Result<()> {
    let keep_going = args.keep_going;

    check(
        "Setup",
        session
            .setup_wallet(SetupInput::new(&args.recovery_phrase, &args.password))
            .await,
        keep_going,
    )?;

    if let Some(network) = network_input(&args.network)? {
        let name = network.name.clone();
        check("Add network", session.add_network(network).await, keep_going)?;
        check(
            "Change network",
            session.change_network(ChangeNetworkInput::new(name)).await,
            keep_going,
        )?;
    }

    if let Some(ref key) = args.private_key {
        check(
            "Import PK",
            session
                .import_private_key(ImportKeyInput::new(key.as_str()))
                .await,
            keep_going,
        )?;
    }

    if let Some(ref url) = args.dapp_url {
        session.open_dapp(url).await?;
        let connect = Locator::button_text(&args.dapp_connect_button);
        check(
            "Open connection request",
            session
                .waits()
                .default
                .click(session.driver(), &connect)
                .await,
            keep_going,
        )?;
        check("Connect wallet", session.connect_wallet().await, keep_going)?;
    }

    Ok(())
}

fn network_input(args: &NetworkArgs) -> anyhow::Result<Option<AddNetworkInput>> {
    let name = match args.network_name {
        Some(ref name) => name,
        None => return Ok(None),
    };
    match (&args.rpc_url, &args.chain_id, &args.currency_symbol) {
        (Some(rpc_url), Some(chain_id), Some(symbol)) => Ok(Some(AddNetworkInput::new(
            name.as_str(),
            rpc_url.as_str(),
            chain_id.as_str(),
            symbol.as_str(),
        ))),
        _ => bail!("--network-name needs --rpc-url, --chain-id and --currency-symbol"),
    }
}
