//! Shared logging bootstrap for the wallet automation binaries.
//!
//! Progress and failures of a driving script go to one append-only log file
//! in the working directory, one `timestamp level message` line per event.

use anyhow::Context;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Timestamp layout used for every log line.
pub const LOG_TIME_FORMAT: &str = "%m-%d-%Y %H:%M:%S";

/// CLI arguments shared across all driving scripts.
#[derive(Debug, Clone, clap::Args)]
pub struct LogArgs {
    /// Log file, appended to (relative paths resolve against the working directory)
    #[clap(long, default_value = "auto-metamask.log")]
    pub log_file: PathBuf,

    /// Log level used when RUST_LOG is not set
    #[clap(long, default_value = "info")]
    pub log_level: String,
}

/// Install the global subscriber writing to `args.log_file`.
///
/// `RUST_LOG` takes precedence over `--log-level`.
pub fn init_logging(args: &LogArgs) -> anyhow::Result<()> {
    let file = open_log_file(&args.log_file)?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| args.log_level.as_str().into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .with_target(false)
                .with_timer(ChronoLocal::new(LOG_TIME_FORMAT.to_string())),
        )
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(())
}

fn open_log_file(path: &Path) -> anyhow::Result<std::fs::File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file {}", path.display()))
}
