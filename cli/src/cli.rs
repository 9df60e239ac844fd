//! # CLI Interface
//!
//! Command-line structure of `ple-store`, the maintenance tool for a
//! wallet data directory. Every flag that names the data directory, the
//! currency list or the PIN also reads from the environment.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::logging::LogFormat;

/// Inspect and maintain Plenteum wallet stores.
#[derive(Parser, Debug)]
#[command(
    name = "ple-store",
    about = "Plenteum wallet store maintenance tool",
    version,
    propagate_version = true
)]
pub struct PleStoreCli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every subcommand.
#[derive(Args, Debug)]
pub struct GlobalArgs {
    /// Root directory holding the stores.
    #[arg(long, short = 'd', global = true, env = "PLE_DATA_DIR", default_value = "./wallet-data")]
    pub data_dir: PathBuf,

    /// Comma-separated currency codes the price cache is shaped for.
    ///
    /// Must match what the app uses, or the next access drops the cache.
    #[arg(long, global = true, env = "PLE_CURRENCIES", value_delimiter = ',')]
    pub currencies: Option<Vec<String>>,

    /// Log output format.
    #[arg(long, global = true, env = "PLE_LOG_FORMAT", value_enum, ignore_case = true, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,

    /// Default log level when RUST_LOG is unset.
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show whether a wallet exists and when stores were last compacted.
    Status,
    /// Compact every store now.
    Compact(PinArgs),
    /// Write the decrypted wallet document as JSON.
    ExportWallet(ExportArgs),
    /// Encrypt a wallet JSON document into the wallet store.
    ImportWallet(ImportArgs),
    /// List the payee address book.
    Payees,
    /// Remove every store and clear the presence flag.
    DeleteAll(DeleteArgs),
    /// Print version information and exit.
    Version,
}

#[derive(Args, Debug)]
pub struct PinArgs {
    /// Wallet PIN.
    #[arg(long, env = "PLE_PIN", hide_env_values = true)]
    pub pin: String,
}

#[derive(Args, Debug)]
pub struct ExportArgs {
    #[command(flatten)]
    pub pin: PinArgs,

    /// Output file. stdout when omitted.
    #[arg(long, short = 'o')]
    pub out: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct ImportArgs {
    #[command(flatten)]
    pub pin: PinArgs,

    /// Wallet JSON document to import.
    #[arg(long, short = 'f')]
    pub file: PathBuf,
}

#[derive(Args, Debug)]
pub struct DeleteArgs {
    /// Confirm; nothing is deleted without it.
    #[arg(long)]
    pub yes: bool,
}
