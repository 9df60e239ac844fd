// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Plenteum Store Tool
//!
//! Entry point for the `ple-store` binary. Opens a wallet data directory
//! the way the app does and runs one maintenance command against it:
//!
//! - `status`        — presence flag and compaction schedule
//! - `compact`       — run a full compaction pass
//! - `export-wallet` — decrypt the wallet document to JSON
//! - `import-wallet` — encrypt a JSON wallet document into the store
//! - `payees`        — list the address book
//! - `delete-all`    — remove every store
//! - `version`       — print build version information
//!
//! Unlike the app, the tool wants real errors, so it drives the
//! `StoreManager` directly instead of the fail-soft service.

mod cli;
mod logging;

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::sync::Arc;

use plenteum_store::config::WALLET_FILE_FORMAT_VERSION;
use plenteum_store::{StorageConfig, StoreManager};

use cli::{Commands, GlobalArgs, PleStoreCli};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = PleStoreCli::parse();
    logging::init_logging(&cli.global.log_level, cli.global.log_format);

    let manager = Arc::new(StoreManager::with_tracing(storage_config(&cli.global)));

    match cli.command {
        Commands::Status => status(manager).await,
        Commands::Compact(args) => compact(manager, args.pin).await,
        Commands::ExportWallet(args) => export_wallet(manager, args).await,
        Commands::ImportWallet(args) => import_wallet(manager, args).await,
        Commands::Payees => payees(manager).await,
        Commands::DeleteAll(args) => delete_all(manager, args.yes).await,
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

fn storage_config(global: &GlobalArgs) -> StorageConfig {
    let config = StorageConfig::new(&global.data_dir);
    match &global.currencies {
        Some(codes) => config.with_currencies(codes.iter().map(|c| c.trim().to_lowercase())),
        None => config,
    }
}

/// Run `op` against the manager on the blocking pool.
async fn blocking<T, F>(manager: Arc<StoreManager>, op: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(&StoreManager) -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(move || op(manager.as_ref()))
        .await
        .context("store task panicked")?
}

async fn status(manager: Arc<StoreManager>) -> Result<()> {
    let data_dir = manager.config().data_dir.clone();
    let interval = manager.config().compaction_interval_days;
    let (have_wallet, last, due) = blocking(manager, move |m| {
        let have_wallet = m.presence().get();
        let last = m.last_compacted()?;
        let due = m.should_compact(interval)?;
        Ok((have_wallet, last, due))
    })
    .await
    .context("failed to read store status")?;

    println!("data dir        {}", data_dir.display());
    println!("wallet present  {have_wallet}");
    match last {
        Some(at) => println!("last compacted  {}", at.to_rfc3339()),
        None => println!("last compacted  never"),
    }
    println!("compaction due  {due} (every {interval} days)");
    Ok(())
}

async fn compact(manager: Arc<StoreManager>, pin: String) -> Result<()> {
    let report = blocking(manager, move |m| Ok(m.compact_all_report(&pin))).await?;

    for stats in &report.completed {
        if stats.skipped {
            println!("{:<20} skipped (not created yet)", stats.store);
        } else {
            println!(
                "{:<20} {:>8} entries  {:>10} -> {:>10} bytes",
                stats.store, stats.entries, stats.bytes_before, stats.bytes_after
            );
        }
    }
    if let Some(failure) = report.failure {
        return Err(failure).context("compaction pass stopped early");
    }
    println!("compaction complete");
    Ok(())
}

async fn export_wallet(manager: Arc<StoreManager>, args: cli::ExportArgs) -> Result<()> {
    let pin = args.pin.pin;
    let doc = blocking(manager, move |m| Ok(m.load_wallet(&pin)?))
        .await
        .context("failed to load wallet")?;
    let Some(doc) = doc else {
        bail!("no wallet stored in this data directory");
    };

    let text = serde_json::to_string_pretty(&doc)?;
    match args.out {
        Some(path) => {
            std::fs::write(&path, text)
                .with_context(|| format!("failed to write {}", path.display()))?;
            tracing::info!(path = %path.display(), "wallet exported");
        }
        None => println!("{text}"),
    }
    Ok(())
}

async fn import_wallet(manager: Arc<StoreManager>, args: cli::ImportArgs) -> Result<()> {
    let text = std::fs::read_to_string(&args.file)
        .with_context(|| format!("failed to read {}", args.file.display()))?;
    let doc: serde_json::Value = serde_json::from_str(&text)
        .with_context(|| format!("{} is not valid JSON", args.file.display()))?;

    let pin = args.pin.pin;
    blocking(manager, move |m| Ok(m.save_wallet(&doc, &pin)?))
        .await
        .context("failed to save wallet")?;
    println!("wallet imported");
    Ok(())
}

async fn payees(manager: Arc<StoreManager>) -> Result<()> {
    let payees = blocking(manager, |m| Ok(m.load_payees()?))
        .await
        .context("failed to load payees")?;
    if payees.is_empty() {
        println!("no payees");
    }
    for payee in payees {
        if payee.payment_id.is_empty() {
            println!("{:<24} {}", payee.nickname, payee.address);
        } else {
            println!("{:<24} {} (payment id {})", payee.nickname, payee.address, payee.payment_id);
        }
    }
    Ok(())
}

async fn delete_all(manager: Arc<StoreManager>, confirmed: bool) -> Result<()> {
    if !confirmed {
        bail!("refusing to delete without --yes");
    }
    blocking(manager, |m| Ok(m.delete_all()?))
        .await
        .context("failed to delete stores")?;
    println!("all stores deleted");
    Ok(())
}

fn print_version() {
    println!("ple-store      {}", env!("CARGO_PKG_VERSION"));
    println!("wallet format  {WALLET_FILE_FORMAT_VERSION}");
    println!("rustc          {}", rustc_version());
}

/// Returns the Rust compiler version used to build this binary.
fn rustc_version() -> &'static str {
    option_env!("RUSTC_VERSION").unwrap_or("unknown")
}
