//! CLI command implementations

pub mod account;
pub mod auth;
pub mod demo;
pub mod logs;
pub mod status;
pub mod transactions;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use banksys_core::config::Config;
use banksys_core::services::{EntryPoint, LogEvent};
use banksys_core::{BankingClient, LoggingService};

/// Get the logging service for CLI operations
///
/// Returns None if logging fails to initialize (shouldn't block operations)
pub fn get_logger() -> Option<Arc<LoggingService>> {
    let banksys_dir = get_banksys_dir();
    std::fs::create_dir_all(&banksys_dir).ok()?;
    LoggingService::new(&banksys_dir, EntryPoint::Cli, env!("CARGO_PKG_VERSION"))
        .ok()
        .map(Arc::new)
}

/// Log an event, ignoring any errors (logging should never break the app)
pub fn log_event(logger: Option<&Arc<LoggingService>>, event: LogEvent) {
    if let Some(l) = logger {
        let _ = l.log(event);
    }
}

/// The banksys directory from `BANKSYS_DIR` or `~/.banksys`
pub fn get_banksys_dir() -> PathBuf {
    banksys_core::config::banksys_dir()
}

/// Build the client and restore any saved session
///
/// Every command goes through here so the session is verified before use.
pub async fn get_client(command: &str) -> Result<BankingClient> {
    let banksys_dir = get_banksys_dir();
    std::fs::create_dir_all(&banksys_dir)
        .with_context(|| format!("Failed to create banksys directory: {:?}", banksys_dir))?;

    let config = Config::load(&banksys_dir)?;
    let logger = get_logger();
    log_event(logger.as_ref(), LogEvent::new("command_executed").with_command(command));
    let client = BankingClient::from_config(&config, &banksys_dir, logger)
        .context("Failed to initialize BankSys client")?;

    client.initialize().await;
    Ok(client)
}

/// Like [`get_client`], but fails unless a session is active
pub async fn get_authenticated_client(command: &str) -> Result<BankingClient> {
    let client = get_client(command).await?;
    if !client.session().is_authenticated() {
        bail!("Not logged in. Run 'bks login' first.");
    }
    Ok(client)
}
