//! Configuration management
//!
//! Settings live in `<banksys_dir>/settings.json`:
//! ```json
//! {
//!   "api": { "baseUrl": "http://localhost:8001", "timeoutSecs": 30 },
//!   "transactions": { "pageSize": 20 },
//!   "app": { "demoMode": false }
//! }
//! ```
//! Fields the client doesn't manage are preserved on save.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::adapters::http::{BANKSYS_API_URL_ENV, DEFAULT_BASE_URL, DEFAULT_TIMEOUT_SECS};
use crate::services::DEFAULT_PAGE_SIZE;

/// Environment variable forcing demo mode on or off (for CI/testing)
pub const BANKSYS_DEMO_MODE_ENV: &str = "BANKSYS_DEMO_MODE";

/// Environment variable overriding the client directory
pub const BANKSYS_DIR_ENV: &str = "BANKSYS_DIR";

/// Raw settings.json structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default)]
    api: ApiSettings,
    #[serde(default)]
    transactions: TransactionSettings,
    #[serde(default)]
    app: AppSettings,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    timeout_secs: Option<u64>,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransactionSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    page_size: Option<u32>,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppSettings {
    #[serde(default)]
    demo_mode: bool,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

/// BankSys client configuration (simplified view of settings)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub api_base_url: String,
    pub timeout_secs: u64,
    pub page_size: u32,
    pub demo_mode: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            page_size: DEFAULT_PAGE_SIZE,
            demo_mode: false,
        }
    }
}

impl Config {
    /// Load config from the banksys directory
    ///
    /// Environment overrides win over the file:
    /// - `BANKSYS_API_URL` for the backend URL
    /// - `BANKSYS_DEMO_MODE` for demo mode
    pub fn load(banksys_dir: &Path) -> Result<Self> {
        let raw = read_settings(banksys_dir)?;
        let defaults = Self::default();

        let api_base_url = std::env::var(BANKSYS_API_URL_ENV)
            .ok()
            .filter(|url| !url.trim().is_empty())
            .or(raw.api.base_url)
            .unwrap_or(defaults.api_base_url);

        let demo_mode = match std::env::var(BANKSYS_DEMO_MODE_ENV).ok().as_deref() {
            Some("true" | "1" | "yes" | "TRUE" | "YES") => true,
            Some("false" | "0" | "no" | "FALSE" | "NO") => false,
            _ => raw.app.demo_mode,
        };

        Ok(Self {
            api_base_url,
            timeout_secs: raw
                .api
                .timeout_secs
                .filter(|secs| *secs > 0)
                .unwrap_or(defaults.timeout_secs),
            page_size: raw
                .transactions
                .page_size
                .filter(|size| (1..=100).contains(size))
                .unwrap_or(defaults.page_size),
            demo_mode,
        })
    }

    /// Save config to the banksys directory
    ///
    /// Only the fields this client manages are rewritten.
    pub fn save(&self, banksys_dir: &Path) -> Result<()> {
        std::fs::create_dir_all(banksys_dir)?;
        let mut settings = read_settings(banksys_dir)?;

        settings.api.base_url = Some(self.api_base_url.clone());
        settings.api.timeout_secs = Some(self.timeout_secs);
        settings.transactions.page_size = Some(self.page_size);
        settings.app.demo_mode = self.demo_mode;

        let content = serde_json::to_string_pretty(&settings)?;
        std::fs::write(settings_path(banksys_dir), content)?;
        Ok(())
    }

    pub fn enable_demo_mode(&mut self) {
        self.demo_mode = true;
    }

    pub fn disable_demo_mode(&mut self) {
        self.demo_mode = false;
    }
}

/// Client directory: `BANKSYS_DIR`, else `~/.banksys`
pub fn banksys_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(BANKSYS_DIR_ENV) {
        if !dir.trim().is_empty() {
            return PathBuf::from(dir);
        }
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".banksys")
}

fn settings_path(banksys_dir: &Path) -> PathBuf {
    banksys_dir.join("settings.json")
}

fn read_settings(banksys_dir: &Path) -> Result<SettingsFile> {
    let path = settings_path(banksys_dir);
    if !path.exists() {
        return Ok(SettingsFile::default());
    }
    let content = std::fs::read_to_string(&path)?;
    Ok(serde_json::from_str(&content).unwrap_or_default())
}
