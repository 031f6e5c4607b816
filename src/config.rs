use anyhow::{Context, Result};
use std::env;
use std::path::{Path, PathBuf};

pub const DB_ENV: &str = "EXPENSE_LEDGER_DB";
pub const CURRENCY_ENV: &str = "EXPENSE_LEDGER_CURRENCY";
pub const LOG_ENV: &str = "EXPENSE_LEDGER_LOG";
pub const ADDR_ENV: &str = "EXPENSE_LEDGER_ADDR";

const APP_DIR: &str = "expense-ledger";
const DEFAULT_CURRENCY: &str = "₹";
const DEFAULT_ADDR: &str = "127.0.0.1:3000";

/// Runtime settings, resolved once at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub db_path: PathBuf,
    /// Prefixed to amounts in the table, never stored
    pub currency_symbol: String,
    pub log_path: PathBuf,
    pub server_addr: String,
}

impl Config {
    /// Read settings from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Resolve settings through `lookup`, falling back to defaults under the
    /// user's data directory.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let data_dir = || -> Result<PathBuf> {
            let base = dirs::data_dir()
                .or_else(dirs::home_dir)
                .context("failed to determine a data directory - set EXPENSE_LEDGER_DB")?;
            Ok(base.join(APP_DIR))
        };

        let db_path = match non_empty(DB_ENV) {
            Some(path) => PathBuf::from(path),
            None => data_dir()?.join("expenses.db"),
        };

        let log_path = match non_empty(LOG_ENV) {
            Some(path) => PathBuf::from(path),
            None => db_path
                .parent()
                .map(|dir| dir.join("expense-ledger.log"))
                .unwrap_or_else(|| PathBuf::from("expense-ledger.log")),
        };

        Ok(Self {
            db_path,
            currency_symbol: non_empty(CURRENCY_ENV).unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
            log_path,
            server_addr: non_empty(ADDR_ENV).unwrap_or_else(|| DEFAULT_ADDR.to_string()),
        })
    }

    /// Create the directory that will hold the database.
    pub fn ensure_db_dir(&self) -> Result<()> {
        ensure_parent(&self.db_path)
    }
}

pub fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {:?}", parent))?;
        }
    }
    Ok(())
}
