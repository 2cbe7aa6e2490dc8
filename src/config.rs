use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::Duration;

use crate::db::Database;
use crate::store::DEFAULT_STORAGE_KEY;

/// Runtime settings, read from the environment (and `.env` if present).
#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: PathBuf,
    pub storage_key: String,
    pub poll_interval: Duration,
    /// Level for this crate's logs when `RUST_LOG` is not set.
    pub log_level: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let poll_ms = match lookup("JOBFLOW_POLL_MS") {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .context("JOBFLOW_POLL_MS must be a whole number of milliseconds")?,
            None => 500,
        };

        Ok(Config {
            db_path: lookup("JOBFLOW_DB")
                .map(PathBuf::from)
                .unwrap_or_else(Database::default_path),
            storage_key: lookup("JOBFLOW_STORAGE_KEY")
                .filter(|k| !k.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_STORAGE_KEY.to_string()),
            poll_interval: Duration::from_millis(poll_ms),
            log_level: lookup("JOBFLOW_LOG")
                .filter(|l| !l.trim().is_empty())
                .unwrap_or_else(|| "warn".to_string()),
        })
    }

    /// Filter directive used when `RUST_LOG` is absent.
    pub fn log_directive(&self) -> String {
        format!("{}={}", env!("CARGO_PKG_NAME"), self.log_level.trim())
    }
}
