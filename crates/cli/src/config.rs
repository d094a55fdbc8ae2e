use std::path::PathBuf;

use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
///
/// Every field except the recognizer token has a default, so read-only
/// commands work without any setup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Directory holding the saved-vehicles snapshot.
    pub data_dir: PathBuf,
    pub recognizer_url: String,
    /// Only `spot` needs a token.
    pub recognizer_token: Option<String>,
    pub carcheck_base_url: String,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
}

impl AppConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                  | Default                                            |
    /// |--------------------------|----------------------------------------------------|
    /// | `SPOTTED_DATA_DIR`       | `.spotted`                                         |
    /// | `PLATE_RECOGNIZER_URL`   | `https://api.platerecognizer.com/v1/plate-reader/` |
    /// | `PLATE_RECOGNIZER_TOKEN` | --                                                 |
    /// | `CARCHECK_BASE_URL`      | `https://www.carcheck.co.uk/check/`                |
    /// | `REQUEST_TIMEOUT_SECS`   | `30`                                               |
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let data_dir = var("SPOTTED_DATA_DIR").unwrap_or_else(|| ".spotted".into());

        let recognizer_url = var("PLATE_RECOGNIZER_URL")
            .unwrap_or_else(|| "https://api.platerecognizer.com/v1/plate-reader/".into());

        let recognizer_token = var("PLATE_RECOGNIZER_TOKEN")
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());

        let carcheck_base_url = var("CARCHECK_BASE_URL")
            .unwrap_or_else(|| "https://www.carcheck.co.uk/check/".into());

        let request_timeout_secs: u64 = var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|| "30".into())
            .parse()
            .context("REQUEST_TIMEOUT_SECS must be a valid u64")?;

        Ok(Self {
            data_dir: PathBuf::from(data_dir),
            recognizer_url,
            recognizer_token,
            carcheck_base_url,
            request_timeout_secs,
        })
    }
}
