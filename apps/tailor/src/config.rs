use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

const DEFAULT_API_URL: &str = "http://localhost:8000";
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Client configuration loaded from environment variables.
/// Every variable has a default; only malformed values are errors.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the tailoring/rendering backend, without trailing slash.
    pub api_base_url: String,
    pub request_timeout: Duration,
    /// Where saved downloads land.
    pub download_dir: PathBuf,
    /// Where transient download blobs are staged before the save is triggered.
    pub staging_dir: PathBuf,
    pub rust_log: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            api_base_url: DEFAULT_API_URL.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            download_dir: PathBuf::from("."),
            staging_dir: std::env::temp_dir(),
            rust_log: "info".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();

        let api_base_url = lookup("TAILOR_API_URL")
            .map(|url| url.trim().trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty())
            .unwrap_or(defaults.api_base_url);

        let request_timeout = match lookup("TAILOR_REQUEST_TIMEOUT_SECS") {
            Some(raw) => Duration::from_secs(
                raw.trim()
                    .parse::<u64>()
                    .with_context(|| {
                        format!(
                            "TAILOR_REQUEST_TIMEOUT_SECS must be a whole number of seconds, \
                             got '{raw}'"
                        )
                    })?,
            ),
            None => defaults.request_timeout,
        };

        Ok(Config {
            api_base_url,
            request_timeout,
            download_dir: lookup("TAILOR_DOWNLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.download_dir),
            staging_dir: lookup("TAILOR_STAGING_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.staging_dir),
            rust_log: lookup("RUST_LOG").unwrap_or(defaults.rust_log),
        })
    }
}
