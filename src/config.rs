//! Process configuration from environment variables

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_API_URL: &str = "https://api.telegram.org";
pub const DEFAULT_WORK_DIR: &str = "temp";
pub const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_CONVERSION_TIMEOUT_SECS: u64 = 120;
const DEFAULT_POLL_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("TELEGRAM_TOKEN is not set")]
    MissingToken,
    #[error("invalid value {value:?} for {name}: {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Clone)]
pub struct Config {
    pub telegram_token: String,
    pub log_level: String,
    pub work_dir: PathBuf,
    pub conversion_timeout: Duration,
    pub api_url: String,
    pub poll_timeout: Duration,
}

// The token must not end up in logs
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("telegram_token", &"<redacted>")
            .field("log_level", &self.log_level)
            .field("work_dir", &self.work_dir)
            .field("conversion_timeout", &self.conversion_timeout)
            .field("api_url", &self.api_url)
            .field("poll_timeout", &self.poll_timeout)
            .finish()
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let telegram_token = non_empty("TELEGRAM_TOKEN").ok_or(ConfigError::MissingToken)?;

        Ok(Self {
            telegram_token,
            log_level: non_empty("LOG_LEVEL").unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
            work_dir: non_empty("WORK_DIR")
                .map_or_else(|| PathBuf::from(DEFAULT_WORK_DIR), PathBuf::from),
            conversion_timeout: seconds(
                "CONVERSION_TIMEOUT_SECS",
                non_empty("CONVERSION_TIMEOUT_SECS"),
                DEFAULT_CONVERSION_TIMEOUT_SECS,
            )?,
            api_url: non_empty("TELEGRAM_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            poll_timeout: seconds(
                "POLL_TIMEOUT_SECS",
                non_empty("POLL_TIMEOUT_SECS"),
                DEFAULT_POLL_TIMEOUT_SECS,
            )?,
        })
    }

    /// Filter directive used when `RUST_LOG` is unset
    pub fn default_log_filter(&self) -> String {
        format!("docflip={},reqwest=warn,hyper=warn", self.log_level)
    }
}

fn seconds(
    name: &'static str,
    value: Option<String>,
    default: u64,
) -> Result<Duration, ConfigError> {
    let Some(value) = value else {
        return Ok(Duration::from_secs(default));
    };
    match value.trim().parse::<u64>() {
        Ok(0) => Err(ConfigError::Invalid {
            name,
            value,
            reason: "must be greater than zero".to_string(),
        }),
        Ok(secs) => Ok(Duration::from_secs(secs)),
        Err(e) => Err(ConfigError::Invalid {
            name,
            value,
            reason: e.to_string(),
        }),
    }
}
