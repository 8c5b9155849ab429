//! services/client/src/config.rs
//!
//! Defines the client's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use reqwest::Url;
use std::path::PathBuf;
use std::time::Duration;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    /// Server root; the `/api` prefix is added per request.
    pub api_base_url: String,
    /// JSON file holding the persisted session.
    pub storage_path: PathBuf,
    pub log_level: Level,
    pub request_timeout: Duration,
    /// How many days of logs a fresh analysis covers.
    pub insight_days: u32,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to keep tests hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let api_base_url = std::env::var("PHR_API_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:8000".to_string());
        let parsed = Url::parse(&api_base_url).map_err(|e| {
            ConfigError::InvalidValue("PHR_API_BASE_URL".to_string(), e.to_string())
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidValue(
                "PHR_API_BASE_URL".to_string(),
                format!("unsupported scheme '{}'", parsed.scheme()),
            ));
        }
        let api_base_url = api_base_url.trim_end_matches('/').to_string();

        let storage_path = std::env::var("PHR_STORAGE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./.phr/session.json"));

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let request_timeout = parse_number::<u64>("PHR_REQUEST_TIMEOUT_SECS", 30)
            .map(Duration::from_secs)?;
        let insight_days = parse_number::<u32>("PHR_INSIGHT_DAYS", 365)?;
        if insight_days == 0 {
            return Err(ConfigError::InvalidValue(
                "PHR_INSIGHT_DAYS".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            api_base_url,
            storage_path,
            log_level,
            request_timeout,
            insight_days,
        })
    }
}

fn parse_number<T: std::str::FromStr>(var: &str, default: T) -> Result<T, ConfigError> {
    match std::env::var(var) {
        Ok(raw) => raw.trim().parse::<T>().map_err(|_| {
            ConfigError::InvalidValue(var.to_string(), format!("'{}' is not a number", raw))
        }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_default_when_unset_and_reject_garbage() {
        assert_eq!(parse_number::<u32>("PHR_TEST_UNSET_NUMBER", 7).unwrap(), 7);

        std::env::set_var("PHR_TEST_BAD_NUMBER", "soon");
        assert!(matches!(
            parse_number::<u32>("PHR_TEST_BAD_NUMBER", 7),
            Err(ConfigError::InvalidValue(var, _)) if var == "PHR_TEST_BAD_NUMBER"
        ));
    }
}
