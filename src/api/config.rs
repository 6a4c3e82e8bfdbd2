//! Backend and polling configuration parsed from environment variables.

use std::time::Duration;

use crate::error::ApiError;

pub const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:8000/api";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 2000;
pub const DEFAULT_HISTORY_WINDOW: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApiTimeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub base_url: String,
    pub token: Option<String>,
    pub timeouts: ApiTimeouts,
    pub poll_interval: Duration,
    pub history_window: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            token: None,
            timeouts: ApiTimeouts {
                request_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
                connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            },
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            history_window: DEFAULT_HISTORY_WINDOW,
        }
    }
}

impl ApiConfig {
    /// Build typed config from environment variables.
    ///
    /// Optional:
    /// - `CYPHER_API_BASE_URL`: default `http://127.0.0.1:8000/api`
    /// - `CYPHER_API_TOKEN`: bearer token sent with every request
    /// - `CYPHER_REQUEST_TIMEOUT_SECS`: default 60
    /// - `CYPHER_CONNECT_TIMEOUT_SECS`: default 10
    /// - `CYPHER_POLL_INTERVAL_MS`: default 2000
    /// - `CYPHER_HISTORY_WINDOW`: default 20
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is not an http(s) URL, or if a
    /// timeout or the poll interval is zero.
    pub fn from_env() -> Result<Self, ApiError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`ApiConfig::from_env`], reading values through `lookup`.
    ///
    /// # Errors
    ///
    /// See [`ApiConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ApiError> {
        let base_url = lookup("CYPHER_API_BASE_URL")
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string())
            .trim()
            .trim_end_matches('/')
            .to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ApiError::ConfigParse(format!("CYPHER_API_BASE_URL must be http(s): {base_url}")));
        }

        let token = lookup("CYPHER_API_TOKEN").filter(|t| !t.trim().is_empty());

        let timeouts = ApiTimeouts {
            request_secs: parse_or(&lookup, "CYPHER_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS),
            connect_secs: parse_or(&lookup, "CYPHER_CONNECT_TIMEOUT_SECS", DEFAULT_CONNECT_TIMEOUT_SECS),
        };
        let poll_interval_ms = parse_or(&lookup, "CYPHER_POLL_INTERVAL_MS", DEFAULT_POLL_INTERVAL_MS);
        for (key, value) in [
            ("CYPHER_REQUEST_TIMEOUT_SECS", timeouts.request_secs),
            ("CYPHER_CONNECT_TIMEOUT_SECS", timeouts.connect_secs),
            ("CYPHER_POLL_INTERVAL_MS", poll_interval_ms),
        ] {
            if value == 0 {
                return Err(ApiError::ConfigParse(format!("{key} must be positive")));
            }
        }
        let history_window = parse_or(&lookup, "CYPHER_HISTORY_WINDOW", DEFAULT_HISTORY_WINDOW);

        Ok(Self {
            base_url,
            token,
            timeouts,
            poll_interval: Duration::from_millis(poll_interval_ms),
            history_window,
        })
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    lookup(key)
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
