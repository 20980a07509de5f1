//! Client configuration parsed from environment variables.

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://localhost:5000/api";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_SESSION_TTL_SECS: u64 = 24 * 60 * 60;
pub const DEFAULT_REFRESH_LEAD_SECS: u64 = 5 * 60;
pub const DEFAULT_TOKEN_KEY: &str = "auth_token";

/// Errors produced while building a [`ClientConfig`].
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("PORTFOLIO_API_URL is set but empty")]
    EmptyBaseUrl,

    #[error("PORTFOLIO_API_URL must start with http:// or https://, got {0}")]
    InvalidBaseUrl(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

impl Timeouts {
    #[must_use]
    pub fn request(&self) -> Duration {
        Duration::from_secs(self.request_secs)
    }

    #[must_use]
    pub fn connect(&self) -> Duration {
        Duration::from_secs(self.connect_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub api_base_url: String,
    pub timeouts: Timeouts,
    /// Fallback session window when the token carries no `exp` claim.
    pub session_ttl_secs: u64,
    /// How long before expiry a remembered session is re-verified.
    pub refresh_lead_secs: u64,
    pub token_file: PathBuf,
    pub token_key: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_URL.to_owned(),
            timeouts: Timeouts {
                request_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
                connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            },
            session_ttl_secs: DEFAULT_SESSION_TTL_SECS,
            refresh_lead_secs: DEFAULT_REFRESH_LEAD_SECS,
            token_file: default_token_file(None),
            token_key: DEFAULT_TOKEN_KEY.to_owned(),
        }
    }
}

impl ClientConfig {
    /// Build typed client config from environment variables.
    ///
    /// Optional:
    /// - `PORTFOLIO_API_URL`: backend base URL (default `http://localhost:5000/api`)
    /// - `PORTFOLIO_REQUEST_TIMEOUT_SECS`: default 30
    /// - `PORTFOLIO_CONNECT_TIMEOUT_SECS`: default 10
    /// - `PORTFOLIO_SESSION_TTL_SECS`: default 86400
    /// - `PORTFOLIO_REFRESH_LEAD_SECS`: default 300
    /// - `PORTFOLIO_TOKEN_FILE`: default `$HOME/.portfolio/token.json`
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is set but empty or not an http(s) URL.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup. `from_env` delegates here.
    ///
    /// # Errors
    ///
    /// Same as [`ClientConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_base_url = parse_base_url(lookup("PORTFOLIO_API_URL").as_deref())?;
        let timeouts = Timeouts {
            request_secs: parse_u64(lookup("PORTFOLIO_REQUEST_TIMEOUT_SECS"), DEFAULT_REQUEST_TIMEOUT_SECS),
            connect_secs: parse_u64(lookup("PORTFOLIO_CONNECT_TIMEOUT_SECS"), DEFAULT_CONNECT_TIMEOUT_SECS),
        };
        let session_ttl_secs = parse_u64(lookup("PORTFOLIO_SESSION_TTL_SECS"), DEFAULT_SESSION_TTL_SECS);
        let refresh_lead_secs = parse_u64(lookup("PORTFOLIO_REFRESH_LEAD_SECS"), DEFAULT_REFRESH_LEAD_SECS);
        let token_file = lookup("PORTFOLIO_TOKEN_FILE")
            .filter(|v| !v.trim().is_empty())
            .map_or_else(|| default_token_file(lookup("HOME").as_deref()), PathBuf::from);

        Ok(Self {
            api_base_url,
            timeouts,
            session_ttl_secs,
            refresh_lead_secs,
            token_file,
            token_key: DEFAULT_TOKEN_KEY.to_owned(),
        })
    }
}

fn parse_base_url(raw: Option<&str>) -> Result<String, ConfigError> {
    let Some(raw) = raw else {
        return Ok(DEFAULT_API_URL.to_owned());
    };
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(ConfigError::EmptyBaseUrl);
    }
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(ConfigError::InvalidBaseUrl(trimmed.to_owned()));
    }
    Ok(trimmed.to_owned())
}

fn parse_u64(raw: Option<String>, default: u64) -> u64 {
    raw.and_then(|v| v.trim().parse::<u64>().ok()).unwrap_or(default)
}

fn default_token_file(home: Option<&str>) -> PathBuf {
    match home.filter(|h| !h.is_empty()) {
        Some(home) => PathBuf::from(home).join(".portfolio").join("token.json"),
        None => PathBuf::from(".portfolio-token.json"),
    }
}
