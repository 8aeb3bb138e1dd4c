//! Configuration management

use std::env;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const DEFAULT_API_URL: &str = "https://api.turbinelabs.io";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Identity provider used by `login`
pub const AUTH_PROVIDER_URL: &str = "https://login.turbinelabs.io/auth/realms/turbine-labs";
pub const AUTH_CLIENT_ID: &str = "tbnctl";
pub const AUTH_CLIENT_KEY: &str = "57f0c773-6fe8-4b56-9dd2-c915143a4c19";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the configuration API
    pub api_url: String,

    /// API key, sent as `X-Turbine-API-Key`
    pub api_key: Option<String>,

    /// Bearer token from the login token cache, used when no API key is set
    pub access_token: Option<String>,

    /// Codec for records read and printed
    pub output_format: OutputFormat,

    pub timeout: Duration,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Json,
    Yaml,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_key: None,
            access_token: None,
            output_format: OutputFormat::Json,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl Config {
    /// Build the configuration from global flags (which already fall back to
    /// their environment variables) and require some form of authentication
    pub fn load(
        api_url: Option<String>,
        api_key: Option<String>,
        format: Option<OutputFormat>,
    ) -> Result<Self> {
        let config = Self::load_optional(api_url, api_key, format);

        if config.api_key.is_none() && config.access_token.is_none() {
            return Err(anyhow!(
                "Authentication required. Set TBN_API_KEY, pass --api-key, or run `tbnctl login`"
            ));
        }

        Ok(config)
    }

    /// Load configuration without requiring authentication
    pub fn load_optional(
        api_url: Option<String>,
        api_key: Option<String>,
        format: Option<OutputFormat>,
    ) -> Self {
        let timeout = env::var("TBN_TIMEOUT")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let access_token = if api_key.is_none() {
            TokenCache::load()
                .map_err(|e| debug!("token cache unavailable: {:#}", e))
                .ok()
                .and_then(|tc| tc.access_token)
        } else {
            None
        };

        Self {
            api_url: api_url
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            api_key,
            access_token,
            output_format: format.unwrap_or_default(),
            timeout: Duration::from_secs(timeout),
        }
    }

    /// Get the authentication headers for API requests
    pub fn auth_headers(&self) -> Vec<(&'static str, String)> {
        if let Some(ref key) = self.api_key {
            vec![("X-Turbine-API-Key", key.clone())]
        } else if let Some(ref token) = self.access_token {
            vec![("Authorization", format!("Bearer {}", token))]
        } else {
            vec![]
        }
    }

    /// Get config directory path
    pub fn config_dir() -> Result<PathBuf> {
        let dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Cannot determine config directory"))?
            .join("tbnctl");

        if !dir.exists() {
            fs::create_dir_all(&dir)?;
        }

        Ok(dir)
    }
}

/// Credentials saved by `login` and cleared by `logout`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenCache {
    #[serde(default)]
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl TokenCache {
    pub fn path() -> Result<PathBuf> {
        Ok(Config::config_dir()?.join("auth-cache.json"))
    }

    /// Load the cache, or an empty one when none was saved yet
    pub fn load() -> Result<Self> {
        let path = Self::path()?;
        if !path.exists() {
            return Ok(Self::default());
        }

        let text = fs::read_to_string(&path)
            .with_context(|| format!("Unable to read token cache {}", path.display()))?;
        Self::parse(&text)
            .with_context(|| format!("Unable to process token cache {}", path.display()))
    }

    fn parse(text: &str) -> Result<Self> {
        let mut cache: TokenCache = serde_json::from_str(text)?;
        if cache.is_expired(Utc::now()) {
            cache.access_token = None;
        }
        Ok(cache)
    }

    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::path()?;
        fs::write(&path, serde_json::to_string_pretty(self)?)
            .with_context(|| format!("Unable to save token cache {}", path.display()))?;
        Ok(path)
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }

    /// Drop the token but remember the user name for the next login prompt
    pub fn clear_token(&mut self) {
        self.access_token = None;
        self.refresh_token = None;
        self.expires_at = None;
    }
}
