//! Run configuration.
//!
//! Credentials and database ids come from the environment (a `.env` file is
//! loaded first when present). Tunables live in an optional TOML settings
//! file; a missing file yields `Settings::default()`.
use secrecy::SecretString;
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

use crate::sync::DuplicatePolicy;

pub const ENV_API_TOKEN: &str = "NOTION_API_TOKEN";
pub const ENV_READER_DATABASE_ID: &str = "NOTION_READER_DATABASE_ID";
pub const ENV_FEEDS_DATABASE_ID: &str = "NOTION_FEEDS_DATABASE_ID";
pub const ENV_API_BASE_URL: &str = "NOTION_API_BASE_URL";
pub const ENV_CI: &str = "CI";

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read settings file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in settings file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Settings file too large: {0}")]
    TooLarge(String),

    #[error("Required environment variable {0} is not set")]
    MissingVar(&'static str),

    #[error("Invalid value for {key}: {reason}")]
    InvalidValue { key: &'static str, reason: String },
}

// ============================================================================
// Settings File
// ============================================================================

/// Tunables read from the optional settings file.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Unread rows older than this many days are archived by the pruner.
    pub retention_days: u32,

    /// What the duplicate check concludes when its lookup fails.
    pub duplicate_policy: DuplicatePolicy,

    /// Timeout applied to every HTTP request (feeds and Notion). 0 disables it.
    pub request_timeout_secs: u64,

    /// User-Agent sent with feed and API requests.
    pub user_agent: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            retention_days: 30,
            duplicate_policy: DuplicatePolicy::FailOpen,
            request_timeout_secs: 30,
            user_agent: concat!("notion-feeder/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl Settings {
    /// Maximum settings file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KNOWN_KEYS: [&'static str; 4] = [
        "retention_days",
        "duplicate_policy",
        "request_timeout_secs",
        "user_agent",
    ];

    /// Load settings from a TOML file.
    ///
    /// - Missing file → `Ok(Settings::default())`
    /// - Empty file → `Ok(Settings::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)`
    /// - Unknown keys → accepted, logged as warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Settings file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No settings file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "Settings file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        Self::parse(&content)
    }

    /// Parse settings from TOML text.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !Self::KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in settings file, ignoring");
                }
            }
        }

        let settings: Settings = toml::from_str(content)?;
        if settings.retention_days == 0 {
            return Err(ConfigError::InvalidValue {
                key: "retention_days",
                reason: "must be at least 1".into(),
            });
        }
        Ok(settings)
    }
}

// ============================================================================
// Environment
// ============================================================================

/// Everything a run needs to reach Notion.
///
/// `api_token` is a `SecretString`, so the derived `Debug` never prints it.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_token: SecretString,
    pub reader_database_id: String,
    pub feeds_database_id: String,
    /// Override for the Notion API root (testing and proxies)
    pub api_base_url: Option<String>,
    /// Running under CI: quieter default logging
    pub ci: bool,
    pub settings: Settings,
}

impl Config {
    /// Read configuration from the process environment, with default settings.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required = |key: &'static str| {
            non_empty(key)
                .map(|v| v.trim().to_string())
                .ok_or(ConfigError::MissingVar(key))
        };

        Ok(Self {
            api_token: SecretString::from(required(ENV_API_TOKEN)?),
            reader_database_id: required(ENV_READER_DATABASE_ID)?,
            feeds_database_id: required(ENV_FEEDS_DATABASE_ID)?,
            api_base_url: non_empty(ENV_API_BASE_URL),
            ci: non_empty(ENV_CI).is_some(),
            settings: Settings::default(),
        })
    }

    /// Default tracing filter directive when `RUST_LOG` is unset.
    pub fn default_log_level(&self) -> &'static str {
        if self.ci {
            "info"
        } else {
            "debug"
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
