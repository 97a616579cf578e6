//! Configuration loading.
//!
//! A TOML (or JSON) file supplies optional overrides and extra archive
//! profiles. [`Settings`] is the resolved view with every default filled in.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::aggregate::DEFAULT_CONCURRENCY;
use crate::archives::{ArchiveProfile, ArchiveRegistry, RegistryError, DEFAULT_ARCHIVE_ID};
use crate::http_client::{
    FetchError, HttpClient, DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_DELAY, DEFAULT_TIMEOUT, USER_AGENT,
};

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "WASTEBACK_CONFIG";

const USER_AGENT_ENV: &str = "WASTEBACK_USER_AGENT";
const CONCURRENCY_ENV: &str = "WASTEBACK_CONCURRENCY";

/// Name `prefer` searches the standard config locations for.
const APP_NAME: &str = "wasteback";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {format} config {path}: {message}")]
    Parse {
        path: PathBuf,
        format: &'static str,
        message: String,
    },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// User agent string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    /// Request timeout in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout: Option<u64>,
    /// Backoff unit between attempts in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_delay_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_attempts: Option<u32>,
    /// Resources fetched at once.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concurrency: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_archive: Option<String>,
    /// Extra archives; an id matching a built-in replaces it.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub archives: Vec<ArchiveProfile>,
    /// Path to the config file this was loaded from (not serialized).
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

/// Fully resolved runtime settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub user_agent: String,
    /// Request timeout in seconds.
    pub request_timeout: u64,
    pub retry_delay_ms: u64,
    pub max_attempts: u32,
    pub concurrency: usize,
    pub default_archive: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            user_agent: USER_AGENT.to_string(),
            request_timeout: DEFAULT_TIMEOUT.as_secs(),
            retry_delay_ms: DEFAULT_RETRY_DELAY.as_millis() as u64,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            concurrency: DEFAULT_CONCURRENCY,
            default_archive: DEFAULT_ARCHIVE_ID.to_string(),
        }
    }
}

impl Settings {
    /// Build the HTTP client these settings describe.
    pub fn http_client(&self) -> Result<HttpClient, FetchError> {
        HttpClient::builder(
            Duration::from_secs(self.request_timeout),
            Duration::from_millis(self.retry_delay_ms),
        )
        .user_agent(&self.user_agent)
        .max_attempts(self.max_attempts)
        .build()
    }
}

impl Config {
    /// Load configuration.
    ///
    /// An explicit path, then `$WASTEBACK_CONFIG`, must name an existing
    /// file. Otherwise `prefer` looks for a `wasteback` config in the
    /// standard locations; none found means defaults. Environment overrides
    /// are applied last.
    pub async fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let env_path = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
        let required = explicit.map(Path::to_path_buf).or(env_path);

        let mut config = match required {
            Some(path) => Self::load_from_path(&path).await?,
            None => Self::discover().await?,
        };

        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Use prefer for file discovery, then parse with serde.
    async fn discover() -> Result<Self, ConfigError> {
        match prefer::load(APP_NAME).await {
            Ok(found) => match found.source_path() {
                Some(path) => Self::load_from_path(path).await,
                None => Ok(Self::default()),
            },
            Err(_) => {
                tracing::debug!("No {} config file found, using defaults", APP_NAME);
                Ok(Self::default())
            }
        }
    }

    /// Load configuration from a specific file.
    ///
    /// `.json` files are parsed as JSON; anything else as TOML.
    pub async fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;

        let parse_error = |format, message: String| ConfigError::Parse {
            path: path.to_path_buf(),
            format,
            message,
        };
        let mut config: Config = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => serde_json::from_str(&contents)
                .map_err(|e| parse_error("JSON", e.to_string()))?,
            _ => toml::from_str(&contents).map_err(|e| parse_error("TOML", e.to_string()))?,
        };

        tracing::debug!("Loaded config from {}", path.display());
        config.source_path = Some(path.to_path_buf());
        Ok(config)
    }

    /// Apply overrides from environment-style lookups.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(ua) = lookup(USER_AGENT_ENV).filter(|v| !v.trim().is_empty()) {
            self.user_agent = Some(ua);
        }
        if let Some(value) = lookup(CONCURRENCY_ENV) {
            let n = value
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or(ConfigError::InvalidValue {
                    key: CONCURRENCY_ENV,
                    value,
                })?;
            self.concurrency = Some(n);
        }
        Ok(())
    }

    /// Apply configuration to settings.
    pub fn apply_to_settings(&self, settings: &mut Settings) {
        if let Some(ref user_agent) = self.user_agent {
            settings.user_agent = user_agent.clone();
        }
        if let Some(timeout) = self.request_timeout {
            settings.request_timeout = timeout;
        }
        if let Some(delay) = self.retry_delay_ms {
            settings.retry_delay_ms = delay;
        }
        if let Some(attempts) = self.max_attempts {
            settings.max_attempts = attempts.max(1);
        }
        if let Some(concurrency) = self.concurrency {
            settings.concurrency = concurrency.max(1);
        }
        if let Some(ref archive) = self.default_archive {
            settings.default_archive = archive.trim().to_lowercase();
        }
    }

    pub fn settings(&self) -> Settings {
        let mut settings = Settings::default();
        self.apply_to_settings(&mut settings);
        settings
    }

    /// Built-in archives plus those from this config.
    pub fn registry(&self) -> Result<ArchiveRegistry, ConfigError> {
        let mut registry = ArchiveRegistry::with_defaults();
        registry.merge(self.archives.clone())?;
        Ok(registry)
    }
}
