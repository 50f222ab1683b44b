/*
[INPUT]:  YAML configuration file and EXAMDESK__* environment overrides
[OUTPUT]: Validated watcher configuration
[POS]:    Configuration layer - runner setup
[UPDATE]: When adding new configuration options
*/

use anyhow::{Context, Result, bail};
use config::{Config, Environment, File, FileFormat, Map};
use examdesk_adapter::{ClientConfig, TokenData, TokenStore};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::store::JsonFileStore;

pub const ENV_PREFIX: &str = "EXAMDESK";
pub const ENV_SEPARATOR: &str = "__";

/// Top-level configuration for the import watcher
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct WatchConfig {
    pub api: ApiConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub polling: PollingConfig,
}

/// Exam-management API endpoint
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ApiConfig {
    /// Base URL, e.g. "https://exam.example.edu"
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct AuthConfig {
    /// Bearer token; without one, resume waits and status checks are skipped
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub expires_in_secs: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Slot holding the tracked task id; one key per poller
    pub key: String,
    /// JSON state file, defaults to the platform data dir
    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PollingConfig {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_interval_secs() -> u64 {
    10
}

impl WatchConfig {
    /// Load configuration from a YAML file, then apply environment overrides
    pub fn from_file(path: &Path) -> Result<Self> {
        Self::load(
            File::from(path).format(FileFormat::Yaml).required(true),
            None,
        )
        .with_context(|| format!("load config from {}", path.display()))
    }

    fn load<S>(source: S, env: Option<Map<String, String>>) -> Result<Self>
    where
        S: config::Source + Send + Sync + 'static,
    {
        let environment = Environment::with_prefix(ENV_PREFIX)
            .prefix_separator(ENV_SEPARATOR)
            .separator(ENV_SEPARATOR)
            .try_parsing(true)
            .source(env);

        let config: Self = Config::builder()
            .add_source(source)
            .add_source(environment)
            .build()
            .context("merge configuration sources")?
            .try_deserialize()
            .context("parse configuration")?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.storage.key.trim().is_empty() {
            bail!("storage.key must not be empty");
        }
        url::Url::parse(&self.api.base_url)
            .with_context(|| format!("api.base_url is not a valid URL: {}", self.api.base_url))?;
        if self.polling.interval_secs == 0 {
            bail!("polling.interval_secs must be at least 1");
        }
        if let Some(seconds) = self.auth.expires_in_secs {
            if TokenData::expiry_after(seconds).is_none() {
                bail!("auth.expires_in_secs is out of range: {seconds}");
            }
        }
        Ok(())
    }

    /// Configured token, failing when it is missing or already expired
    pub fn require_token(&self) -> Result<String> {
        self.token_store()
            .valid_token()
            .context("no valid auth.token configured")
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            timeout: Duration::from_secs(self.api.timeout_secs),
            connect_timeout: Duration::from_secs(self.api.connect_timeout_secs),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.polling.interval_secs)
    }

    pub fn store_path(&self) -> Result<PathBuf> {
        match &self.storage.path {
            Some(path) => Ok(path.clone()),
            None => JsonFileStore::default_path().context("no platform data directory; set storage.path"),
        }
    }

    /// Token store seeded from `auth.token`; blank tokens count as absent
    pub fn token_store(&self) -> TokenStore {
        match self.auth.token.as_deref().map(str::trim) {
            Some(token) if !token.is_empty() => {
                TokenStore::with_token(token, self.auth.expires_in_secs)
            }
            _ => TokenStore::new(),
        }
    }
}
