//! Application configuration.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::application::services::{CoordinatorConfig, RetryPolicy, SuccessRetention};
use crate::domain::entities::Retries;
use crate::infrastructure::native::{DEFAULT_CACHE_SIZE, HttpPortConfig};

use super::args::CliArgs;

pub(super) const APP_NAME: &str = "blasted-image";
pub(super) const APP_QUALIFIER: &str = "com";
pub(super) const APP_ORGANIZATION: &str = "blasted";

/// Log level configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace level.
    Trace,
    /// Debug level.
    Debug,
    /// Info level.
    #[default]
    Info,
    /// Warning level.
    Warn,
    /// Error level.
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Trace => write!(f, "trace"),
            Self::Debug => write!(f, "debug"),
            Self::Info => write!(f, "info"),
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Application configuration.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Configuration file path.
    #[serde(skip)]
    pub config: Option<PathBuf>,

    /// Log file path; logs go to stderr when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_path: Option<PathBuf>,

    /// Log verbosity level.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Retry and dedup tuning.
    #[serde(default)]
    pub loader: LoaderConfig,

    /// Native cache configuration.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Bundled asset configuration.
    #[serde(default)]
    pub assets: AssetsConfig,

    /// Download settings.
    #[serde(default)]
    pub http: HttpConfig,
}

/// Retry and dedup tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// Attempts per load when the caller does not pick a budget.
    #[serde(default)]
    pub retries: Retries,

    /// Delay before the second attempt, in milliseconds.
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,

    /// Cap on any single retry delay, in milliseconds.
    #[serde(default = "default_backoff_max_ms")]
    pub backoff_max_ms: u64,

    /// How long a succeeded load stays joinable. Zero evicts at once.
    #[serde(default)]
    pub success_linger_ms: u64,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            retries: Retries::DEFAULT,
            backoff_base_ms: default_backoff_base_ms(),
            backoff_max_ms: default_backoff_max_ms(),
            success_linger_ms: 0,
        }
    }
}

impl LoaderConfig {
    /// Coordinator tuning derived from this section.
    #[must_use]
    pub fn coordinator_config(&self) -> CoordinatorConfig {
        let success_retention = if self.success_linger_ms == 0 {
            SuccessRetention::EvictImmediately
        } else {
            SuccessRetention::Linger(Duration::from_millis(self.success_linger_ms))
        };
        CoordinatorConfig {
            retry_policy: RetryPolicy {
                base_delay: Duration::from_millis(self.backoff_base_ms),
                max_delay: Duration::from_millis(self.backoff_max_ms.max(self.backoff_base_ms)),
            },
            success_retention,
        }
    }
}

/// Native cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Disk cache directory; platform cache dir when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,

    /// Payloads kept in memory.
    #[serde(default = "default_memory_capacity")]
    pub memory_capacity: usize,

    /// HTTP request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: None,
            memory_capacity: default_memory_capacity(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Bundled asset configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssetsConfig {
    /// Root holding the `blasted-image/` directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

/// Download settings shared by every request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Headers attached to every download, e.g. an `Authorization` token.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
}

const fn default_backoff_base_ms() -> u64 {
    50
}

const fn default_backoff_max_ms() -> u64 {
    800
}

const fn default_memory_capacity() -> usize {
    DEFAULT_CACHE_SIZE
}

const fn default_timeout_secs() -> u64 {
    30
}

impl AppConfig {
    /// Merges CLI arguments into the configuration.
    pub fn merge_with_args(&mut self, args: &CliArgs) {
        if let Some(config_path) = &args.config {
            self.config = Some(config_path.clone());
        }
        if let Some(log_path) = &args.log_path {
            self.log_path = Some(log_path.clone());
        }
        if let Some(log_level) = args.log_level {
            self.log_level = log_level;
        }
        if let Some(cache_dir) = &args.cache_dir {
            self.cache.dir = Some(cache_dir.clone());
        }
        if let Some(assets_dir) = &args.assets_dir {
            self.assets.dir = Some(assets_dir.clone());
        }
    }

    /// Settings for the HTTP loader.
    #[must_use]
    pub fn http_port_config(&self) -> HttpPortConfig {
        HttpPortConfig {
            cache_dir: self.cache.dir.clone(),
            memory_capacity: self.cache.memory_capacity,
            timeout_secs: self.cache.timeout_secs,
            assets_dir: self.assets.dir.clone(),
            headers: self.http.headers.clone(),
        }
    }
}
