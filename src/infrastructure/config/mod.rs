//! Application configuration.

pub mod app_config;
pub mod args;
pub mod manifest;
pub mod storage;

pub use app_config::{AppConfig, AssetsConfig, CacheConfig, HttpConfig, LoaderConfig, LogLevel};
pub use args::{ClearTarget, CliArgs, Command, RequestOptions};
pub use manifest::{ManifestFormat, load_manifest, parse_manifest};
pub use storage::{ConfigError, ConfigStore};
