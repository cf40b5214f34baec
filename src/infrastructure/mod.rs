//! Infrastructure layer: configuration and the reference native loader.

/// Application configuration.
pub mod config;
/// HTTP-backed native loader with memory, disk and bundled-asset tiers.
pub mod native;

pub use config::{AppConfig, CliArgs, ConfigError, ConfigStore, LogLevel};
pub use native::{HttpImagePort, HttpPortConfig, LoadSource};
