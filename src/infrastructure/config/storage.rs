//! Config file discovery and loading.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use thiserror::Error;
use tracing::{info, warn};

use super::app_config::{APP_NAME, APP_ORGANIZATION, APP_QUALIFIER, AppConfig};

const CONFIG_FILE_NAME: &str = "config.toml";

/// Errors raised while reading configuration or manifests.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to determine config directory")]
    ConfigDirNotFound,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("toml serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),
    #[error("toml deserialization error: {0}")]
    TomlDe(#[from] toml::de::Error),
    #[error("json deserialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported manifest format: {0}")]
    UnsupportedManifest(PathBuf),
}

/// Knows where the configuration file lives.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    default_file: PathBuf,
}

impl ConfigStore {
    /// Store rooted in the platform config directory.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ConfigDirNotFound` when the platform has no
    /// home directory to derive it from.
    pub fn platform() -> Result<Self, ConfigError> {
        let dirs = ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME)
            .ok_or(ConfigError::ConfigDirNotFound)?;
        Ok(Self::in_dir(dirs.config_dir()))
    }

    /// Store rooted in `dir`.
    #[must_use]
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            default_file: dir.join(CONFIG_FILE_NAME),
        }
    }

    /// File read when no explicit path is given.
    #[must_use]
    pub fn default_file(&self) -> &Path {
        &self.default_file
    }

    /// Reads the config at `explicit`, or the default file.
    ///
    /// A missing file is seeded with defaults. A file that does not parse is
    /// left as is and defaults are used. The path read is recorded in
    /// [`AppConfig::config`].
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file exists but cannot be read, or a
    /// missing file cannot be seeded.
    pub fn load(&self, explicit: Option<&Path>) -> Result<AppConfig, ConfigError> {
        let path = explicit.unwrap_or(&self.default_file);
        let mut config = match fs::read_to_string(path) {
            Ok(text) => parse_or_default(path, &text),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                let config = AppConfig::default();
                seed(path, &config)?;
                info!(path = %path.display(), "Wrote default config");
                config
            }
            Err(e) => return Err(e.into()),
        };
        config.config = Some(path.to_path_buf());
        Ok(config)
    }
}

fn parse_or_default(path: &Path, text: &str) -> AppConfig {
    toml::from_str(text).unwrap_or_else(|e| {
        warn!(path = %path.display(), error = %e, "Unreadable config, using defaults");
        AppConfig::default()
    })
}

/// Writes `config` through a temp file so a crash never leaves half a file.
fn seed(path: &Path, config: &AppConfig) -> Result<(), ConfigError> {
    let dir = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir)?;

    let text = toml::to_string_pretty(config)?;
    let mut file = tempfile::NamedTempFile::new_in(dir)?;
    file.write_all(text.as_bytes())?;
    file.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::Retries;
    use tempfile::tempdir;

    #[test]
    fn test_missing_default_file_is_seeded() {
        let dir = tempdir().unwrap();
        let store = ConfigStore::in_dir(&dir.path().join("nested"));

        let config = store.load(None).unwrap();

        assert_eq!(config.loader.retries, Retries::DEFAULT);
        assert_eq!(config.config.as_deref(), Some(store.default_file()));
        let written = fs::read_to_string(store.default_file()).unwrap();
        assert!(written.contains("[loader]"));
    }

    #[test]
    fn test_seeded_file_loads_back() {
        let dir = tempdir().unwrap();
        let store = ConfigStore::in_dir(dir.path());

        store.load(None).unwrap();
        let reloaded = store.load(None).unwrap();

        assert_eq!(reloaded.loader.retries, Retries::DEFAULT);
        assert_eq!(reloaded.cache.timeout_secs, 30);
    }

    #[test]
    fn test_malformed_file_falls_back_and_is_kept() {
        let dir = tempdir().unwrap();
        let store = ConfigStore::in_dir(dir.path());
        fs::write(store.default_file(), "invalid_toml = [").unwrap();

        let config = store.load(None).unwrap();

        assert_eq!(config.loader.retries, Retries::DEFAULT);
        let content = fs::read_to_string(store.default_file()).unwrap();
        assert_eq!(content, "invalid_toml = [");
    }

    #[test]
    fn test_explicit_path_wins_over_default() {
        let dir = tempdir().unwrap();
        let store = ConfigStore::in_dir(&dir.path().join("default"));
        let custom = dir.path().join("custom.toml");
        fs::write(&custom, "[loader]\nretries = 7\n").unwrap();

        let config = store.load(Some(&custom)).unwrap();

        assert_eq!(config.loader.retries.get(), 7);
        assert_eq!(config.config, Some(custom));
        assert!(!store.default_file().exists());
    }

    #[test]
    fn test_missing_explicit_path_is_seeded_there() {
        let dir = tempdir().unwrap();
        let store = ConfigStore::in_dir(&dir.path().join("default"));
        let custom = dir.path().join("etc").join("blasted.toml");

        store.load(Some(&custom)).unwrap();

        assert!(custom.exists());
        assert!(!store.default_file().exists());
    }
}
