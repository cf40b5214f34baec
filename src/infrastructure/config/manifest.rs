//! Preload manifests: batches of load requests read from a file.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::domain::entities::{LoadRequest, PreloadInput};

use super::storage::ConfigError;

/// File format of a manifest, picked from its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestFormat {
    /// `[[images]]` tables.
    Toml,
    /// An array of request objects, or a single object.
    Json,
}

impl ManifestFormat {
    /// Picks the format from the file extension.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()?.to_ascii_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TomlManifest {
    #[serde(default)]
    images: Vec<LoadRequest>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum JsonManifest {
    Batch(Vec<LoadRequest>),
    Single(LoadRequest),
}

impl From<JsonManifest> for PreloadInput {
    fn from(manifest: JsonManifest) -> Self {
        match manifest {
            JsonManifest::Batch(requests) => Self::Batch(requests),
            JsonManifest::Single(request) => Self::Single(request),
        }
    }
}

/// Parses manifest text in the given format.
///
/// # Errors
///
/// Returns `ConfigError` if the text does not match the format.
pub fn parse_manifest(content: &str, format: ManifestFormat) -> Result<PreloadInput, ConfigError> {
    match format {
        ManifestFormat::Toml => {
            let manifest: TomlManifest = toml::from_str(content)?;
            Ok(PreloadInput::Batch(manifest.images))
        }
        ManifestFormat::Json => {
            let manifest: JsonManifest = serde_json::from_str(content)?;
            Ok(manifest.into())
        }
    }
}

/// Reads and parses the manifest at `path`.
///
/// # Errors
///
/// Returns `ConfigError` if the extension is unknown, or the file cannot be
/// read or parsed.
pub fn load_manifest(path: &Path) -> Result<PreloadInput, ConfigError> {
    let format = ManifestFormat::from_path(path)
        .ok_or_else(|| ConfigError::UnsupportedManifest(path.to_path_buf()))?;
    let content = fs::read_to_string(path)?;
    parse_manifest(&content, format)
}
