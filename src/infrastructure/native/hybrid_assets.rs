//! Hybrid asset lookup: serve bundled copies of cloud images when present.

use std::path::{Component, Path, PathBuf};

use tokio::fs;
use tracing::trace;

/// Directory prefix under the assets root holding bundled images.
pub const ASSET_PREFIX: &str = "blasted-image/";

const ALT_MEDIA_MARKER: &str = "?alt=media";

/// Maps a cloud image URI to its relative path in the bundled assets.
///
/// The cloud base URL is stripped, the storage query (`?alt=media...`) is cut
/// and encoded separators are decoded. Returns `None` for paths that would
/// escape the assets root.
#[must_use]
pub fn extract_asset_path(uri: &str, cloud_url: &str) -> Option<String> {
    let stripped = if cloud_url.is_empty() {
        uri.to_owned()
    } else {
        uri.replace(cloud_url, "")
    };
    let path = stripped
        .split(ALT_MEDIA_MARKER)
        .next()
        .unwrap_or_default()
        .replace("%2F", "/");

    let relative = format!("{ASSET_PREFIX}{path}");
    let escapes = Path::new(&relative)
        .components()
        .any(|c| matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_)));
    if escapes {
        trace!(uri = %uri, path = %relative, "Rejected asset path");
        return None;
    }
    Some(relative)
}

/// Resolves bundled assets against a root directory.
#[derive(Debug, Clone)]
pub struct AssetResolver {
    root: PathBuf,
}

impl AssetResolver {
    /// Creates a resolver for `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory of the bundled assets.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the on-disk path of the bundled copy of `uri`, if one exists.
    pub async fn locate(&self, uri: &str, cloud_url: &str) -> Option<PathBuf> {
        let relative = extract_asset_path(uri, cloud_url)?;
        let candidate = self.root.join(&relative);
        match fs::metadata(&candidate).await {
            Ok(meta) if meta.is_file() => Some(candidate),
            _ => {
                trace!(path = %candidate.display(), "No bundled asset");
                None
            }
        }
    }
}
