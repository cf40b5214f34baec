//! Reference native loader backed by HTTP and a two-tier byte cache.
//!
//! Resolution order: bundled asset -> memory -> disk -> network.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use tracing::{debug, info, warn};

use crate::domain::errors::LoadError;
use crate::domain::ports::NativeImagePort;

use super::disk_cache::{DiskImageCache, default_cache_dir};
use super::hybrid_assets::AssetResolver;
use super::image_id::ImageId;
use super::memory_cache::{DEFAULT_CACHE_SIZE, MemoryImageCache};

/// Where a load was satisfied from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadSource {
    /// Bundled asset on disk.
    Local,
    /// In-memory cache.
    Memory,
    /// Disk cache.
    Disk,
    /// Downloaded.
    Network,
}

impl std::fmt::Display for LoadSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tag = match self {
            Self::Local => "(LOCAL)",
            Self::Memory => "(MEMORY)",
            Self::Disk => "(DISK)",
            Self::Network => "(NETWORK)",
        };
        f.write_str(tag)
    }
}

/// Settings for [`HttpImagePort`].
#[derive(Debug, Clone)]
pub struct HttpPortConfig {
    /// Disk cache directory; platform cache dir when `None`.
    pub cache_dir: Option<PathBuf>,
    /// Payloads kept in memory.
    pub memory_capacity: usize,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Root of the bundled assets; hybrid lookups are skipped when `None`.
    pub assets_dir: Option<PathBuf>,
    /// Headers sent with every download.
    pub headers: BTreeMap<String, String>,
}

impl Default for HttpPortConfig {
    fn default() -> Self {
        Self {
            cache_dir: None,
            memory_capacity: DEFAULT_CACHE_SIZE,
            timeout_secs: 30,
            assets_dir: None,
            headers: BTreeMap::new(),
        }
    }
}

/// [`NativeImagePort`] that fetches over HTTP and caches raw payloads.
pub struct HttpImagePort {
    memory_cache: Arc<MemoryImageCache>,
    disk_cache: Arc<DiskImageCache>,
    assets: Option<AssetResolver>,
    http_client: reqwest::Client,
}

impl HttpImagePort {
    /// Opens the caches and builds the HTTP client.
    ///
    /// # Errors
    /// Returns error if the disk cache or HTTP client cannot be created.
    pub async fn open(config: HttpPortConfig) -> Result<Self, LoadError> {
        let cache_dir = config.cache_dir.unwrap_or_else(default_cache_dir);
        let disk_cache = Arc::new(DiskImageCache::new(cache_dir).await?);

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(header_map(&config.headers)?)
            .build()
            .map_err(|e| LoadError::network(format!("Failed to create HTTP client: {e}")))?;

        info!(
            cache_dir = %disk_cache.dir().display(),
            memory_capacity = config.memory_capacity,
            assets = ?config.assets_dir,
            headers = config.headers.len(),
            "HTTP image loader ready"
        );

        Ok(Self {
            memory_cache: Arc::new(MemoryImageCache::new(config.memory_capacity)),
            disk_cache,
            assets: config.assets_dir.map(AssetResolver::new),
            http_client,
        })
    }

    /// Memory tier, exposed for inspection.
    #[must_use]
    pub fn memory_cache(&self) -> &MemoryImageCache {
        &self.memory_cache
    }

    /// Disk tier, exposed for inspection.
    #[must_use]
    pub fn disk_cache(&self) -> &DiskImageCache {
        &self.disk_cache
    }

    /// Resolves `uri` through every tier and reports where it came from.
    ///
    /// # Errors
    /// Returns error if every tier misses and the download fails, or if the
    /// payload is not a recognizable image.
    pub async fn fetch(
        &self,
        uri: &str,
        skip_memory_cache: bool,
        hybrid_assets: bool,
        cloud_url: Option<&str>,
    ) -> Result<LoadSource, LoadError> {
        if hybrid_assets
            && let (Some(assets), Some(cloud_url)) = (&self.assets, cloud_url)
            && let Some(path) = assets.locate(uri, cloud_url).await
        {
            let bytes = tokio::fs::read(&path).await?;
            validate(&bytes)?;
            debug!("{} {}", LoadSource::Local, path.display());
            return Ok(LoadSource::Local);
        }

        let id = ImageId::from_uri(uri);

        if !skip_memory_cache && self.memory_cache.get(&id).await.is_some() {
            debug!("{} {uri}", LoadSource::Memory);
            return Ok(LoadSource::Memory);
        }

        if let Some(bytes) = self.disk_cache.get_bytes(&id).await {
            match validate(&bytes) {
                Ok(()) => {
                    if !skip_memory_cache {
                        self.memory_cache.put(id, Bytes::from(bytes)).await;
                    }
                    debug!("{} {uri}", LoadSource::Disk);
                    return Ok(LoadSource::Disk);
                }
                Err(e) => {
                    warn!(uri = %uri, error = %e, "Dropping unreadable disk cache entry");
                    self.disk_cache.evict(&id).await;
                }
            }
        }

        let bytes = self.download(uri).await?;
        validate(&bytes)?;
        self.disk_cache.put_bytes(&id, &bytes).await?;
        if !skip_memory_cache {
            self.memory_cache.put(id, bytes).await;
        }
        debug!("{} {uri}", LoadSource::Network);
        Ok(LoadSource::Network)
    }

    async fn download(&self, url: &str) -> Result<Bytes, LoadError> {
        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| LoadError::network(format!("Request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(LoadError::network(format!(
                "HTTP {}: {}",
                response.status(),
                response.status().canonical_reason().unwrap_or("Unknown")
            )));
        }

        response
            .bytes()
            .await
            .map_err(|e| LoadError::network(format!("Failed to read body: {e}")))
    }
}

fn header_map(headers: &BTreeMap<String, String>) -> Result<HeaderMap, LoadError> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| LoadError::network(format!("Invalid header name {name:?}: {e}")))?;
        let header_value = HeaderValue::from_str(value)
            .map_err(|e| LoadError::network(format!("Invalid value for header {name}: {e}")))?;
        map.insert(header_name, header_value);
    }
    Ok(map)
}

fn validate(bytes: &[u8]) -> Result<(), LoadError> {
    image::guess_format(bytes)
        .map(|_| ())
        .map_err(|e| LoadError::invalid_image(e.to_string()))
}

#[async_trait]
impl NativeImagePort for HttpImagePort {
    async fn load_image(
        &self,
        uri: &str,
        skip_memory_cache: bool,
        hybrid_assets: bool,
        cloud_url: Option<&str>,
    ) -> Result<(), LoadError> {
        self.fetch(uri, skip_memory_cache, hybrid_assets, cloud_url)
            .await
            .map(|_| ())
    }

    async fn clear_memory_cache(&self) -> Result<(), LoadError> {
        self.memory_cache.clear().await;
        Ok(())
    }

    async fn clear_disk_cache(&self) -> Result<(), LoadError> {
        self.disk_cache.clear().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread::JoinHandle;
    use tempfile::TempDir;

    const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";
    const CLOUD: &str = "https://storage.example.com/o/";
    const UNREACHABLE: &str = "http://127.0.0.1:9/missing.png";

    async fn port_in(temp: &TempDir) -> HttpImagePort {
        HttpImagePort::open(HttpPortConfig {
            cache_dir: Some(temp.path().join("cache")),
            memory_capacity: 8,
            timeout_secs: 2,
            assets_dir: Some(temp.path().join("assets")),
            headers: BTreeMap::new(),
        })
        .await
        .unwrap()
    }

    /// Answers `connections` requests with `body` and returns each request head.
    fn serve(body: &'static [u8], connections: usize) -> (String, JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/image.png", listener.local_addr().unwrap());
        let server = std::thread::spawn(move || {
            let mut heads = Vec::new();
            for stream in listener.incoming().take(connections) {
                let mut stream = stream.unwrap();
                let mut head = Vec::new();
                let mut chunk = [0u8; 1024];
                while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                    let n = stream.read(&mut chunk).unwrap();
                    if n == 0 {
                        break;
                    }
                    head.extend_from_slice(&chunk[..n]);
                }
                heads.push(String::from_utf8_lossy(&head).to_ascii_lowercase());
                write!(
                    stream,
                    "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                    body.len()
                )
                .unwrap();
                stream.write_all(body).unwrap();
            }
            heads
        });
        (url, server)
    }

    #[tokio::test]
    async fn test_bundled_asset_served_without_network() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("assets/blasted-image");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("logo.png"), PNG_MAGIC).unwrap();
        let port = port_in(&temp).await;

        let source = port
            .fetch(&format!("{CLOUD}logo.png?alt=media"), false, true, Some(CLOUD))
            .await
            .unwrap();

        assert_eq!(source, LoadSource::Local);
    }

    #[tokio::test]
    async fn test_disk_hit_promotes_to_memory() {
        let temp = TempDir::new().unwrap();
        let port = port_in(&temp).await;
        port.disk_cache()
            .put_bytes(&ImageId::from_uri(UNREACHABLE), PNG_MAGIC)
            .await
            .unwrap();

        let first = port.fetch(UNREACHABLE, false, false, None).await.unwrap();
        let second = port.fetch(UNREACHABLE, false, false, None).await.unwrap();

        assert_eq!(first, LoadSource::Disk);
        assert_eq!(second, LoadSource::Memory);
    }

    #[tokio::test]
    async fn test_skip_memory_cache_bypasses_memory_tier() {
        let temp = TempDir::new().unwrap();
        let port = port_in(&temp).await;
        port.disk_cache()
            .put_bytes(&ImageId::from_uri(UNREACHABLE), PNG_MAGIC)
            .await
            .unwrap();

        port.fetch(UNREACHABLE, true, false, None).await.unwrap();
        let again = port.fetch(UNREACHABLE, true, false, None).await.unwrap();

        assert_eq!(again, LoadSource::Disk);
        assert_eq!(port.memory_cache().len().await, 0);
    }

    #[tokio::test]
    async fn test_corrupt_disk_entry_is_evicted_and_refetched() {
        let temp = TempDir::new().unwrap();
        let port = port_in(&temp).await;
        let (url, server) = serve(PNG_MAGIC, 1);
        let id = ImageId::from_uri(&url);
        port.disk_cache().put_bytes(&id, b"\x89PN").await.unwrap();

        let first = port.fetch(&url, false, false, None).await.unwrap();
        let second = port.fetch(&url, true, false, None).await.unwrap();

        assert_eq!(first, LoadSource::Network);
        assert_eq!(second, LoadSource::Disk);
        assert_eq!(port.disk_cache().get_bytes(&id).await.as_deref(), Some(PNG_MAGIC));
        assert_eq!(server.join().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_corrupt_disk_entry_dropped_when_network_fails() {
        let temp = TempDir::new().unwrap();
        let port = port_in(&temp).await;
        let id = ImageId::from_uri(UNREACHABLE);
        port.disk_cache().put_bytes(&id, b"<html>nope</html>").await.unwrap();

        let result = port.fetch(UNREACHABLE, false, false, None).await;

        assert!(matches!(result, Err(LoadError::Network { .. })));
        assert!(port.disk_cache().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_download_rejected_and_not_cached() {
        let temp = TempDir::new().unwrap();
        let port = port_in(&temp).await;
        let (url, server) = serve(b"<html>nope</html>", 1);

        let result = port.fetch(&url, false, false, None).await;

        assert!(matches!(result, Err(LoadError::InvalidImage { .. })));
        assert!(port.disk_cache().is_empty());
        server.join().unwrap();
    }

    #[tokio::test]
    async fn test_configured_headers_sent_with_download() {
        let temp = TempDir::new().unwrap();
        let port = HttpImagePort::open(HttpPortConfig {
            cache_dir: Some(temp.path().join("cache")),
            timeout_secs: 2,
            headers: BTreeMap::from([
                ("Authorization".to_owned(), "Bearer token".to_owned()),
                ("X-Client".to_owned(), "blasted".to_owned()),
            ]),
            ..HttpPortConfig::default()
        })
        .await
        .unwrap();
        let (url, server) = serve(PNG_MAGIC, 1);

        port.fetch(&url, false, false, None).await.unwrap();

        let heads = server.join().unwrap();
        assert!(heads[0].contains("authorization: bearer token"));
        assert!(heads[0].contains("x-client: blasted"));
    }

    #[tokio::test]
    async fn test_invalid_header_fails_open() {
        let temp = TempDir::new().unwrap();
        let result = HttpImagePort::open(HttpPortConfig {
            cache_dir: Some(temp.path().join("cache")),
            headers: BTreeMap::from([("bad header".to_owned(), "x".to_owned())]),
            ..HttpPortConfig::default()
        })
        .await;

        assert!(matches!(result, Err(LoadError::Network { .. })));
    }

    #[tokio::test]
    async fn test_network_failure_surfaces_as_network_error() {
        let temp = TempDir::new().unwrap();
        let port = port_in(&temp).await;

        let result = port.load_image(UNREACHABLE, false, false, None).await;

        assert!(matches!(result, Err(LoadError::Network { .. })));
    }

    #[tokio::test]
    async fn test_clear_all_caches_empties_both_tiers() {
        let temp = TempDir::new().unwrap();
        let port = port_in(&temp).await;
        port.disk_cache()
            .put_bytes(&ImageId::from_uri(UNREACHABLE), PNG_MAGIC)
            .await
            .unwrap();
        port.fetch(UNREACHABLE, false, false, None).await.unwrap();

        port.clear_all_caches().await.unwrap();

        assert_eq!(port.memory_cache().len().await, 0);
        assert!(port.disk_cache().is_empty());
    }
}
