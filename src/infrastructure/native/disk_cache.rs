//! Disk-based image cache persisting raw payloads across runs.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use tokio::fs;
use tracing::{debug, trace, warn};

use crate::domain::errors::LoadError;

use super::image_id::ImageId;

const ENTRY_EXTENSION: &str = "img";

/// Disk cache storing one file per image.
pub struct DiskImageCache {
    cache_dir: PathBuf,
    current_size: AtomicU64,
    item_count: AtomicUsize,
}

impl DiskImageCache {
    /// Opens (creating if needed) a disk cache in `cache_dir`.
    ///
    /// # Errors
    /// Returns error if the directory cannot be created or listed.
    pub async fn new(cache_dir: PathBuf) -> Result<Self, LoadError> {
        fs::create_dir_all(&cache_dir)
            .await
            .map_err(|e| LoadError::io(format!("Failed to create cache dir: {e}")))?;

        let mut total_size = 0u64;
        let mut count = 0usize;
        let mut entries = fs::read_dir(&cache_dir)
            .await
            .map_err(|e| LoadError::io(format!("Failed to read cache dir: {e}")))?;

        while let Ok(Some(entry)) = entries.next_entry().await {
            if is_entry(&entry.path())
                && let Ok(meta) = entry.metadata().await
            {
                total_size += meta.len();
                count += 1;
            }
        }

        debug!(dir = %cache_dir.display(), count, total_size, "Opened disk cache");
        Ok(Self {
            cache_dir,
            current_size: AtomicU64::new(total_size),
            item_count: AtomicUsize::new(count),
        })
    }

    /// Directory holding the cache files.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.cache_dir
    }

    fn cache_path(&self, id: &ImageId) -> PathBuf {
        self.cache_dir.join(format!("{}.{ENTRY_EXTENSION}", id.as_str()))
    }

    /// Reads a cached payload.
    pub async fn get_bytes(&self, id: &ImageId) -> Option<Vec<u8>> {
        let path = self.cache_path(id);
        if let Ok(bytes) = fs::read(&path).await {
            trace!(id = %id, path = %path.display(), "Disk cache hit");
            Some(bytes)
        } else {
            trace!(id = %id, "Disk cache miss");
            None
        }
    }

    /// Stores a payload, replacing any previous one.
    ///
    /// The bytes land in a temporary file that is renamed over the entry, so
    /// readers see either the old payload or the new one, never a torn file.
    ///
    /// # Errors
    /// Returns error if the temporary file cannot be written or persisted.
    pub async fn put_bytes(&self, id: &ImageId, bytes: &[u8]) -> Result<(), LoadError> {
        let path = self.cache_path(id);
        let old_size = fs::metadata(&path).await.map(|m| m.len()).ok();

        let dir = self.cache_dir.clone();
        let target = path.clone();
        let data = bytes.to_vec();
        tokio::task::spawn_blocking(move || -> std::io::Result<()> {
            let mut temp = tempfile::NamedTempFile::new_in(&dir)?;
            temp.write_all(&data)?;
            temp.persist(&target).map_err(|e| e.error)?;
            Ok(())
        })
        .await
        .map_err(|e| LoadError::io(format!("Cache write task failed: {e}")))?
        .map_err(|e| LoadError::io(format!("Failed to write cache file: {e}")))?;

        let new_size = bytes.len() as u64;
        if let Some(old) = old_size {
            if new_size > old {
                self.current_size.fetch_add(new_size - old, Ordering::Relaxed);
            } else {
                self.current_size.fetch_sub(old - new_size, Ordering::Relaxed);
            }
        } else {
            self.current_size.fetch_add(new_size, Ordering::Relaxed);
            self.item_count.fetch_add(1, Ordering::Relaxed);
        }

        debug!(id = %id, path = %path.display(), size = bytes.len(), "Stored image in disk cache");
        Ok(())
    }

    /// Removes one payload. Returns true if an entry was deleted.
    pub async fn evict(&self, id: &ImageId) -> bool {
        let path = self.cache_path(id);
        let Ok(meta) = fs::metadata(&path).await else {
            return false;
        };
        if fs::remove_file(&path).await.is_err() {
            warn!(path = %path.display(), "Failed to evict cache file");
            return false;
        }
        self.current_size
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |size| {
                Some(size.saturating_sub(meta.len()))
            })
            .ok();
        self.item_count
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |count| {
                Some(count.saturating_sub(1))
            })
            .ok();
        debug!(id = %id, "Evicted disk cache entry");
        true
    }

    /// Removes every cached payload.
    ///
    /// # Errors
    /// Returns error if the directory cannot be listed.
    pub async fn clear(&self) -> Result<(), LoadError> {
        let mut entries = fs::read_dir(&self.cache_dir)
            .await
            .map_err(|e| LoadError::io(format!("Failed to read cache dir: {e}")))?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| LoadError::io(format!("Failed to read entry: {e}")))?
        {
            let path = entry.path();
            if is_entry(&path) && fs::remove_file(&path).await.is_err() {
                warn!(path = %path.display(), "Failed to remove cache file");
            }
        }
        self.current_size.store(0, Ordering::Relaxed);
        self.item_count.store(0, Ordering::Relaxed);
        debug!("Cleared disk cache");
        Ok(())
    }

    /// Total bytes stored.
    #[must_use]
    pub fn current_size(&self) -> u64 {
        self.current_size.load(Ordering::Relaxed)
    }

    /// Number of cached files.
    #[must_use]
    pub fn len(&self) -> usize {
        self.item_count.load(Ordering::Relaxed)
    }

    /// Returns true if nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Platform cache directory for image payloads.
#[must_use]
pub fn default_cache_dir() -> PathBuf {
    directories::ProjectDirs::from("com", "blasted", "blasted-image").map_or_else(
        || std::env::temp_dir().join("blasted-image").join("images"),
        |dirs| dirs.cache_dir().join("images"),
    )
}

fn is_entry(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == ENTRY_EXTENSION)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn create_test_cache() -> (DiskImageCache, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let cache = DiskImageCache::new(temp_dir.path().to_path_buf())
            .await
            .unwrap();
        (cache, temp_dir)
    }

    #[tokio::test]
    async fn test_put_and_get_bytes() {
        let (cache, _temp) = create_test_cache().await;
        let id = ImageId::new("test1");

        cache.put_bytes(&id, b"test image data").await.unwrap();

        assert_eq!(cache.get_bytes(&id).await.as_deref(), Some(&b"test image data"[..]));
    }

    #[tokio::test]
    async fn test_cache_miss() {
        let (cache, _temp) = create_test_cache().await;
        assert!(cache.get_bytes(&ImageId::new("nonexistent")).await.is_none());
    }

    #[tokio::test]
    async fn test_counters_track_overwrites_and_clear() {
        let (cache, _temp) = create_test_cache().await;

        cache.put_bytes(&ImageId::new("a"), b"hello").await.unwrap();
        cache.put_bytes(&ImageId::new("b"), b"world!").await.unwrap();
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.current_size(), 11);

        cache.put_bytes(&ImageId::new("a"), b"hey").await.unwrap();
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.current_size(), 9);

        cache.clear().await.unwrap();
        assert!(cache.is_empty());
        assert_eq!(cache.current_size(), 0);
        assert!(cache.get_bytes(&ImageId::new("a")).await.is_none());
    }

    #[tokio::test]
    async fn test_evict_removes_entry_and_updates_counters() {
        let (cache, _temp) = create_test_cache().await;
        let id = ImageId::new("a");
        cache.put_bytes(&id, b"hello").await.unwrap();

        assert!(cache.evict(&id).await);
        assert!(!cache.evict(&id).await);

        assert!(cache.get_bytes(&id).await.is_none());
        assert!(cache.is_empty());
        assert_eq!(cache.current_size(), 0);
    }

    #[tokio::test]
    async fn test_put_leaves_only_the_entry_behind() {
        let (cache, temp) = create_test_cache().await;
        let id = ImageId::new("a");

        cache.put_bytes(&id, b"first").await.unwrap();
        cache.put_bytes(&id, b"second").await.unwrap();

        let names: Vec<_> = std::fs::read_dir(temp.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, vec!["a.img".to_owned()]);
        assert_eq!(cache.get_bytes(&id).await.as_deref(), Some(&b"second"[..]));
    }

    #[tokio::test]
    async fn test_reopen_counts_existing_entries() {
        let temp_dir = TempDir::new().unwrap();
        {
            let cache = DiskImageCache::new(temp_dir.path().to_path_buf()).await.unwrap();
            cache.put_bytes(&ImageId::new("a"), b"1234").await.unwrap();
        }
        std::fs::write(temp_dir.path().join("notes.txt"), b"ignored").unwrap();

        let reopened = DiskImageCache::new(temp_dir.path().to_path_buf()).await.unwrap();
        assert_eq!(reopened.len(), 1);
        assert_eq!(reopened.current_size(), 4);
    }
}
