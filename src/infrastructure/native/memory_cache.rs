//! In-memory LRU cache of image payloads.

use std::num::NonZeroUsize;

use bytes::Bytes;
use lru::LruCache;
use tokio::sync::RwLock;
use tracing::{debug, trace};

use super::image_id::ImageId;

/// Default maximum number of payloads kept in memory.
pub const DEFAULT_CACHE_SIZE: usize = 100;

/// In-memory LRU cache of raw image bytes.
pub struct MemoryImageCache {
    cache: RwLock<LruCache<ImageId, Bytes>>,
}

impl MemoryImageCache {
    /// Creates a new cache with the specified capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: RwLock::new(LruCache::new(cap)),
        }
    }

    /// Gets a payload, promoting it in the LRU.
    pub async fn get(&self, id: &ImageId) -> Option<Bytes> {
        let mut cache = self.cache.write().await;
        if let Some(bytes) = cache.get(id) {
            trace!(id = %id, "Memory cache hit");
            Some(bytes.clone())
        } else {
            trace!(id = %id, "Memory cache miss");
            None
        }
    }

    /// Stores a payload.
    pub async fn put(&self, id: ImageId, bytes: Bytes) {
        let mut cache = self.cache.write().await;
        debug!(id = %id, size = bytes.len(), "Storing image in memory cache");
        cache.put(id, bytes);
    }

    /// Removes every payload.
    pub async fn clear(&self) {
        let mut cache = self.cache.write().await;
        cache.clear();
        debug!("Cleared memory image cache");
    }

    /// Returns the number of cached payloads.
    pub async fn len(&self) -> usize {
        self.cache.read().await.len()
    }
}
