//! Port definition for the native image loader.

use async_trait::async_trait;

use crate::domain::errors::LoadError;

/// Platform capability that actually fetches, caches and decodes images.
///
/// The coordinator treats it as a black box that may fail transiently.
/// Implementations must be thread-safe.
#[async_trait]
pub trait NativeImagePort: Send + Sync {
    /// Brings one image into the native cache.
    #[allow(clippy::fn_params_excessive_bools)]
    async fn load_image(
        &self,
        uri: &str,
        skip_memory_cache: bool,
        hybrid_assets: bool,
        cloud_url: Option<&str>,
    ) -> Result<(), LoadError>;

    /// Clears the memory cache.
    async fn clear_memory_cache(&self) -> Result<(), LoadError>;

    /// Clears the disk cache.
    async fn clear_disk_cache(&self) -> Result<(), LoadError>;

    /// Clears both caches.
    async fn clear_all_caches(&self) -> Result<(), LoadError> {
        self.clear_memory_cache().await?;
        self.clear_disk_cache().await
    }

    /// Reports whether the loader is usable at all.
    ///
    /// # Errors
    /// Returns [`LoadError::NotLinked`] when the platform module is missing.
    fn check_linked(&self) -> Result<(), LoadError> {
        Ok(())
    }
}
