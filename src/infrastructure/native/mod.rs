//! Reference native loader: HTTP downloads, byte caches and bundled assets.

mod disk_cache;
mod http_port;
mod hybrid_assets;
mod image_id;
mod memory_cache;

pub use disk_cache::{DiskImageCache, default_cache_dir};
pub use http_port::{HttpImagePort, HttpPortConfig, LoadSource};
pub use hybrid_assets::{ASSET_PREFIX, AssetResolver, extract_asset_path};
pub use image_id::ImageId;
pub use memory_cache::{DEFAULT_CACHE_SIZE, MemoryImageCache};
