use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::application::events::CacheScope;
use crate::domain::entities::Retries;

use super::app_config::LogLevel;

#[derive(Debug, Parser)]
#[command(
    name = "blasted-image",
    version,
    about = "Deduplicating, retrying image preloader with memory and disk caching",
    long_about = None
)]
pub struct CliArgs {
    /// Configuration file path.
    #[arg(short, long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Log file path.
    #[arg(long, value_name = "PATH", global = true)]
    pub log_path: Option<PathBuf>,

    /// Log verbosity level.
    #[arg(long, value_enum, global = true)]
    pub log_level: Option<LogLevel>,

    /// Disk cache directory.
    #[arg(long, value_name = "PATH", global = true)]
    pub cache_dir: Option<PathBuf>,

    /// Root of the bundled hybrid assets.
    #[arg(long, value_name = "PATH", global = true)]
    pub assets_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Load one image into the cache.
    Load {
        /// Image URI.
        uri: String,

        #[command(flatten)]
        options: RequestOptions,
    },
    /// Preload a batch of images.
    Preload {
        /// Image URIs.
        uris: Vec<String>,

        /// TOML (`[[images]]`) or JSON manifest of requests.
        #[arg(short, long, value_name = "FILE")]
        manifest: Option<PathBuf>,

        #[command(flatten)]
        options: RequestOptions,
    },
    /// Clear native caches.
    Clear {
        /// Which cache to clear.
        #[arg(value_enum)]
        target: ClearTarget,
    },
}

/// Per-request flags shared by `load` and `preload`.
#[derive(Debug, Clone, Default, Args)]
pub struct RequestOptions {
    /// Bypass the memory cache; store to disk only.
    #[arg(long)]
    pub skip_memory_cache: bool,

    /// Serve bundled copies of cloud images when present.
    #[arg(long)]
    pub hybrid_assets: bool,

    /// Cloud storage base URL stripped to find bundled copies.
    #[arg(long, value_name = "URL")]
    pub cloud_url: Option<String>,

    /// Attempts per image; non-numeric values mean one attempt.
    #[arg(long, value_name = "N", allow_hyphen_values = true)]
    pub retries: Option<Retries>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ClearTarget {
    Memory,
    Disk,
    All,
}

impl From<ClearTarget> for CacheScope {
    fn from(target: ClearTarget) -> Self {
        match target {
            ClearTarget::Memory => Self::Memory,
            ClearTarget::Disk => Self::Disk,
            ClearTarget::All => Self::All,
        }
    }
}
