//! Events emitted while coordinating loads.

use std::fmt;

use tokio::sync::mpsc;

use crate::domain::entities::RequestKey;
use crate::domain::errors::LoadError;

/// Which cache a clear operation targeted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheScope {
    /// In-memory cache only.
    Memory,
    /// On-disk cache only.
    Disk,
    /// Both caches.
    All,
}

impl fmt::Display for CacheScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Memory => write!(f, "memory"),
            Self::Disk => write!(f, "disk"),
            Self::All => write!(f, "all"),
        }
    }
}

/// Notification about the progress of image loads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageEvent {
    /// A load reached `Succeeded`.
    Loaded {
        /// Key of the load.
        key: RequestKey,
        /// Attempts used.
        attempts: u32,
    },
    /// One attempt failed and another will follow.
    AttemptFailed {
        /// Key of the load.
        key: RequestKey,
        /// The attempt that failed.
        attempt: u32,
        /// Why it failed.
        error: LoadError,
    },
    /// A load reached `Failed`.
    Failed {
        /// Key of the load.
        key: RequestKey,
        /// The last cause.
        error: LoadError,
    },
    /// A request was adjusted because its options were inconsistent.
    ConfigurationWarning {
        /// Image URI.
        uri: String,
        /// What was changed.
        message: String,
    },
    /// A cache clear finished.
    CachesCleared(CacheScope),
}

impl fmt::Display for ImageEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Loaded { key, attempts } => write!(f, "loaded {key} after {attempts} attempt(s)"),
            Self::AttemptFailed {
                key,
                attempt,
                error,
            } => write!(f, "attempt {attempt} for {key} failed: {error}"),
            Self::Failed { key, error } => write!(f, "failed {key}: {error}"),
            Self::ConfigurationWarning { uri, message } => {
                write!(f, "configuration warning for {uri}: {message}")
            }
            Self::CachesCleared(scope) => write!(f, "{scope} cache cleared"),
        }
    }
}

/// Optional event sink shared by the coordinator and the module facade.
#[derive(Debug, Clone, Default)]
pub struct EventSink {
    tx: Option<mpsc::UnboundedSender<ImageEvent>>,
}

impl EventSink {
    /// Sink that drops every event.
    #[must_use]
    pub const fn disabled() -> Self {
        Self { tx: None }
    }

    /// Sink forwarding into `tx`.
    #[must_use]
    pub const fn new(tx: mpsc::UnboundedSender<ImageEvent>) -> Self {
        Self { tx: Some(tx) }
    }

    /// Sends an event; a closed receiver is ignored.
    pub fn emit(&self, event: ImageEvent) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(event);
        }
    }
}
