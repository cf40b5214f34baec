//! Deduplication key for in-flight image loads.

use std::fmt;

/// Identity of a load as far as the native cache is concerned.
///
/// Built from everything that changes *what* gets fetched. The retry budget
/// is not part of it. `cloud_url` is kept verbatim, so `None` and `Some("")`
/// produce different keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestKey {
    uri: String,
    skip_memory_cache: bool,
    hybrid_assets: bool,
    cloud_url: Option<String>,
}

impl RequestKey {
    /// Builds the key for a request tuple.
    #[must_use]
    pub fn build(
        uri: &str,
        skip_memory_cache: bool,
        hybrid_assets: bool,
        cloud_url: Option<&str>,
    ) -> Self {
        Self {
            uri: uri.to_owned(),
            skip_memory_cache,
            hybrid_assets,
            cloud_url: cloud_url.map(str::to_owned),
        }
    }

    /// URI component of the key.
    #[must_use]
    pub fn uri(&self) -> &str {
        &self.uri
    }
}

impl fmt::Display for RequestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.uri)?;
        if self.skip_memory_cache {
            write!(f, " [no-memory]")?;
        }
        if self.hybrid_assets {
            write!(f, " [hybrid]")?;
        }
        match &self.cloud_url {
            Some(base) => write!(f, " [cloud={base:?}]"),
            None => Ok(()),
        }
    }
}
