//! Load request value types.

use std::convert::Infallible;
use std::fmt;
use std::num::NonZeroU32;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::key::RequestKey;

/// Number of native load attempts a request may use.
///
/// Always at least one. Every constructor normalizes its input instead of
/// failing: non-positive and non-numeric values become a single attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Retries(NonZeroU32);

impl Retries {
    /// Budget used when the caller does not pick one.
    pub const DEFAULT: Self = match NonZeroU32::new(3) {
        Some(attempts) => Self(attempts),
        None => Self::ONCE,
    };

    /// A single attempt, no retry loop.
    pub const ONCE: Self = Self(NonZeroU32::MIN);

    /// Normalizes an integer attempt count.
    #[must_use]
    pub fn new(attempts: i64) -> Self {
        let clamped = u32::try_from(attempts.max(1)).unwrap_or(u32::MAX);
        NonZeroU32::new(clamped).map_or(Self::ONCE, Self)
    }

    /// Normalizes a floating point attempt count, flooring fractions.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn from_f64(attempts: f64) -> Self {
        if attempts.is_finite() && attempts >= 1.0 {
            Self::new(attempts.floor().min(f64::from(u32::MAX)) as i64)
        } else {
            Self::ONCE
        }
    }

    /// Parses user input leniently. Anything that is not a number yields
    /// [`Retries::ONCE`].
    #[must_use]
    pub fn from_lenient_str(value: &str) -> Self {
        let trimmed = value.trim();
        if let Ok(int) = trimmed.parse::<i64>() {
            return Self::new(int);
        }
        trimmed
            .parse::<f64>()
            .map_or(Self::ONCE, Self::from_f64)
    }

    /// Returns the number of attempts.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0.get()
    }
}

impl Default for Retries {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for Retries {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for Retries {
    fn from(value: i64) -> Self {
        Self::new(value)
    }
}

impl FromStr for Retries {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from_lenient_str(s))
    }
}

impl<'de> Deserialize<'de> for Retries {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        crate::domain::serde_utils::lenient_retries::deserialize(deserializer)
    }
}

impl Serialize for Retries {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_u32(self.get())
    }
}

/// One request to bring an image into the native cache.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoadRequest {
    uri: String,
    #[serde(default, alias = "skipMemoryCache")]
    skip_memory_cache: bool,
    #[serde(default, alias = "hybridAssets")]
    hybrid_assets: bool,
    #[serde(default, alias = "cloudUrl")]
    cloud_url: Option<String>,
    #[serde(default)]
    retries: Retries,
}

impl LoadRequest {
    /// Creates a request for `uri` with default options.
    #[must_use]
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            skip_memory_cache: false,
            hybrid_assets: false,
            cloud_url: None,
            retries: Retries::DEFAULT,
        }
    }

    /// Keeps the image out of the native memory cache.
    #[must_use]
    pub const fn skip_memory_cache(mut self, skip: bool) -> Self {
        self.skip_memory_cache = skip;
        self
    }

    /// Prefers a bundled local asset, using `cloud_url` as the base to strip.
    #[must_use]
    pub const fn hybrid_assets(mut self, enabled: bool) -> Self {
        self.hybrid_assets = enabled;
        self
    }

    /// Sets the remote base URL used for hybrid asset lookup.
    #[must_use]
    pub fn cloud_url(mut self, cloud_url: impl Into<String>) -> Self {
        self.cloud_url = Some(cloud_url.into());
        self
    }

    /// Sets or clears the remote base URL.
    #[must_use]
    pub fn maybe_cloud_url(mut self, cloud_url: Option<String>) -> Self {
        self.cloud_url = cloud_url;
        self
    }

    /// Sets the attempt budget.
    #[must_use]
    pub const fn retries(mut self, retries: Retries) -> Self {
        self.retries = retries;
        self
    }

    /// Image URI.
    #[must_use]
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Whether the memory cache is bypassed.
    #[must_use]
    pub const fn skips_memory_cache(&self) -> bool {
        self.skip_memory_cache
    }

    /// Whether hybrid local assets are requested.
    #[must_use]
    pub const fn uses_hybrid_assets(&self) -> bool {
        self.hybrid_assets
    }

    /// Base URL for hybrid assets, if any.
    #[must_use]
    pub fn cloud_url_str(&self) -> Option<&str> {
        self.cloud_url.as_deref()
    }

    /// Attempt budget.
    #[must_use]
    pub const fn retry_budget(&self) -> Retries {
        self.retries
    }

    /// Returns true when hybrid assets are on without a base URL to fall
    /// back to.
    #[must_use]
    pub const fn has_orphan_hybrid_assets(&self) -> bool {
        self.hybrid_assets && self.cloud_url.is_none()
    }

    /// Turns hybrid assets off when no base URL is present. The second value
    /// reports whether anything changed.
    #[must_use]
    pub fn sanitized(mut self) -> (Self, bool) {
        let downgraded = self.has_orphan_hybrid_assets();
        if downgraded {
            self.hybrid_assets = false;
        }
        (self, downgraded)
    }

    /// Deduplication key for this request. Retries are not part of it.
    #[must_use]
    pub fn key(&self) -> RequestKey {
        RequestKey::build(
            &self.uri,
            self.skip_memory_cache,
            self.hybrid_assets,
            self.cloud_url.as_deref(),
        )
    }
}

/// Input accepted by preload: one request or a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreloadInput {
    /// A single request.
    Single(LoadRequest),
    /// Any number of requests, loaded concurrently.
    Batch(Vec<LoadRequest>),
}

impl PreloadInput {
    /// Flattens the input into a list of requests.
    #[must_use]
    pub fn into_requests(self) -> Vec<LoadRequest> {
        match self {
            Self::Single(request) => vec![request],
            Self::Batch(requests) => requests,
        }
    }
}

impl From<LoadRequest> for PreloadInput {
    fn from(request: LoadRequest) -> Self {
        Self::Single(request)
    }
}

impl From<Vec<LoadRequest>> for PreloadInput {
    fn from(requests: Vec<LoadRequest>) -> Self {
        Self::Batch(requests)
    }
}
