//! Cache identifiers for stored image payloads.

use sha2::{Digest, Sha256};

/// Identifier of a cached payload, derived from the image URI.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageId(String);

impl ImageId {
    /// Creates an `ImageId` from an already computed identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Creates an `ImageId` from a URI by hashing it.
    #[must_use]
    pub fn from_uri(uri: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(uri.as_bytes());
        let result = hasher.finalize();
        Self(hex::encode(&result[..16]))
    }

    /// Returns the inner string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ImageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
