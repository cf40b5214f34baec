//! Image load error types.

use thiserror::Error;

/// Message returned when the native loader cannot be reached.
pub const LINKING_HINT: &str = "the native image loader is not available. Make sure the \
     platform module is linked into the build and that the host was rebuilt after installing it";

/// Image load error variants.
///
/// Cloneable because one failure is delivered to every caller joined to the
/// same in-flight load.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[allow(missing_docs)]
pub enum LoadError {
    #[error("native image loader not linked: {reason}")]
    NotLinked { reason: String },

    #[error("native loader failed: {message}")]
    Native { message: String },

    #[error("native loader panicked: {message}")]
    LoaderPanicked { message: String },

    #[error("payload is not a supported image: {message}")]
    InvalidImage { message: String },

    #[error("network error: {message}")]
    Network { message: String },

    #[error("io error: {message}")]
    Io { message: String },

    #[error("load was abandoned before reaching a terminal state")]
    Abandoned,
}

impl LoadError {
    /// Creates a not-linked error with the standard hint appended.
    #[must_use]
    pub fn not_linked(reason: impl Into<String>) -> Self {
        Self::NotLinked {
            reason: format!("{}; {LINKING_HINT}", reason.into()),
        }
    }

    /// Creates a generic native failure.
    #[must_use]
    pub fn native(message: impl Into<String>) -> Self {
        Self::Native {
            message: message.into(),
        }
    }

    /// Creates a loader panic error.
    #[must_use]
    pub fn loader_panicked(message: impl Into<String>) -> Self {
        Self::LoaderPanicked {
            message: message.into(),
        }
    }

    /// Creates an invalid image error.
    #[must_use]
    pub fn invalid_image(message: impl Into<String>) -> Self {
        Self::InvalidImage {
            message: message.into(),
        }
    }

    /// Creates a network error.
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Creates an io error.
    #[must_use]
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for LoadError {
    fn from(error: std::io::Error) -> Self {
        Self::io(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_linked_carries_hint() {
        let error = LoadError::not_linked("module missing");
        let text = error.to_string();
        assert!(text.contains("module missing"));
        assert!(text.contains("rebuilt"));
    }
}
