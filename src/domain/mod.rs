//! Domain layer with core value types and port definitions.

/// Entity definitions.
pub mod entities;
/// Error types.
pub mod errors;
/// Port definitions.
pub mod ports;
/// Serde utilities.
pub mod serde_utils;

pub use entities::{LoadOutcome, LoadRequest, OperationState, PreloadInput, RequestKey, Retries};
pub use errors::LoadError;
pub use ports::NativeImagePort;
