//! Domain error types.

mod load_error;

pub use load_error::{LINKING_HINT, LoadError};
