//! Domain entity definitions.

mod key;
mod outcome;
mod request;

pub use key::RequestKey;
pub use outcome::{LoadOutcome, OperationState};
pub use request::{LoadRequest, PreloadInput, Retries};
