mod native_image_port;

pub use native_image_port::NativeImagePort;

#[cfg(test)]
pub mod mocks {
    pub use super::native_image_port::mock::{RecordedCall, ScriptedImagePort};
}
