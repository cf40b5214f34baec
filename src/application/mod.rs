//! Application layer: load coordination, preloading and the module facade.

/// Load progress events.
pub mod events;
/// Imperative image API.
pub mod image_module;
/// Registry, coordinator and preload services.
pub mod services;

pub use events::{CacheScope, EventSink, ImageEvent};
pub use image_module::ImageModule;
pub use services::{
    CoordinatorConfig, InFlightRegistry, PendingOperation, PreloadOrchestrator, PreloadSummary,
    RetryCoordinator, RetryPolicy, SuccessRetention,
};
