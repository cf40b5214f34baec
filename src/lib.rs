//! Blasted Image - deduplicating, retrying image preloader.
//!
//! Concurrent requests for the same image share one native load; failed
//! loads retry up to a per-request budget and are never cached as failures.
//! A reference native loader backed by HTTP, memory and disk caches and
//! bundled hybrid assets ships in the infrastructure layer.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

/// Application layer: coordinator, registry, preloading and the module facade.
pub mod application;
/// Domain layer containing entities, errors, and port definitions.
pub mod domain;
/// Infrastructure layer containing configuration and the native loader.
pub mod infrastructure;

/// Current version of the application.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name.
pub const NAME: &str = "blasted-image";
