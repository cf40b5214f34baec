//! Imperative image API: the facade UI code and callers talk to.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::domain::entities::{LoadOutcome, LoadRequest, PreloadInput, Retries};
use crate::domain::errors::LoadError;
use crate::domain::ports::NativeImagePort;

use super::events::{CacheScope, EventSink, ImageEvent};
use super::services::{
    CoordinatorConfig, InFlightRegistry, PreloadOrchestrator, PreloadSummary, RetryCoordinator,
};

/// Entry point for loading, preloading and cache administration.
///
/// Owns one registry; clones share it.
#[derive(Clone)]
pub struct ImageModule {
    port: Arc<dyn NativeImagePort>,
    coordinator: RetryCoordinator,
    preloader: PreloadOrchestrator,
    events: EventSink,
}

impl std::fmt::Debug for ImageModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageModule")
            .field("coordinator", &self.coordinator)
            .finish_non_exhaustive()
    }
}

impl ImageModule {
    /// Checks that the native loader is linked and builds the module.
    ///
    /// # Errors
    /// Returns [`LoadError::NotLinked`] if the port reports it is unavailable.
    pub fn connect(port: Arc<dyn NativeImagePort>, config: CoordinatorConfig) -> Result<Self, LoadError> {
        Self::connect_with_events(port, config, EventSink::disabled())
    }

    /// Like [`Self::connect`], forwarding events into `event_tx`.
    ///
    /// # Errors
    /// Returns [`LoadError::NotLinked`] if the port reports it is unavailable.
    pub fn connect_with_channel(
        port: Arc<dyn NativeImagePort>,
        config: CoordinatorConfig,
        event_tx: mpsc::UnboundedSender<ImageEvent>,
    ) -> Result<Self, LoadError> {
        Self::connect_with_events(port, config, EventSink::new(event_tx))
    }

    fn connect_with_events(
        port: Arc<dyn NativeImagePort>,
        config: CoordinatorConfig,
        events: EventSink,
    ) -> Result<Self, LoadError> {
        port.check_linked().inspect_err(|e| {
            error!(error = %e, "Native image loader unavailable");
        })?;

        let coordinator = RetryCoordinator::new(
            port.clone(),
            Arc::new(InFlightRegistry::new()),
            config,
            events.clone(),
        );
        let preloader = PreloadOrchestrator::new(coordinator.clone());
        debug!(?config, "Image module connected");

        Ok(Self {
            port,
            coordinator,
            preloader,
            events,
        })
    }

    /// Loads one image, joining any identical load already in flight.
    ///
    /// # Errors
    /// Returns the last native error once the retry budget is exhausted.
    pub async fn load_image(&self, request: LoadRequest) -> Result<LoadOutcome, LoadError> {
        let uri = request.uri().to_owned();
        self.coordinator.load(request).await.inspect_err(|e| {
            error!(uri = %uri, error = %e, "Error loading image");
        })
    }

    /// Loads `uri` with default options.
    ///
    /// # Errors
    /// Returns the last native error once the retry budget is exhausted.
    pub async fn load_uri(&self, uri: impl Into<String>) -> Result<LoadOutcome, LoadError> {
        self.load_image(LoadRequest::new(uri)).await
    }

    /// Preloads one request or a batch. Completes once every item is
    /// terminal, whatever the individual outcomes. `Some(retries)` overrides
    /// every item's budget; `None` keeps them.
    pub async fn preload(
        &self,
        input: impl Into<PreloadInput>,
        retries: Option<Retries>,
    ) -> PreloadSummary {
        self.preloader.preload(input, retries).await
    }

    /// Clears the native memory cache.
    ///
    /// # Errors
    /// Returns the native error if the clear failed.
    pub async fn clear_memory_cache(&self) -> Result<(), LoadError> {
        self.port.clear_memory_cache().await?;
        self.cleared(CacheScope::Memory);
        Ok(())
    }

    /// Clears the native disk cache.
    ///
    /// # Errors
    /// Returns the native error if the clear failed.
    pub async fn clear_disk_cache(&self) -> Result<(), LoadError> {
        self.port.clear_disk_cache().await?;
        self.cleared(CacheScope::Disk);
        Ok(())
    }

    /// Clears memory and disk caches.
    ///
    /// # Errors
    /// Returns the native error if either clear failed.
    pub async fn clear_all_caches(&self) -> Result<(), LoadError> {
        self.port.clear_all_caches().await?;
        self.cleared(CacheScope::All);
        Ok(())
    }

    /// Number of loads currently registered.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.coordinator.registry().len()
    }

    fn cleared(&self, scope: CacheScope) {
        info!(%scope, "Cache cleared");
        self.events.emit(ImageEvent::CachesCleared(scope));
    }
}
