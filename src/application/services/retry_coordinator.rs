//! Deduplicating retry coordinator.
//!
//! Every load goes through [`RetryCoordinator::start`]: the request is
//! sanitized, keyed, and either joined to the operation already in flight
//! for that key or registered as a new operation whose attempt sequence runs
//! in its own task.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures_util::FutureExt;
use tracing::{debug, info, warn};

use crate::application::events::{EventSink, ImageEvent};
use crate::domain::entities::{LoadOutcome, LoadRequest};
use crate::domain::errors::LoadError;
use crate::domain::ports::NativeImagePort;

use super::in_flight_registry::InFlightRegistry;
use super::pending_operation::PendingOperation;

/// Delay between attempts: doubles from `base_delay`, capped at `max_delay`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Delay before the second attempt.
    pub base_delay: Duration,
    /// Upper bound for any single delay.
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// No delay between attempts.
    #[must_use]
    pub const fn immediate() -> Self {
        Self {
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Delay to wait after `failed_attempt` failed.
    #[must_use]
    pub fn delay_after(&self, failed_attempt: u32) -> Duration {
        let exponent = failed_attempt.saturating_sub(1).min(16);
        self.base_delay
            .saturating_mul(1 << exponent)
            .min(self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(50),
            max_delay: Duration::from_millis(800),
        }
    }
}

/// What happens to a registry entry once its load succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SuccessRetention {
    /// Remove the entry before publishing success. A caller arriving later
    /// starts a fresh native call, which the native cache answers.
    #[default]
    EvictImmediately,
    /// Keep the succeeded entry for a while so late joiners resolve at once.
    Linger(Duration),
}

/// Tuning for the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CoordinatorConfig {
    /// Backoff between attempts.
    pub retry_policy: RetryPolicy,
    /// Registry policy for succeeded loads.
    pub success_retention: SuccessRetention,
}

/// Runs bounded retry loops against the native port, one per request key.
#[derive(Clone)]
pub struct RetryCoordinator {
    port: Arc<dyn NativeImagePort>,
    registry: Arc<InFlightRegistry>,
    config: CoordinatorConfig,
    events: EventSink,
}

impl std::fmt::Debug for RetryCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryCoordinator")
            .field("config", &self.config)
            .field("in_flight", &self.registry.len())
            .finish_non_exhaustive()
    }
}

impl RetryCoordinator {
    /// Creates a coordinator over `port`, registering loads in `registry`.
    #[must_use]
    pub const fn new(
        port: Arc<dyn NativeImagePort>,
        registry: Arc<InFlightRegistry>,
        config: CoordinatorConfig,
        events: EventSink,
    ) -> Self {
        Self {
            port,
            registry,
            config,
            events,
        }
    }

    /// Registry this coordinator writes to.
    #[must_use]
    pub const fn registry(&self) -> &Arc<InFlightRegistry> {
        &self.registry
    }

    /// Joins or starts the load for `request` and returns its shared handle.
    ///
    /// Never suspends. Must be called from within a tokio runtime.
    pub fn start(&self, request: LoadRequest) -> Arc<PendingOperation> {
        let (request, downgraded) = request.sanitized();
        if downgraded {
            warn!(
                uri = %request.uri(),
                "hybrid_assets requires a cloud_url; loading without local assets"
            );
            self.events.emit(ImageEvent::ConfigurationWarning {
                uri: request.uri().to_owned(),
                message: "hybrid_assets disabled: no cloud_url to fall back to".to_owned(),
            });
        }

        let key = request.key();
        let retries = request.retry_budget();
        let lookup = self
            .registry
            .lookup_or_create(&key, || PendingOperation::new(key.clone(), retries));

        if lookup.created {
            debug!(key = %key, retries = %retries, "Starting load");
            tokio::spawn(self.clone().drive(lookup.operation.clone(), request));
        } else {
            debug!(key = %key, "Joined in-flight load");
        }

        lookup.operation
    }

    /// Loads `request` and waits for the shared outcome.
    ///
    /// # Errors
    /// Returns the last native error once the retry budget is exhausted.
    pub async fn load(&self, request: LoadRequest) -> Result<LoadOutcome, LoadError> {
        self.start(request).wait().await
    }

    async fn drive(self, operation: Arc<PendingOperation>, request: LoadRequest) {
        let _settle = SettleOnDrop {
            coordinator: &self,
            operation: &operation,
        };
        let budget = operation.retries().get();
        let mut attempt = 1;

        loop {
            operation.begin_attempt(attempt);
            debug!(key = %operation.key(), attempt, budget, "Native load attempt");

            match self.call_native(&request).await {
                Ok(()) => {
                    self.finish_success(&operation, LoadOutcome::succeeded_on(attempt));
                    return;
                }
                Err(error) if attempt >= budget => {
                    self.finish_failure(&operation, error);
                    return;
                }
                Err(error) => {
                    debug!(key = %operation.key(), attempt, error = %error, "Attempt failed, retrying");
                    self.events.emit(ImageEvent::AttemptFailed {
                        key: operation.key().clone(),
                        attempt,
                        error,
                    });
                    let delay = self.config.retry_policy.delay_after(attempt);
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    attempt += 1;
                }
            }
        }
    }

    /// One native call. A panic in the port counts as a failed attempt.
    async fn call_native(&self, request: &LoadRequest) -> Result<(), LoadError> {
        let call = async {
            self.port
                .load_image(
                    request.uri(),
                    request.skips_memory_cache(),
                    request.uses_hybrid_assets(),
                    request.cloud_url_str(),
                )
                .await
        };

        match AssertUnwindSafe(call).catch_unwind().await {
            Ok(result) => result,
            Err(payload) => Err(LoadError::loader_panicked(panic_message(payload.as_ref()))),
        }
    }

    fn finish_success(&self, operation: &Arc<PendingOperation>, outcome: LoadOutcome) {
        let key = operation.key().clone();
        info!(key = %key, attempts = outcome.attempts, was_retried = outcome.was_retried, "Image loaded");

        match self.config.success_retention {
            SuccessRetention::EvictImmediately => {
                self.registry.remove_if_current(&key, operation);
                operation.succeed(outcome);
            }
            SuccessRetention::Linger(duration) => {
                operation.succeed(outcome);
                let registry = self.registry.clone();
                let operation = operation.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(duration).await;
                    registry.remove_if_current(operation.key(), &operation);
                });
            }
        }

        self.events.emit(ImageEvent::Loaded {
            key,
            attempts: outcome.attempts,
        });
    }

    fn finish_failure(&self, operation: &Arc<PendingOperation>, error: LoadError) {
        let key = operation.key().clone();
        warn!(key = %key, attempts = operation.retries().get(), error = %error, "Image load failed");

        self.registry.remove_if_current(&key, operation);
        operation.fail(error.clone());

        self.events.emit(ImageEvent::Failed { key, error });
    }
}

/// Publishes [`LoadError::Abandoned`] if the driver task goes away (runtime
/// shutdown, unwinding) before the operation reached a terminal state, so
/// waiters never hang and the key is released.
struct SettleOnDrop<'a> {
    coordinator: &'a RetryCoordinator,
    operation: &'a Arc<PendingOperation>,
}

impl Drop for SettleOnDrop<'_> {
    fn drop(&mut self) {
        if !self.operation.state().is_terminal() {
            self.coordinator
                .finish_failure(self.operation, LoadError::Abandoned);
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic payload".to_owned())
}
