//! Batch preloading on top of the retry coordinator.

use futures_util::future::join_all;
use tracing::{debug, warn};

use crate::domain::entities::{PreloadInput, Retries};

use super::retry_coordinator::RetryCoordinator;

/// Tally of a finished preload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PreloadSummary {
    /// Items that reached `Succeeded`.
    pub succeeded: usize,
    /// Items that reached `Failed`.
    pub failed: usize,
}

impl PreloadSummary {
    /// Total number of items attempted.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.succeeded + self.failed
    }
}

/// Fans a batch of requests out to the coordinator and waits for all of
/// them. Never fails: individual failures are logged and counted.
#[derive(Debug, Clone)]
pub struct PreloadOrchestrator {
    coordinator: RetryCoordinator,
}

impl PreloadOrchestrator {
    /// Creates an orchestrator submitting through `coordinator`.
    #[must_use]
    pub const fn new(coordinator: RetryCoordinator) -> Self {
        Self { coordinator }
    }

    /// Starts every request, then waits until each one is terminal.
    /// When `retries` is set it replaces each request's own budget.
    pub async fn preload(
        &self,
        input: impl Into<PreloadInput>,
        retries: Option<Retries>,
    ) -> PreloadSummary {
        let requests = input.into().into_requests();
        if requests.is_empty() {
            return PreloadSummary::default();
        }

        let operations: Vec<_> = requests
            .into_iter()
            .map(|request| match retries {
                Some(retries) => self.coordinator.start(request.retries(retries)),
                None => self.coordinator.start(request),
            })
            .collect();
        debug!(count = operations.len(), "Preloading images");

        let results = join_all(operations.iter().map(|operation| operation.wait())).await;

        let mut summary = PreloadSummary::default();
        for (operation, result) in operations.iter().zip(results) {
            match result {
                Ok(_) => summary.succeeded += 1,
                Err(error) => {
                    warn!(key = %operation.key(), error = %error, "Error preloading image");
                    summary.failed += 1;
                }
            }
        }

        debug!(
            succeeded = summary.succeeded,
            failed = summary.failed,
            "Preload finished"
        );
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::events::EventSink;
    use crate::application::services::in_flight_registry::InFlightRegistry;
    use crate::application::services::retry_coordinator::{CoordinatorConfig, RetryPolicy};
    use crate::domain::entities::LoadRequest;
    use crate::domain::ports::mocks::ScriptedImagePort;
    use std::sync::Arc;
    use std::task::Poll;

    fn orchestrator(port: &Arc<ScriptedImagePort>) -> PreloadOrchestrator {
        let coordinator = RetryCoordinator::new(
            port.clone(),
            Arc::new(InFlightRegistry::new()),
            CoordinatorConfig {
                retry_policy: RetryPolicy::immediate(),
                ..CoordinatorConfig::default()
            },
            EventSink::disabled(),
        );
        PreloadOrchestrator::new(coordinator)
    }

    #[tokio::test]
    async fn test_empty_batch_resolves_without_native_calls() {
        let port = Arc::new(ScriptedImagePort::new());
        let summary = orchestrator(&port)
            .preload(Vec::<LoadRequest>::new(), Some(Retries::DEFAULT))
            .await;

        assert_eq!(summary, PreloadSummary::default());
        assert!(port.calls().is_empty());
    }

    #[tokio::test]
    async fn test_batch_resolves_despite_failing_item() {
        let port = Arc::new(ScriptedImagePort::new());
        port.always_fail("b");
        let orchestrator = orchestrator(&port);

        let batch = vec![LoadRequest::new("a"), LoadRequest::new("b"), LoadRequest::new("c")];
        let summary = orchestrator.preload(batch, Some(Retries::new(2))).await;

        assert_eq!(summary, PreloadSummary { succeeded: 2, failed: 1 });
        assert_eq!(port.calls_for("a"), 1);
        assert_eq!(port.calls_for("b"), 2);
        assert_eq!(port.calls_for("c"), 1);
    }

    #[tokio::test]
    async fn test_single_failing_request_is_swallowed() {
        let port = Arc::new(ScriptedImagePort::new());
        port.always_fail("a");

        let summary = orchestrator(&port)
            .preload(LoadRequest::new("a"), Some(Retries::ONCE))
            .await;

        assert_eq!(summary.failed, 1);
        assert_eq!(summary.total(), 1);
    }

    #[tokio::test]
    async fn test_items_are_submitted_before_any_completes() {
        let port = Arc::new(ScriptedImagePort::new());
        port.hold();
        let orchestrator = orchestrator(&port);

        let batch = vec![LoadRequest::new("a"), LoadRequest::new("b"), LoadRequest::new("c")];
        let mut preload = tokio_test::task::spawn(orchestrator.preload(batch, None));
        tokio_test::assert_pending!(preload.poll());

        while port.calls().len() < 3 {
            tokio::task::yield_now().await;
        }
        tokio_test::assert_pending!(preload.poll());

        port.release();
        let summary = loop {
            if let Poll::Ready(summary) = preload.poll() {
                break summary;
            }
            tokio::task::yield_now().await;
        };
        assert_eq!(summary.succeeded, 3);
    }

    #[tokio::test]
    async fn test_duplicate_items_share_one_load() {
        let port = Arc::new(ScriptedImagePort::new());
        let batch = vec![
            LoadRequest::new("a"),
            LoadRequest::new("a").retries(Retries::new(9)),
        ];

        let summary = orchestrator(&port).preload(batch, Some(Retries::DEFAULT)).await;

        assert_eq!(summary.succeeded, 2);
        assert_eq!(port.calls_for("a"), 1);
    }

    #[tokio::test]
    async fn test_items_keep_their_own_budget_without_override() {
        let port = Arc::new(ScriptedImagePort::new());
        port.always_fail("a");
        port.always_fail("b");
        let batch = vec![
            LoadRequest::new("a").retries(Retries::ONCE),
            LoadRequest::new("b").retries(Retries::new(4)),
        ];

        let summary = orchestrator(&port).preload(batch, None).await;

        assert_eq!(summary.failed, 2);
        assert_eq!(port.calls_for("a"), 1);
        assert_eq!(port.calls_for("b"), 4);
    }

    #[tokio::test]
    async fn test_override_replaces_item_budgets() {
        let port = Arc::new(ScriptedImagePort::new());
        port.always_fail("a");
        let batch = vec![LoadRequest::new("a").retries(Retries::new(5))];

        orchestrator(&port).preload(batch, Some(Retries::new(2))).await;

        assert_eq!(port.calls_for("a"), 2);
    }
}
