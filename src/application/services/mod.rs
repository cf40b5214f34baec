//! Application services coordinating image loads.

mod in_flight_registry;
mod pending_operation;
mod preload_orchestrator;
mod retry_coordinator;

pub use in_flight_registry::{InFlightRegistry, Lookup};
pub use pending_operation::PendingOperation;
pub use preload_orchestrator::{PreloadOrchestrator, PreloadSummary};
pub use retry_coordinator::{CoordinatorConfig, RetryCoordinator, RetryPolicy, SuccessRetention};
