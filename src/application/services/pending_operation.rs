//! Shared handle for one in-flight load.

use tokio::sync::watch;

use crate::domain::entities::{LoadOutcome, OperationState, RequestKey, Retries};
use crate::domain::errors::LoadError;

/// Owns the outcome of one coordinated load. Every caller that joins the
/// same key holds an `Arc` to the same operation and observes the same
/// terminal state.
#[derive(Debug)]
pub struct PendingOperation {
    key: RequestKey,
    retries: Retries,
    state: watch::Sender<OperationState>,
}

impl PendingOperation {
    /// Creates a running operation at attempt 1.
    #[must_use]
    pub fn new(key: RequestKey, retries: Retries) -> Self {
        Self {
            key,
            retries,
            state: watch::Sender::new(OperationState::Running { attempt: 1 }),
        }
    }

    /// Key this operation was registered under.
    #[must_use]
    pub const fn key(&self) -> &RequestKey {
        &self.key
    }

    /// Retry budget of the request that created the operation.
    #[must_use]
    pub const fn retries(&self) -> Retries {
        self.retries
    }

    /// Snapshot of the current state.
    #[must_use]
    pub fn state(&self) -> OperationState {
        self.state.borrow().clone()
    }

    /// Waits for the terminal state.
    ///
    /// # Errors
    /// Returns the last native error if every attempt failed, or
    /// [`LoadError::Abandoned`] if the load task went away first.
    pub async fn wait(&self) -> Result<LoadOutcome, LoadError> {
        let mut rx = self.state.subscribe();
        let terminal = rx
            .wait_for(OperationState::is_terminal)
            .await
            .map_err(|_| LoadError::Abandoned)?;
        terminal.to_result().unwrap_or(Err(LoadError::Abandoned))
    }

    pub(crate) fn begin_attempt(&self, attempt: u32) {
        self.state.send_if_modified(|state| match state {
            OperationState::Running { attempt: current } if *current != attempt => {
                *current = attempt;
                true
            }
            _ => false,
        });
    }

    pub(crate) fn succeed(&self, outcome: LoadOutcome) {
        self.finish(OperationState::Succeeded(outcome));
    }

    pub(crate) fn fail(&self, error: LoadError) {
        self.finish(OperationState::Failed(error));
    }

    fn finish(&self, terminal: OperationState) {
        self.state.send_if_modified(|state| {
            if state.is_terminal() {
                return false;
            }
            *state = terminal;
            true
        });
    }
}
