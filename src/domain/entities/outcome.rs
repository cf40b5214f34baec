//! Outcome and lifecycle state of a coordinated load.

use crate::domain::errors::LoadError;

/// Successful result shared by everyone who joined the same load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadOutcome {
    /// Number of native attempts it took.
    pub attempts: u32,
    /// True when the first attempt failed.
    pub was_retried: bool,
}

impl LoadOutcome {
    /// Outcome of a load that succeeded on `attempt`.
    #[must_use]
    pub const fn succeeded_on(attempt: u32) -> Self {
        Self {
            attempts: attempt,
            was_retried: attempt > 1,
        }
    }
}

/// Lifecycle of a pending operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationState {
    /// An attempt sequence is in progress.
    Running {
        /// Current attempt, starting at 1.
        attempt: u32,
    },
    /// Terminal: the native loader reported success.
    Succeeded(LoadOutcome),
    /// Terminal: every attempt failed. Holds the last cause.
    Failed(LoadError),
}

impl OperationState {
    /// Returns true for `Succeeded` and `Failed`.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, Self::Running { .. })
    }

    /// Converts a terminal state into the caller-facing result.
    /// Returns `None` while still running.
    #[must_use]
    pub fn to_result(&self) -> Option<Result<LoadOutcome, LoadError>> {
        match self {
            Self::Running { .. } => None,
            Self::Succeeded(outcome) => Some(Ok(*outcome)),
            Self::Failed(error) => Some(Err(error.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_was_retried_flag() {
        assert!(!LoadOutcome::succeeded_on(1).was_retried);
        assert!(LoadOutcome::succeeded_on(2).was_retried);
        assert_eq!(LoadOutcome::succeeded_on(3).attempts, 3);
    }

    #[test]
    fn test_terminal_states() {
        assert!(!OperationState::Running { attempt: 1 }.is_terminal());
        assert!(OperationState::Succeeded(LoadOutcome::succeeded_on(1)).is_terminal());
        assert!(OperationState::Failed(LoadError::native("boom")).is_terminal());
    }

    #[test]
    fn test_to_result() {
        assert_eq!(OperationState::Running { attempt: 2 }.to_result(), None);
        assert_eq!(
            OperationState::Failed(LoadError::native("boom")).to_result(),
            Some(Err(LoadError::native("boom")))
        );
    }
}
