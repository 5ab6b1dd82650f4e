//! Saga error types.

use thiserror::Error;

use crate::context::Interrupt;

/// Boxed error returned by downstream collaborators.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failure reported by a forward or compensating action.
#[derive(Debug, Error)]
pub enum StepError {
    /// Business rule rejected the step.
    #[error("{0}")]
    Failed(String),

    /// The execution context was cancelled while the action was in flight.
    #[error("execution cancelled")]
    Cancelled,

    /// The execution context's deadline passed while the action was in flight.
    #[error("deadline exceeded")]
    DeadlineExceeded,

    /// A downstream call failed.
    #[error(transparent)]
    Source(BoxError),
}

impl StepError {
    /// Creates a business failure with the given message.
    pub fn failed(message: impl Into<String>) -> Self {
        StepError::Failed(message.into())
    }

    /// Wraps a downstream error, keeping it available for downcasting.
    pub fn from_source<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        StepError::Source(Box::new(error))
    }

    /// Returns true if the failure came from cancellation or a deadline
    /// rather than from the action itself.
    pub fn is_interrupt(&self) -> bool {
        matches!(self, StepError::Cancelled | StepError::DeadlineExceeded)
    }

    /// Returns the wrapped downstream error if it has type `E`.
    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: std::error::Error + 'static,
    {
        match self {
            StepError::Source(source) => source.downcast_ref::<E>(),
            _ => None,
        }
    }
}

impl From<Interrupt> for StepError {
    fn from(interrupt: Interrupt) -> Self {
        match interrupt {
            Interrupt::Cancelled => StepError::Cancelled,
            Interrupt::DeadlineExceeded => StepError::DeadlineExceeded,
        }
    }
}

/// The forward failure that ended a saga run.
#[derive(Debug, Error)]
#[error("step '{step}' failed: {error}")]
pub struct ExecutionError {
    /// Name of the step that failed.
    pub step: String,
    /// Position of the step in the saga.
    pub index: usize,
    /// The underlying failure.
    #[source]
    pub error: StepError,
}

/// A compensation that failed and left an external side effect behind.
#[derive(Debug, Error)]
#[error("compensation for step '{step}' failed: {error}")]
pub struct CompensationError {
    /// Name of the step whose compensation failed.
    pub step: String,
    /// Position of the step in the saga.
    pub index: usize,
    /// The underlying failure.
    #[source]
    pub error: StepError,
}

/// Errors surfaced by saga construction and execution.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SagaError {
    /// The saga was misused (for example two steps share a name).
    #[error("saga precondition violated: {0}")]
    PreconditionViolation(String),

    /// A step failed and every compensation succeeded.
    #[error("step '{step}' failed: {source}")]
    StepFailed {
        /// Name of the step that failed.
        step: String,
        /// The failure.
        source: StepError,
    },

    /// A step failed and at least one compensation failed too.
    #[error(
        "step '{step}' failed: {source}; {} compensation(s) also failed",
        compensation_errors.len()
    )]
    CompensationFailed {
        /// Name of the step that failed.
        step: String,
        /// The failure.
        source: StepError,
        /// Compensations that could not undo their step.
        compensation_errors: Vec<CompensationError>,
    },

    /// The task running a detached saga panicked or was aborted.
    #[error("saga task aborted: {0}")]
    Aborted(#[from] tokio::task::JoinError),
}

/// Convenience type alias for saga results.
pub type Result<T> = std::result::Result<T, SagaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Error)]
    #[error("out of stock")]
    struct OutOfStock;

    #[test]
    fn interrupt_maps_to_step_error() {
        assert!(matches!(
            StepError::from(Interrupt::Cancelled),
            StepError::Cancelled
        ));
        assert!(StepError::from(Interrupt::DeadlineExceeded).is_interrupt());
        assert!(!StepError::failed("nope").is_interrupt());
    }

    #[test]
    fn source_is_downcastable() {
        let err = StepError::from_source(OutOfStock);
        assert!(err.downcast_ref::<OutOfStock>().is_some());
        assert_eq!(err.to_string(), "out of stock");
        assert!(StepError::failed("x").downcast_ref::<OutOfStock>().is_none());
    }

    #[test]
    fn compensation_failed_display_counts_errors() {
        let err = SagaError::CompensationFailed {
            step: "charge".to_string(),
            source: StepError::failed("declined"),
            compensation_errors: vec![CompensationError {
                step: "reserve".to_string(),
                index: 0,
                error: StepError::failed("release failed"),
            }],
        };
        assert_eq!(
            err.to_string(),
            "step 'charge' failed: declined; 1 compensation(s) also failed"
        );
    }
}
