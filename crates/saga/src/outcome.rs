//! The result of playing a saga.

use std::time::Duration;

use crate::error::{CompensationError, ExecutionError, SagaError};
use crate::log::ExecutionLog;
use crate::run::RunId;
use crate::state::CoordinatorState;

/// Outcome of one [`Coordinator::play`](crate::Coordinator::play) call.
///
/// `compensation_errors` is only ever non-empty when `execution_error` is
/// set: compensation runs only after a forward failure.
#[derive(Debug)]
pub struct SagaOutcome<D> {
    /// Saga name.
    pub saga: String,
    /// Run identifier.
    pub run_id: RunId,
    /// Terminal coordinator state.
    pub state: CoordinatorState,
    /// The forward failure that stopped the run, if any.
    pub execution_error: Option<ExecutionError>,
    /// Compensations that failed, in the order they were attempted.
    pub compensation_errors: Vec<CompensationError>,
    /// Final execution log.
    pub log: ExecutionLog,
    /// Wall-clock duration of the run.
    pub elapsed: Duration,
    /// Final run state.
    pub data: D,
}

impl<D> SagaOutcome<D> {
    /// Returns true if every forward action succeeded.
    pub fn is_success(&self) -> bool {
        self.execution_error.is_none()
    }

    /// Converts the outcome into a `Result`, keeping the run state on success.
    pub fn into_result(self) -> Result<D, SagaError> {
        match self.execution_error {
            None => Ok(self.data),
            Some(failure) if self.compensation_errors.is_empty() => Err(SagaError::StepFailed {
                step: failure.step,
                source: failure.error,
            }),
            Some(failure) => Err(SagaError::CompensationFailed {
                step: failure.step,
                source: failure.error,
                compensation_errors: self.compensation_errors,
            }),
        }
    }
}
