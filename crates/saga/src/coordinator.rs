//! Saga coordinator: runs steps forward and compensates on failure.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::context::ExecutionContext;
use crate::error::{CompensationError, ExecutionError, SagaError, StepError};
use crate::log::ExecutionLog;
use crate::observer::{NoopObserver, RunInfo, SagaObserver, StepInfo};
use crate::outcome::SagaOutcome;
use crate::run::{RunData, RunId};
use crate::saga::Saga;
use crate::state::CoordinatorState;

/// Default upper bound for a single compensation.
pub const DEFAULT_COMPENSATION_TIMEOUT: Duration = Duration::from_secs(30);

/// Drives one saga run.
///
/// Forward actions run strictly in order; step `i + 1` starts only after
/// step `i` succeeded. On the first failure the coordinator compensates the
/// succeeded steps in reverse order, continuing past compensation failures,
/// and reports everything in a [`SagaOutcome`]. Nothing is retried.
///
/// The execution log is in memory only: a process crash mid-run leaves no
/// record to resume or reconcile from.
pub struct Coordinator<D> {
    saga: Saga<D>,
    log: ExecutionLog,
    state: CoordinatorState,
    run_id: RunId,
    observer: Arc<dyn SagaObserver>,
    compensation_timeout: Duration,
}

impl<D> Coordinator<D>
where
    D: Clone + Send + 'static,
{
    /// Creates an idle coordinator with a fresh execution log.
    pub fn new(saga: Saga<D>) -> Self {
        let log = ExecutionLog::new(saga.step_names());
        Self {
            saga,
            log,
            state: CoordinatorState::Idle,
            run_id: RunId::new(),
            observer: Arc::new(NoopObserver),
            compensation_timeout: DEFAULT_COMPENSATION_TIMEOUT,
        }
    }

    /// Sets the observer notified of progress.
    pub fn with_observer(mut self, observer: Arc<dyn SagaObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Bounds how long each compensation may run.
    pub fn with_compensation_timeout(mut self, timeout: Duration) -> Self {
        self.compensation_timeout = timeout;
        self
    }

    /// Returns the current state.
    pub fn state(&self) -> CoordinatorState {
        self.state
    }

    /// Returns the identifier this run will carry.
    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    /// Plays the saga to a terminal state.
    ///
    /// `data` seeds the per-run state handed to every action; its final
    /// value is returned in the outcome. A cancellation or deadline on `ctx`
    /// during forward execution fails the step in flight and triggers
    /// compensation.
    #[tracing::instrument(skip_all, fields(saga = %self.saga.name(), run_id = %self.run_id))]
    pub async fn play(mut self, ctx: &ExecutionContext, data: D) -> SagaOutcome<D> {
        let started = Instant::now();
        let data = RunData::new(data);
        self.observer.saga_started(self.run_info(), self.saga.len());

        self.transition(CoordinatorState::Running);
        let execution_error = self.run_forward(ctx, &data).await;

        let compensation_errors = if execution_error.is_some() {
            self.transition(CoordinatorState::Compensating);
            let errors = self.run_compensations(ctx, &data).await;
            if errors.is_empty() {
                self.transition(CoordinatorState::Compensated);
            } else {
                self.transition(CoordinatorState::CompensationFailed);
            }
            errors
        } else {
            self.transition(CoordinatorState::Completed);
            Vec::new()
        };

        let elapsed = started.elapsed();
        self.observer
            .saga_finished(self.run_info(), self.state, elapsed);

        SagaOutcome {
            saga: self.saga.name().to_string(),
            run_id: self.run_id,
            state: self.state,
            execution_error,
            compensation_errors,
            log: self.log,
            elapsed,
            data: data.into_inner().await,
        }
    }

    /// Plays the saga on its own task and waits for the outcome.
    ///
    /// The run observes a child of `ctx`. Dropping the returned future
    /// cancels that child instead of abandoning the run, so the task still
    /// compensates whatever already succeeded.
    ///
    /// # Errors
    ///
    /// Returns [`SagaError::Aborted`] if the task panicked.
    pub async fn play_detached(
        self,
        ctx: &ExecutionContext,
        data: D,
    ) -> Result<SagaOutcome<D>, SagaError> {
        let run_ctx = ctx.child();
        let _cancel_on_drop = run_ctx.drop_guard();
        let task = tokio::spawn(async move { self.play(&run_ctx, data).await });
        Ok(task.await?)
    }

    async fn run_forward(
        &mut self,
        ctx: &ExecutionContext,
        data: &RunData<D>,
    ) -> Option<ExecutionError> {
        let run = RunInfo {
            saga: self.saga.name(),
            run_id: self.run_id,
        };

        for (index, step) in self.saga.steps.iter().enumerate() {
            let info = StepInfo {
                name: step.name(),
                index,
            };
            self.observer.step_started(run, info);
            self.log.mark_started(index);
            let began = Instant::now();

            let result = match ctx.interrupt() {
                Some(reason) => Err(StepError::from(reason)),
                None => tokio::select! {
                    biased;
                    reason = ctx.done() => Err(StepError::from(reason)),
                    result = step.forward().run(ctx, data) => result,
                },
            };

            self.observer
                .step_finished(run, info, result.as_ref().map(|_| ()), began.elapsed());

            if let Err(error) = result {
                self.log.mark_failed(index);
                return Some(ExecutionError {
                    step: step.name().to_string(),
                    index,
                    error,
                });
            }
            self.log.mark_succeeded(index);
        }

        None
    }

    async fn run_compensations(
        &mut self,
        ctx: &ExecutionContext,
        data: &RunData<D>,
    ) -> Vec<CompensationError> {
        let run = RunInfo {
            saga: self.saga.name(),
            run_id: self.run_id,
        };
        let mut errors = Vec::new();

        for index in self.log.succeeded_in_reverse() {
            let step = &self.saga.steps[index];
            let Some(compensate) = step.compensation() else {
                self.log.mark_compensated(index);
                continue;
            };

            let info = StepInfo {
                name: step.name(),
                index,
            };
            self.observer.compensation_started(run, info);
            let began = Instant::now();

            // Compensations get their own context so an already expired
            // request still cleans up. A parent cancellation that lands while
            // this compensation runs aborts only this one.
            let watch_parent = ctx.interrupt().is_none();
            let cleanup = ExecutionContext::with_timeout(self.compensation_timeout);
            let result = tokio::select! {
                biased;
                reason = ctx.done(), if watch_parent => Err(StepError::from(reason)),
                reason = cleanup.done() => Err(StepError::from(reason)),
                result = compensate.run(&cleanup, data) => result,
            };

            self.observer
                .compensation_finished(run, info, result.as_ref().map(|_| ()), began.elapsed());

            match result {
                Ok(()) => self.log.mark_compensated(index),
                Err(error) => {
                    self.log.mark_compensation_failed(index);
                    errors.push(CompensationError {
                        step: step.name().to_string(),
                        index,
                        error,
                    });
                }
            }
        }

        errors
    }

    fn transition(&mut self, next: CoordinatorState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "invalid coordinator transition {} -> {next}",
            self.state
        );
        self.state = next;
    }

    fn run_info(&self) -> RunInfo<'_> {
        RunInfo {
            saga: self.saga.name(),
            run_id: self.run_id,
        }
    }
}

impl<D> std::fmt::Debug for Coordinator<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordinator")
            .field("saga", &self.saga.name())
            .field("state", &self.state)
            .field("run_id", &self.run_id)
            .field("compensation_timeout", &self.compensation_timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::StepMarker;
    use crate::step::Step;

    async fn push(name: &'static str, data: RunData<Vec<&'static str>>) -> Result<(), StepError> {
        data.update(|trail| trail.push(name)).await;
        Ok(())
    }

    fn recording_step(name: &'static str) -> Step<Vec<&'static str>> {
        Step::new(name, move |_ctx: ExecutionContext, data| push(name, data))
    }

    #[tokio::test]
    async fn new_coordinator_is_idle() {
        let coordinator = Coordinator::new(Saga::<()>::new("idle"));
        assert_eq!(coordinator.state(), CoordinatorState::Idle);
    }

    #[tokio::test]
    async fn run_state_flows_between_steps() {
        let mut saga = Saga::new("trail");
        saga.add_step(recording_step("a"))
            .unwrap()
            .add_step(recording_step("b"))
            .unwrap();

        let outcome = Coordinator::new(saga)
            .play(&ExecutionContext::new(), Vec::new())
            .await;

        assert_eq!(outcome.state, CoordinatorState::Completed);
        assert_eq!(outcome.data, ["a", "b"]);
        assert_eq!(outcome.log.marker(1), Some(StepMarker::Succeeded));
    }

    #[tokio::test]
    async fn failed_step_is_not_compensated() {
        let mut saga = Saga::new("fail");
        saga.add_step(
            Step::new("only", |_ctx: ExecutionContext, _data: RunData<Vec<&'static str>>| async {
                Err::<(), _>(StepError::failed("nope"))
            })
            .compensate_with(|_ctx: ExecutionContext, data| push("undo only", data)),
        )
        .unwrap();

        let outcome = Coordinator::new(saga)
            .play(&ExecutionContext::new(), Vec::new())
            .await;

        assert_eq!(outcome.state, CoordinatorState::Compensated);
        assert!(outcome.data.is_empty());
        assert_eq!(outcome.log.marker(0), Some(StepMarker::Failed));
    }
}
