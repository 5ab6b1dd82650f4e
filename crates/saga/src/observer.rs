//! Injectable hooks around saga execution.
//!
//! The coordinator reports progress through a [`SagaObserver`] instead of
//! touching global tracing or metrics state itself. Wire in
//! [`TracingObserver`] and [`MetricsObserver`] (or both via [`FanOut`]) at
//! the edge of the application.

use std::sync::Arc;
use std::time::Duration;

use crate::error::StepError;
use crate::run::RunId;
use crate::state::CoordinatorState;

/// Identifies the run an observer callback belongs to.
#[derive(Debug, Clone, Copy)]
pub struct RunInfo<'a> {
    /// Saga name.
    pub saga: &'a str,
    /// Run identifier.
    pub run_id: RunId,
}

/// Identifies the step an observer callback belongs to.
#[derive(Debug, Clone, Copy)]
pub struct StepInfo<'a> {
    /// Step name.
    pub name: &'a str,
    /// Position in the saga.
    pub index: usize,
}

/// Callbacks invoked by the coordinator. Every method defaults to a no-op.
pub trait SagaObserver: Send + Sync {
    /// The coordinator started playing.
    fn saga_started(&self, run: RunInfo<'_>, step_count: usize) {
        let _ = (run, step_count);
    }

    /// A forward action is about to run.
    fn step_started(&self, run: RunInfo<'_>, step: StepInfo<'_>) {
        let _ = (run, step);
    }

    /// A forward action finished.
    fn step_finished(
        &self,
        run: RunInfo<'_>,
        step: StepInfo<'_>,
        result: Result<(), &StepError>,
        elapsed: Duration,
    ) {
        let _ = (run, step, result, elapsed);
    }

    /// A compensation is about to run.
    fn compensation_started(&self, run: RunInfo<'_>, step: StepInfo<'_>) {
        let _ = (run, step);
    }

    /// A compensation finished.
    fn compensation_finished(
        &self,
        run: RunInfo<'_>,
        step: StepInfo<'_>,
        result: Result<(), &StepError>,
        elapsed: Duration,
    ) {
        let _ = (run, step, result, elapsed);
    }

    /// The coordinator reached a terminal state.
    fn saga_finished(&self, run: RunInfo<'_>, state: CoordinatorState, elapsed: Duration) {
        let _ = (run, state, elapsed);
    }
}

/// Observer that ignores every callback.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl SagaObserver for NoopObserver {}

/// Emits structured `tracing` events for every callback.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl SagaObserver for TracingObserver {
    fn saga_started(&self, run: RunInfo<'_>, step_count: usize) {
        tracing::info!(saga = run.saga, run_id = %run.run_id, step_count, "saga started");
    }

    fn step_started(&self, run: RunInfo<'_>, step: StepInfo<'_>) {
        tracing::debug!(
            saga = run.saga,
            run_id = %run.run_id,
            step = step.name,
            index = step.index,
            "saga step started"
        );
    }

    fn step_finished(
        &self,
        run: RunInfo<'_>,
        step: StepInfo<'_>,
        result: Result<(), &StepError>,
        elapsed: Duration,
    ) {
        let elapsed_ms = elapsed.as_millis() as u64;
        match result {
            Ok(()) => tracing::debug!(
                saga = run.saga,
                run_id = %run.run_id,
                step = step.name,
                elapsed_ms,
                "saga step completed"
            ),
            Err(error) => tracing::warn!(
                saga = run.saga,
                run_id = %run.run_id,
                step = step.name,
                elapsed_ms,
                %error,
                "saga step failed"
            ),
        }
    }

    fn compensation_started(&self, run: RunInfo<'_>, step: StepInfo<'_>) {
        tracing::info!(
            saga = run.saga,
            run_id = %run.run_id,
            step = step.name,
            "compensating saga step"
        );
    }

    fn compensation_finished(
        &self,
        run: RunInfo<'_>,
        step: StepInfo<'_>,
        result: Result<(), &StepError>,
        elapsed: Duration,
    ) {
        if let Err(error) = result {
            tracing::error!(
                saga = run.saga,
                run_id = %run.run_id,
                step = step.name,
                elapsed_ms = elapsed.as_millis() as u64,
                %error,
                "compensation failed; manual reconciliation required"
            );
        }
    }

    fn saga_finished(&self, run: RunInfo<'_>, state: CoordinatorState, elapsed: Duration) {
        let duration = elapsed.as_secs_f64();
        match state {
            CoordinatorState::Completed => {
                tracing::info!(saga = run.saga, run_id = %run.run_id, duration, "saga completed")
            }
            CoordinatorState::CompensationFailed => tracing::error!(
                saga = run.saga,
                run_id = %run.run_id,
                duration,
                %state,
                "saga failed with dangling side effects"
            ),
            _ => tracing::warn!(saga = run.saga, run_id = %run.run_id, duration, %state, "saga failed"),
        }
    }
}

/// Records saga counters and histograms through the `metrics` facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsObserver;

impl SagaObserver for MetricsObserver {
    fn saga_started(&self, run: RunInfo<'_>, _step_count: usize) {
        metrics::counter!("saga_started_total", "saga" => run.saga.to_string()).increment(1);
    }

    fn step_finished(
        &self,
        run: RunInfo<'_>,
        _step: StepInfo<'_>,
        result: Result<(), &StepError>,
        _elapsed: Duration,
    ) {
        let outcome = if result.is_ok() { "ok" } else { "error" };
        metrics::counter!(
            "saga_steps_total",
            "saga" => run.saga.to_string(),
            "outcome" => outcome
        )
        .increment(1);
    }

    fn compensation_finished(
        &self,
        run: RunInfo<'_>,
        _step: StepInfo<'_>,
        result: Result<(), &StepError>,
        _elapsed: Duration,
    ) {
        metrics::counter!("saga_compensations_total", "saga" => run.saga.to_string()).increment(1);
        if result.is_err() {
            metrics::counter!(
                "saga_compensation_failures_total",
                "saga" => run.saga.to_string()
            )
            .increment(1);
        }
    }

    fn saga_finished(&self, run: RunInfo<'_>, state: CoordinatorState, elapsed: Duration) {
        metrics::counter!(
            "saga_runs_total",
            "saga" => run.saga.to_string(),
            "state" => state.as_str()
        )
        .increment(1);
        metrics::histogram!("saga_duration_seconds", "saga" => run.saga.to_string())
            .record(elapsed.as_secs_f64());
    }
}

/// Forwards every callback to each wrapped observer in order.
#[derive(Clone, Default)]
pub struct FanOut {
    observers: Vec<Arc<dyn SagaObserver>>,
}

impl FanOut {
    /// Creates a fan-out over the given observers.
    pub fn new(observers: Vec<Arc<dyn SagaObserver>>) -> Self {
        Self { observers }
    }

    /// Adds another observer.
    pub fn with(mut self, observer: Arc<dyn SagaObserver>) -> Self {
        self.observers.push(observer);
        self
    }
}

impl std::fmt::Debug for FanOut {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FanOut")
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl SagaObserver for FanOut {
    fn saga_started(&self, run: RunInfo<'_>, step_count: usize) {
        for o in &self.observers {
            o.saga_started(run, step_count);
        }
    }

    fn step_started(&self, run: RunInfo<'_>, step: StepInfo<'_>) {
        for o in &self.observers {
            o.step_started(run, step);
        }
    }

    fn step_finished(
        &self,
        run: RunInfo<'_>,
        step: StepInfo<'_>,
        result: Result<(), &StepError>,
        elapsed: Duration,
    ) {
        for o in &self.observers {
            o.step_finished(run, step, result, elapsed);
        }
    }

    fn compensation_started(&self, run: RunInfo<'_>, step: StepInfo<'_>) {
        for o in &self.observers {
            o.compensation_started(run, step);
        }
    }

    fn compensation_finished(
        &self,
        run: RunInfo<'_>,
        step: StepInfo<'_>,
        result: Result<(), &StepError>,
        elapsed: Duration,
    ) {
        for o in &self.observers {
            o.compensation_finished(run, step, result, elapsed);
        }
    }

    fn saga_finished(&self, run: RunInfo<'_>, state: CoordinatorState, elapsed: Duration) {
        for o in &self.observers {
            o.saga_finished(run, state, elapsed);
        }
    }
}
