//! In-memory execution log for one saga run.

use std::time::Instant;

/// Progress marker for a single step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum StepMarker {
    /// The step has not been reached.
    NotStarted,
    /// The forward action succeeded.
    Succeeded,
    /// The forward action failed.
    Failed,
    /// The step was rolled back, or had nothing to roll back.
    Compensated,
    /// The compensation failed; the step's side effect may remain.
    CompensationFailed,
}

/// Record of one step's progress.
#[derive(Debug, Clone)]
pub struct StepRecord {
    /// Name of the step.
    pub name: String,
    /// Current marker.
    pub marker: StepMarker,
    /// When the forward action started.
    pub started_at: Option<Instant>,
    /// When the forward action finished.
    pub finished_at: Option<Instant>,
    /// When the compensation finished.
    pub compensated_at: Option<Instant>,
}

/// Which steps of a run have completed, used to decide what to compensate.
///
/// Created fresh for every run and owned by the coordinator while it plays.
#[derive(Debug, Clone, Default)]
pub struct ExecutionLog {
    records: Vec<StepRecord>,
}

impl ExecutionLog {
    /// Creates a log with every step `NotStarted`.
    pub fn new<'a>(step_names: impl IntoIterator<Item = &'a str>) -> Self {
        let records = step_names
            .into_iter()
            .map(|name| StepRecord {
                name: name.to_string(),
                marker: StepMarker::NotStarted,
                started_at: None,
                finished_at: None,
                compensated_at: None,
            })
            .collect();
        Self { records }
    }

    pub(crate) fn mark_started(&mut self, index: usize) {
        if let Some(record) = self.records.get_mut(index) {
            record.started_at = Some(Instant::now());
        }
    }

    pub(crate) fn mark_succeeded(&mut self, index: usize) {
        self.finish(index, StepMarker::Succeeded);
    }

    pub(crate) fn mark_failed(&mut self, index: usize) {
        self.finish(index, StepMarker::Failed);
    }

    pub(crate) fn mark_compensated(&mut self, index: usize) {
        self.settle(index, StepMarker::Compensated);
    }

    pub(crate) fn mark_compensation_failed(&mut self, index: usize) {
        self.settle(index, StepMarker::CompensationFailed);
    }

    fn finish(&mut self, index: usize, marker: StepMarker) {
        if let Some(record) = self.records.get_mut(index) {
            record.marker = marker;
            record.finished_at = Some(Instant::now());
        }
    }

    fn settle(&mut self, index: usize, marker: StepMarker) {
        if let Some(record) = self.records.get_mut(index) {
            record.marker = marker;
            record.compensated_at = Some(Instant::now());
        }
    }

    /// Returns the marker of the step at `index`.
    pub fn marker(&self, index: usize) -> Option<StepMarker> {
        self.records.get(index).map(|r| r.marker)
    }

    /// Indices of succeeded steps, last first.
    pub fn succeeded_in_reverse(&self) -> Vec<usize> {
        self.records
            .iter()
            .enumerate()
            .rev()
            .filter(|(_, r)| r.marker == StepMarker::Succeeded)
            .map(|(i, _)| i)
            .collect()
    }

    /// Returns all records in step order.
    pub fn records(&self) -> &[StepRecord] {
        &self.records
    }

    /// Returns the number of steps tracked.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if the log tracks no steps.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// One line per step, for log output.
    pub fn summary(&self) -> String {
        self.records
            .iter()
            .map(|record| {
                let status = match record.marker {
                    StepMarker::NotStarted => "-",
                    StepMarker::Succeeded => "ok",
                    StepMarker::Failed => "failed",
                    StepMarker::Compensated => "compensated",
                    StepMarker::CompensationFailed => "compensation failed",
                };
                format!("{}: {status}", record.name)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
