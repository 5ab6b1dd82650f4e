//! Saga definition: an ordered sequence of steps.

use crate::error::{Result, SagaError};
use crate::step::Step;

/// An ordered, append-only sequence of steps describing one workflow.
///
/// Step order is the only source of execution order; compensation runs in
/// the reverse order. Once the saga is handed to a
/// [`Coordinator`](crate::Coordinator) it is moved, so it can no longer be
/// extended.
#[derive(Debug)]
pub struct Saga<D> {
    name: String,
    pub(crate) steps: Vec<Step<D>>,
}

impl<D> Saga<D> {
    /// Creates an empty saga.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            steps: Vec::new(),
        }
    }

    /// Appends a step.
    ///
    /// # Errors
    ///
    /// Returns [`SagaError::PreconditionViolation`] if the step name is blank
    /// or a step with the same name was already added; names key the
    /// execution log.
    pub fn add_step(&mut self, step: Step<D>) -> Result<&mut Self> {
        if step.name().trim().is_empty() {
            return Err(SagaError::PreconditionViolation(format!(
                "blank step name in saga '{}'",
                self.name
            )));
        }
        if self.steps.iter().any(|s| s.name() == step.name()) {
            return Err(SagaError::PreconditionViolation(format!(
                "duplicate step name '{}' in saga '{}'",
                step.name(),
                self.name
            )));
        }
        self.steps.push(step);
        Ok(self)
    }

    /// Returns the saga name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the number of steps.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Returns true if the saga has no steps.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Returns the step names in execution order.
    pub fn step_names(&self) -> impl Iterator<Item = &str> {
        self.steps.iter().map(Step::name)
    }
}
