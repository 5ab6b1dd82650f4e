//! Saga steps: a forward action plus an optional compensation.

use std::future::Future;

use async_trait::async_trait;

use crate::context::ExecutionContext;
use crate::error::StepError;
use crate::run::RunData;

/// An asynchronous, side-effecting unit of work.
///
/// Implemented for any `Fn(ExecutionContext, RunData<D>) -> impl Future`,
/// so plain closures and `async fn` pointers can be used directly.
#[async_trait]
pub trait Action<D>: Send + Sync {
    /// Runs the action.
    async fn run(&self, ctx: &ExecutionContext, data: &RunData<D>) -> Result<(), StepError>;
}

#[async_trait]
impl<D, F, Fut> Action<D> for F
where
    D: Send + 'static,
    F: Fn(ExecutionContext, RunData<D>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), StepError>> + Send + 'static,
{
    async fn run(&self, ctx: &ExecutionContext, data: &RunData<D>) -> Result<(), StepError> {
        (self)(ctx.clone(), data.clone()).await
    }
}

/// A named step of a saga.
///
/// The coordinator invokes `forward` at most once per run and, if a later
/// step fails, `compensate` at most once. A step without a compensation is
/// skipped during rollback.
pub struct Step<D> {
    name: String,
    forward: Box<dyn Action<D>>,
    compensate: Option<Box<dyn Action<D>>>,
}

impl<D: Send + 'static> Step<D> {
    /// Creates a step from a forward closure.
    pub fn new<F, Fut>(name: impl Into<String>, forward: F) -> Self
    where
        F: Fn(ExecutionContext, RunData<D>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), StepError>> + Send + 'static,
    {
        Self::from_action(name, forward)
    }

    /// Creates a step from any [`Action`] implementation.
    pub fn from_action(name: impl Into<String>, forward: impl Action<D> + 'static) -> Self {
        Self {
            name: name.into(),
            forward: Box::new(forward),
            compensate: None,
        }
    }

    /// Attaches a compensation closure.
    pub fn compensate_with<F, Fut>(self, compensate: F) -> Self
    where
        F: Fn(ExecutionContext, RunData<D>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), StepError>> + Send + 'static,
    {
        self.with_compensation(compensate)
    }

    /// Attaches a compensation [`Action`].
    pub fn with_compensation(mut self, compensate: impl Action<D> + 'static) -> Self {
        self.compensate = Some(Box::new(compensate));
        self
    }
}

impl<D> Step<D> {
    /// Returns the step name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns true if the step has a compensation.
    pub fn has_compensation(&self) -> bool {
        self.compensate.is_some()
    }

    pub(crate) fn forward(&self) -> &dyn Action<D> {
        self.forward.as_ref()
    }

    pub(crate) fn compensation(&self) -> Option<&dyn Action<D>> {
        self.compensate.as_deref()
    }
}

impl<D> std::fmt::Debug for Step<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Step")
            .field("name", &self.name)
            .field("has_compensation", &self.has_compensation())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn bump(_ctx: ExecutionContext, data: RunData<u32>) -> Result<(), StepError> {
        data.update(|n| *n += 1).await;
        Ok(())
    }

    struct Reject;

    #[async_trait]
    impl Action<u32> for Reject {
        async fn run(&self, _ctx: &ExecutionContext, _data: &RunData<u32>) -> Result<(), StepError> {
            Err(StepError::failed("rejected"))
        }
    }

    #[tokio::test]
    async fn async_fn_is_an_action() {
        let step = Step::new("bump", bump);
        let data = RunData::new(0);
        step.forward()
            .run(&ExecutionContext::new(), &data)
            .await
            .unwrap();
        assert_eq!(data.read(|n| *n).await, 1);
        assert!(!step.has_compensation());
    }

    #[tokio::test]
    async fn struct_actions_can_be_attached() {
        let step = Step::new("bump", bump).with_compensation(Reject);
        assert!(step.has_compensation());
        let result = step
            .compensation()
            .unwrap()
            .run(&ExecutionContext::new(), &RunData::new(0))
            .await;
        assert!(matches!(result, Err(StepError::Failed(_))));
    }

    #[test]
    fn debug_shows_name_and_compensation() {
        let step = Step::new("bump", bump);
        let rendered = format!("{step:?}");
        assert!(rendered.contains("bump"));
        assert!(rendered.contains("has_compensation: false"));
    }
}
