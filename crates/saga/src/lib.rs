//! Compensating-transaction (saga) coordinator.
//!
//! A [`Saga`] is an ordered list of [`Step`]s, each a forward action with an
//! optional compensation. A [`Coordinator`] plays the steps in order; when a
//! step fails it compensates the steps that already succeeded, newest first,
//! and keeps going even if a compensation fails. The caller inspects the
//! returned [`SagaOutcome`].
//!
//! ```text
//! forward:      S0 ──► S1 ──► S2 (fails)
//! compensate:          S1 ──► S0
//! ```
//!
//! Per-run values (an id created by one step and needed by a later one) live
//! in [`RunData`], which every action receives by handle.

pub mod context;
pub mod coordinator;
pub mod error;
pub mod log;
pub mod observer;
pub mod outcome;
pub mod run;
pub mod saga;
pub mod state;
pub mod step;

pub use context::{ExecutionContext, Interrupt};
pub use coordinator::{Coordinator, DEFAULT_COMPENSATION_TIMEOUT};
pub use error::{BoxError, CompensationError, ExecutionError, SagaError, StepError};
pub use log::{ExecutionLog, StepMarker, StepRecord};
pub use observer::{
    FanOut, MetricsObserver, NoopObserver, RunInfo, SagaObserver, StepInfo, TracingObserver,
};
pub use outcome::SagaOutcome;
pub use run::{RunData, RunId};
pub use saga::Saga;
pub use state::CoordinatorState;
pub use step::{Action, Step};
