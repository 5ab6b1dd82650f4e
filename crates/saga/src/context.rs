//! Cancellation and deadline propagation for saga actions.

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::{CancellationToken, DropGuard};

/// Why an execution context stopped accepting work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupt {
    /// The context (or one of its parents) was cancelled.
    Cancelled,
    /// The context's deadline passed.
    DeadlineExceeded,
}

/// Execution context threaded through every forward and compensating action.
///
/// Clones share the same cancellation signal. A context built with
/// [`ExecutionContext::child`] is cancelled whenever its parent is, but
/// cancelling the child leaves the parent untouched.
#[derive(Debug, Clone, Default)]
pub struct ExecutionContext {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl ExecutionContext {
    /// Creates a context with no deadline that is never cancelled unless
    /// [`cancel`](Self::cancel) is called.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a context whose deadline is `timeout` from now.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::new().with_deadline(Instant::now() + timeout)
    }

    /// Returns this context with a deadline at `deadline`.
    ///
    /// An existing earlier deadline is kept.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(current) if current < deadline => current,
            _ => deadline,
        });
        self
    }

    /// Derives a context that inherits the deadline and observes the
    /// parent's cancellation.
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
            deadline: self.deadline,
        }
    }

    /// Cancels this context and every context derived from it.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Returns a guard that cancels this context when dropped.
    pub fn drop_guard(&self) -> DropGuard {
        self.token.clone().drop_guard()
    }

    /// Returns true if the context was cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Returns the deadline, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Returns the reason the context is done, or `None` while work may
    /// still proceed.
    pub fn interrupt(&self) -> Option<Interrupt> {
        if self.token.is_cancelled() {
            return Some(Interrupt::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(Interrupt::DeadlineExceeded),
            _ => None,
        }
    }

    /// Returns true once the context is cancelled or past its deadline.
    pub fn is_done(&self) -> bool {
        self.interrupt().is_some()
    }

    /// Resolves when the context is cancelled or its deadline passes.
    pub async fn done(&self) -> Interrupt {
        match self.deadline {
            Some(deadline) => tokio::select! {
                biased;
                () = self.token.cancelled() => Interrupt::Cancelled,
                () = tokio::time::sleep_until(deadline) => Interrupt::DeadlineExceeded,
            },
            None => {
                self.token.cancelled().await;
                Interrupt::Cancelled
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_context_is_not_done() {
        let ctx = ExecutionContext::new();
        assert!(!ctx.is_done());
        assert_eq!(ctx.interrupt(), None);
        assert!(ctx.deadline().is_none());
    }

    #[test]
    fn cancel_is_visible_to_clones() {
        let ctx = ExecutionContext::new();
        let clone = ctx.clone();
        ctx.cancel();
        assert!(clone.is_cancelled());
        assert_eq!(clone.interrupt(), Some(Interrupt::Cancelled));
    }

    #[test]
    fn child_observes_parent_but_not_vice_versa() {
        let parent = ExecutionContext::new();
        let child = parent.child();
        child.cancel();
        assert!(!parent.is_cancelled());

        let child = parent.child();
        parent.cancel();
        assert!(child.is_cancelled());
    }

    #[test]
    fn earlier_deadline_wins() {
        let now = Instant::now();
        let ctx = ExecutionContext::new()
            .with_deadline(now + Duration::from_secs(5))
            .with_deadline(now + Duration::from_secs(60));
        assert_eq!(ctx.deadline(), Some(now + Duration::from_secs(5)));
    }

    #[tokio::test]
    async fn done_resolves_on_deadline() {
        let ctx = ExecutionContext::with_timeout(Duration::from_millis(10));
        assert_eq!(ctx.done().await, Interrupt::DeadlineExceeded);
        assert!(ctx.is_done());
    }

    #[tokio::test]
    async fn done_resolves_on_cancel() {
        let ctx = ExecutionContext::with_timeout(Duration::from_secs(60));
        let canceller = ctx.clone();
        tokio::spawn(async move { canceller.cancel() });
        assert_eq!(ctx.done().await, Interrupt::Cancelled);
    }

    #[test]
    fn dropping_the_guard_cancels() {
        let ctx = ExecutionContext::new();
        let run = ctx.child();
        let guard = run.drop_guard();
        assert!(!run.is_cancelled());

        drop(guard);
        assert!(run.is_cancelled());
        assert!(!ctx.is_cancelled());
    }
}
