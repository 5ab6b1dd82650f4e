//! Per-run identity and state.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, MutexGuard};
use uuid::Uuid;

/// Identifier of a single `play` of a saga, used to correlate log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(Uuid);

impl RunId {
    /// Creates a new random run ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Handle to the mutable state owned by one saga run.
///
/// The coordinator creates it from the caller's initial value, hands a
/// handle to every action, and returns the final value in the outcome.
/// Values produced by one step (an inserted row's id, say) are written here
/// and read by later forward or compensating actions.
#[derive(Debug)]
pub struct RunData<D> {
    inner: Arc<Mutex<D>>,
}

impl<D> Clone for RunData<D> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<D> RunData<D> {
    pub(crate) fn new(data: D) -> Self {
        Self {
            inner: Arc::new(Mutex::new(data)),
        }
    }

    /// Locks the state for reading or writing.
    pub async fn lock(&self) -> MutexGuard<'_, D> {
        self.inner.lock().await
    }

    /// Reads a value out of the state.
    pub async fn read<R>(&self, f: impl FnOnce(&D) -> R) -> R {
        let guard = self.inner.lock().await;
        f(&guard)
    }

    /// Mutates the state in place.
    pub async fn update(&self, f: impl FnOnce(&mut D)) {
        let mut guard = self.inner.lock().await;
        f(&mut guard);
    }
}

impl<D: Clone> RunData<D> {
    /// Takes the final value, cloning it if an action kept a handle alive.
    pub(crate) async fn into_inner(self) -> D {
        match Arc::try_unwrap(self.inner) {
            Ok(mutex) => mutex.into_inner(),
            Err(shared) => shared.lock().await.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_ids_are_unique() {
        assert_ne!(RunId::new(), RunId::new());
    }

    #[tokio::test]
    async fn updates_are_visible_through_clones() {
        let data = RunData::new(Vec::<u32>::new());
        let handle = data.clone();
        handle.update(|v| v.push(7)).await;
        assert_eq!(data.read(|v| v.clone()).await, vec![7]);
    }

    #[tokio::test]
    async fn into_inner_survives_leaked_handle() {
        let data = RunData::new(1_u32);
        let leaked = data.clone();
        leaked.update(|v| *v = 2).await;
        assert_eq!(data.into_inner().await, 2);
        drop(leaked);
    }
}
