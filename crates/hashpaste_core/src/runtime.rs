//! Blocking bridge for substrate clients that only expose async APIs.

use crate::error::{StoreError, StoreResult};
use std::future::Future;

/// Small dedicated tokio runtime owned by one adapter.
///
/// Store calls are blocking, so async clients (sqlx, object_store) are driven
/// with `block_on`. Callers already inside a tokio runtime must reach the store
/// through `spawn_blocking`.
pub(crate) struct BlockingRuntime {
    runtime: tokio::runtime::Runtime,
}

impl BlockingRuntime {
    /// Build a two-worker multi-thread runtime so concurrent callers can all
    /// block on it.
    ///
    /// # Errors
    /// Returns [`StoreError::Recoverable`] when the runtime cannot be created.
    pub(crate) fn new(label: &'static str) -> StoreResult<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name(format!("hashpaste-{}", label))
            .enable_all()
            .build()
            .map_err(|err| {
                tracing::error!(backend = label, error = %err, "Failed to start backend runtime");
                StoreError::recoverable(
                    "An issue occurred while starting the storage backend. Please try again later.",
                )
            })?;
        Ok(Self { runtime })
    }

    pub(crate) fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }
}
