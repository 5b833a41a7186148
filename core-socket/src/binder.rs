//! Execution context binding.
//!
//! Downward operations arrive from arbitrary threads, including threads
//! the async runtime has never seen. The binder pins a
//! [`tokio::runtime::Handle`] at construction time and re-enters it for
//! every cross-boundary call, so callers never need to care which thread
//! they are on.

use crate::error::{Result, SocketError};
use std::future::Future;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::error;

/// Binds calls from foreign threads to one async runtime.
#[derive(Debug, Clone)]
pub struct ExecutionBinder {
    runtime: Handle,
}

impl ExecutionBinder {
    /// Binds to the runtime of the calling task. Fails when called
    /// outside any runtime; use [`ExecutionBinder::from_handle`] there.
    pub fn try_current() -> Result<Self> {
        let runtime = Handle::try_current().map_err(|e| {
            SocketError::ContextUnavailable(format!(
                "not inside an async runtime and no handle was supplied: {e}"
            ))
        })?;
        Ok(Self { runtime })
    }

    pub fn from_handle(runtime: Handle) -> Self {
        Self { runtime }
    }

    /// Spawns a task onto the bound runtime. Safe from any thread.
    pub fn spawn<F>(&self, future: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.runtime.spawn(future)
    }

    /// Runs `future` to completion on the bound runtime, parking the
    /// calling thread. Rejected on runtime worker threads, where parking
    /// would deadlock the executor; spawn or await there instead.
    pub fn block_on<F>(&self, future: F) -> Result<F::Output>
    where
        F: Future + Send,
        F::Output: Send,
    {
        if Handle::try_current().is_ok() {
            error!("blocking entry attempted from inside the runtime; dropping call");
            return Err(SocketError::ContextUnavailable(
                "blocking entry is only valid from threads outside the runtime".to_string(),
            ));
        }
        Ok(self.runtime.block_on(future))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_try_current_outside_runtime_fails() {
        assert!(matches!(
            ExecutionBinder::try_current(),
            Err(SocketError::ContextUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_try_current_inside_runtime() {
        assert!(ExecutionBinder::try_current().is_ok());
    }

    #[tokio::test]
    async fn test_block_on_inside_runtime_is_rejected() {
        let binder = ExecutionBinder::try_current().unwrap();
        assert!(matches!(
            binder.block_on(async { 1 }),
            Err(SocketError::ContextUnavailable(_))
        ));
    }

    #[test]
    fn test_block_on_from_foreign_thread() {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .unwrap();
        let binder = ExecutionBinder::from_handle(runtime.handle().clone());

        let result = std::thread::spawn(move || binder.block_on(async { 41 + 1 }).unwrap())
            .join()
            .unwrap();
        assert_eq!(result, 42);
    }

    #[tokio::test]
    async fn test_spawn_runs_on_bound_runtime() {
        let binder = ExecutionBinder::try_current().unwrap();
        let value = binder.spawn(async { "ok" }).await.unwrap();
        assert_eq!(value, "ok");
    }
}
