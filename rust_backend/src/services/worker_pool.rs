//! Bounded worker pool shared by every task of one analysis run.
//!
//! Tasks run on a dedicated rayon pool, so the data-parallel passes inside a
//! cluster analysis are bounded by the same thread count. Each submission
//! returns a future resolved through a oneshot channel, which lets the async
//! orchestration join tasks and race them against a deadline.
//!
//! Cancellation is cooperative and happens at task boundaries: once the pool
//! is cancelled, tasks that have not started yet resolve to
//! [`AnalysisError::Cancelled`] without running. A task that is already
//! running stops only where it checks [`WorkerPool::cancellation_token`]
//! itself; its result is dropped if nobody awaits it anymore.

use log::debug;
use std::any::Any;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use crate::error::{AnalysisError, AnalysisResult};

pub struct WorkerPool {
    pool: rayon::ThreadPool,
    cancel: CancellationToken,
}

impl WorkerPool {
    /// Create a pool with `threads` workers.
    ///
    /// # Errors
    /// * `AnalysisError::WorkerPool` if `threads` is zero or the threads
    ///   cannot be spawned
    pub fn new(threads: usize) -> AnalysisResult<Self> {
        if threads == 0 {
            return Err(AnalysisError::WorkerPool(
                "worker pool needs at least one thread".to_string(),
            ));
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("bread-worker-{}", i))
            .build()
            .map_err(|e| AnalysisError::WorkerPool(format!("Failed to build thread pool: {}", e)))?;

        debug!("Started worker pool with {} threads", threads);

        Ok(Self {
            pool,
            cancel: CancellationToken::new(),
        })
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Token cancelled together with this pool.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Stop starting new tasks. Idempotent.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Run `task` on the pool.
    ///
    /// The returned future does not borrow the pool. It resolves to the task's
    /// result, to `Cancelled` if the pool was cancelled before the task
    /// started, or to `InternalError` if the task panicked.
    pub fn submit<F, R>(&self, task: F) -> impl Future<Output = AnalysisResult<R>> + Send + 'static
    where
        F: FnOnce() -> AnalysisResult<R> + Send + 'static,
        R: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let cancel = self.cancel.clone();

        self.pool.spawn(move || {
            if cancel.is_cancelled() {
                return;
            }
            let result = panic::catch_unwind(AssertUnwindSafe(task))
                .unwrap_or_else(|payload| Err(AnalysisError::InternalError(panic_message(payload))));
            // receiver gone means the run was abandoned
            let _ = tx.send(result);
        });

        async move { rx.await.unwrap_or(Err(AnalysisError::Cancelled)) }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("Worker task panicked: {}", message)
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("Worker task panicked: {}", message)
    } else {
        "Worker task panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_submit_returns_result() {
        let pool = WorkerPool::new(2).unwrap();
        let value = pool.submit(|| Ok(6 * 7)).await.unwrap();
        assert_eq!(value, 42);
        assert_eq!(pool.threads(), 2);
    }

    #[tokio::test]
    async fn test_task_error_is_propagated() {
        let pool = WorkerPool::new(1).unwrap();
        let result: AnalysisResult<()> = pool
            .submit(|| Err(AnalysisError::DuplicateKey(vec![1, 2, 3])))
            .await;
        assert_eq!(result, Err(AnalysisError::DuplicateKey(vec![1, 2, 3])));
    }

    #[tokio::test]
    async fn test_cancelled_pool_skips_new_tasks() {
        let pool = WorkerPool::new(1).unwrap();
        pool.cancel();
        assert!(pool.is_cancelled());

        let result = pool.submit(|| Ok(1)).await;
        assert_eq!(result, Err(AnalysisError::Cancelled));
    }

    #[tokio::test]
    async fn test_running_task_observes_cancellation() {
        let pool = WorkerPool::new(1).unwrap();
        let token = pool.cancellation_token();
        let (started_tx, started_rx) = std::sync::mpsc::channel();

        let task = pool.submit(move || {
            started_tx.send(()).unwrap();
            while !token.is_cancelled() {
                std::thread::yield_now();
            }
            Err::<(), _>(AnalysisError::Cancelled)
        });

        started_rx.recv().unwrap();
        pool.cancel();
        assert_eq!(task.await, Err(AnalysisError::Cancelled));
    }

    #[tokio::test]
    async fn test_panic_becomes_internal_error() {
        let pool = WorkerPool::new(1).unwrap();
        let result: AnalysisResult<()> = pool.submit(|| panic!("boom")).await;
        assert!(matches!(result, Err(AnalysisError::InternalError(msg)) if msg.contains("boom")));

        // the worker survives the panic
        assert_eq!(pool.submit(|| Ok("still here")).await, Ok("still here"));
    }

    #[test]
    fn test_zero_threads_rejected() {
        assert!(matches!(WorkerPool::new(0), Err(AnalysisError::WorkerPool(_))));
    }
}
