//! Task records, submission options, and the caller-facing task handle.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use crate::core::error::{AppResult, PoolError};

/// Unique task identifier, assigned monotonically at submission time.
pub type TaskId = u64;

/// One attempt of a task's work, boxed for storage in the queue.
pub(crate) type AttemptFuture<V> = Pin<Box<dyn Future<Output = AppResult<V>> + Send>>;

/// Caller-supplied work factory. Invoked once per attempt so retries get a
/// fresh future each time.
pub(crate) type WorkFn<V> = Arc<dyn Fn() -> AttemptFuture<V> + Send + Sync>;

/// Scheduling parameters for one submission.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SubmitOptions {
    /// Higher priority runs first; ties break in submission order.
    pub priority: i64,
    /// Wall-clock budget per attempt.
    pub timeout: Duration,
    /// Maximum retries after the first attempt.
    pub retry_budget: u32,
}

impl Default for SubmitOptions {
    fn default() -> Self {
        Self {
            priority: 0,
            timeout: Duration::from_millis(5000),
            retry_budget: 0,
        }
    }
}

impl SubmitOptions {
    /// Set the priority.
    #[must_use]
    pub fn priority(mut self, priority: i64) -> Self {
        self.priority = priority;
        self
    }

    /// Set the per-attempt timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the retry budget.
    #[must_use]
    pub fn retry_budget(mut self, retry_budget: u32) -> Self {
        self.retry_budget = retry_budget;
        self
    }
}

/// A submitted task together with its scheduling metadata and the sender that
/// settles the caller's handle. Lives in the pending queue until it starts,
/// is canceled, or is drained at shutdown.
pub(crate) struct TaskRecord<V> {
    /// Stable identifier used for cancellation, result lookup, and events.
    pub id: TaskId,
    /// Monotonic insertion counter; FIFO tie-break among equal priorities.
    pub seq: u64,
    /// Work factory, invoked once per attempt.
    pub work: WorkFn<V>,
    /// Queue ordering key, higher first.
    pub priority: i64,
    /// Per-attempt wall-clock budget.
    pub timeout: Duration,
    /// Retries allowed after the first attempt.
    pub retry_budget: u32,
    /// Attempts already consumed; incremented on re-enqueue.
    pub attempts_used: u32,
    /// Settles the caller's `TaskHandle` exactly once.
    pub done: oneshot::Sender<Result<V, PoolError>>,
}

/// Future returned by [`WorkerPool::submit`](crate::core::pool::WorkerPool::submit).
///
/// Settles exactly once with the task's terminal outcome: the success value,
/// or a [`PoolError`] distinguishing timeout, execution failure, and
/// cancellation.
#[derive(Debug)]
pub struct TaskHandle<V> {
    pub(crate) id: TaskId,
    pub(crate) rx: oneshot::Receiver<Result<V, PoolError>>,
}

impl<V> TaskHandle<V> {
    /// Id of the submitted task, usable for cancellation and result lookup.
    #[must_use]
    pub fn id(&self) -> TaskId {
        self.id
    }
}

impl<V> Future for TaskHandle<V> {
    type Output = Result<V, PoolError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        // The sender is consumed on every terminal path, so a closed channel
        // only happens if the pool was dropped with the task still queued.
        Pin::new(&mut self.rx).poll(cx).map(|res| match res {
            Ok(outcome) => outcome,
            Err(_) => Err(PoolError::PoolClosed),
        })
    }
}

/// One pending-queue entry as reported by
/// [`WorkerPool::queue_snapshot`](crate::core::pool::WorkerPool::queue_snapshot).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueEntry {
    /// Task identifier.
    pub id: TaskId,
    /// Task priority.
    pub priority: i64,
}

/// Point-in-time progress counters, computed from one consistent read of the
/// pool state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolProgress {
    /// Tasks that terminally succeeded.
    pub completed: usize,
    /// Tasks queued or currently executing.
    pub pending: usize,
    /// `completed + pending`.
    pub total: usize,
}
