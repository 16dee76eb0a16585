//! Worker pool: admission loop, per-attempt supervision, and lifecycle
//! operations.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{broadcast, oneshot, Notify};
use tracing::{debug, info, warn};

use crate::config::PoolConfig;
use crate::core::error::{AppResult, PoolError};
use crate::core::events::PoolEvent;
use crate::core::queue::PendingQueue;
use crate::core::task::{
    AttemptFuture, PoolProgress, QueueEntry, SubmitOptions, TaskHandle, TaskId, TaskRecord, WorkFn,
};

/// Mutable pool state. Queue and counters share one mutex so a dequeue and
/// its `active` increment form a single transition; two locks here would
/// allow lost-update races between them.
struct PoolState<V> {
    /// Current maximum simultaneous running tasks.
    limit: usize,
    /// Tasks currently executing. Invariant: `active <= limit` at every
    /// dispatch decision.
    active: usize,
    /// Not-yet-started records.
    queue: PendingQueue<V>,
    /// Terminal success values by task id. Never evicted; bounded by process
    /// lifetime, which is acceptable for this scope.
    results: HashMap<TaskId, V>,
    /// False once shutdown begins; submissions then fail fast.
    accepting: bool,
    /// True once shutdown is requested; gates dispatch of queued records.
    shutting_down: bool,
    /// True once the shutdown drain has completed.
    shut_down: bool,
}

struct PoolInner<V> {
    state: Mutex<PoolState<V>>,
    /// Signaled whenever `active` drops to zero; the shutdown barrier
    /// suspends on this instead of polling.
    idle: Notify,
    events: broadcast::Sender<PoolEvent<V>>,
    next_id: AtomicU64,
    defaults: SubmitOptions,
}

/// Bounded-concurrency priority task pool.
///
/// Cheaply cloneable handle; all clones share one scheduler. Tasks are
/// admitted by [`submit`](Self::submit), run as independent tokio tasks under
/// a timeout race, and settle the returned [`TaskHandle`] exactly once.
pub struct WorkerPool<V> {
    inner: Arc<PoolInner<V>>,
}

impl<V> Clone for WorkerPool<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V> WorkerPool<V>
where
    V: Clone + Send + 'static,
{
    /// Create a pool from a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::InvalidArgument`] if the configuration is
    /// invalid.
    pub fn new(config: PoolConfig) -> Result<Self, PoolError> {
        config.validate().map_err(PoolError::InvalidArgument)?;

        let (events, _) = broadcast::channel(config.event_capacity);
        info!(
            max_workers = config.max_workers,
            default_timeout_ms = config.default_timeout_ms,
            "worker pool initialized"
        );

        Ok(Self {
            inner: Arc::new(PoolInner {
                state: Mutex::new(PoolState {
                    limit: config.max_workers,
                    active: 0,
                    queue: PendingQueue::new(),
                    results: HashMap::new(),
                    accepting: true,
                    shutting_down: false,
                    shut_down: false,
                }),
                idle: Notify::new(),
                events,
                next_id: AtomicU64::new(0),
                defaults: config.submit_defaults(),
            }),
        })
    }

    /// Create a pool with the given concurrency limit and default settings.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::InvalidArgument`] if `limit` is zero.
    pub fn with_limit(limit: usize) -> Result<Self, PoolError> {
        Self::new(PoolConfig::new().with_max_workers(limit))
    }

    /// Submission options seeded from the pool configuration's defaults.
    #[must_use]
    pub fn default_options(&self) -> SubmitOptions {
        self.inner.defaults
    }

    /// Subscribe to lifecycle notifications. Each receiver sees all events
    /// for a given task in causal order.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<PoolEvent<V>> {
        self.inner.events.subscribe()
    }

    /// Submit a unit of work.
    ///
    /// `work` is invoked once per attempt, so a retried task re-runs it from
    /// scratch. The returned [`TaskHandle`] settles exactly once with the
    /// terminal outcome.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::PoolClosed`] once shutdown has begun; the work is
    /// not enqueued in that case.
    pub fn submit<F, Fut>(
        &self,
        work: F,
        options: SubmitOptions,
    ) -> Result<TaskHandle<V>, PoolError>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = AppResult<V>> + Send + 'static,
    {
        let work: WorkFn<V> = Arc::new(move || Box::pin(work()) as AttemptFuture<V>);
        let (done, rx) = oneshot::channel();

        let id = {
            let mut state = self.inner.state.lock();
            if !state.accepting {
                return Err(PoolError::PoolClosed);
            }
            let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
            state.queue.insert(TaskRecord {
                id,
                seq: id,
                work,
                priority: options.priority,
                timeout: options.timeout,
                retry_budget: options.retry_budget,
                attempts_used: 0,
                done,
            });
            id
        };

        debug!(
            task_id = id,
            priority = options.priority,
            retry_budget = options.retry_budget,
            "task submitted"
        );
        self.try_dispatch();
        Ok(TaskHandle { id, rx })
    }

    /// Cancel a not-yet-started task.
    ///
    /// Removes the record from the queue, emits `TaskCanceled`, and rejects
    /// its handle. A task that is already running, already terminal, or
    /// unknown is left alone and no event is emitted; in-flight work is never
    /// interrupted.
    pub fn cancel(&self, id: TaskId) {
        let removed = self.inner.state.lock().queue.remove_by_id(id);
        if let Some(record) = removed {
            info!(task_id = id, "task canceled");
            self.emit(PoolEvent::TaskCanceled { id });
            let _ = record.done.send(Err(PoolError::TaskCanceled { id }));
        }
    }

    /// Change the concurrency limit at runtime.
    ///
    /// An increase starts more queued work immediately; a decrease takes
    /// effect as running tasks finish and never preempts active work.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::InvalidArgument`] if `limit` is zero; pool state
    /// is unchanged.
    pub fn set_concurrency_limit(&self, limit: usize) -> Result<(), PoolError> {
        if limit < 1 {
            return Err(PoolError::InvalidArgument(
                "concurrency limit must be at least 1".into(),
            ));
        }
        self.inner.state.lock().limit = limit;
        info!(limit, "concurrency limit updated");
        self.try_dispatch();
        Ok(())
    }

    /// Current concurrency limit.
    #[must_use]
    pub fn concurrency_limit(&self) -> usize {
        self.inner.state.lock().limit
    }

    /// Ordered `(id, priority)` pairs for every pending task.
    #[must_use]
    pub fn queue_snapshot(&self) -> Vec<QueueEntry> {
        self.inner.state.lock().queue.snapshot()
    }

    /// Progress counters from one consistent read of the pool state.
    #[must_use]
    pub fn progress(&self) -> PoolProgress {
        let state = self.inner.state.lock();
        let completed = state.results.len();
        let pending = state.queue.len() + state.active;
        PoolProgress {
            completed,
            pending,
            total: completed + pending,
        }
    }

    /// Stored success value for a task, if it has terminally succeeded.
    ///
    /// Does not distinguish a still-running task from one that never existed.
    #[must_use]
    pub fn result(&self, id: TaskId) -> Option<V> {
        self.inner.state.lock().results.get(&id).cloned()
    }

    /// Drain the pool: stop accepting submissions, wait for in-flight tasks
    /// to finish, then reject every still-queued task with
    /// [`PoolError::TaskCanceled`], lowest priority first.
    ///
    /// Idempotent; calling again after completion is a no-op. The wait is
    /// event-driven, not a busy spin.
    pub async fn shutdown(&self) {
        {
            let mut state = self.inner.state.lock();
            if state.shut_down {
                return;
            }
            state.accepting = false;
            state.shutting_down = true;
        }
        info!("pool shutting down, waiting for in-flight tasks");

        loop {
            let notified = self.inner.idle.notified();
            tokio::pin!(notified);
            // Register interest before re-checking so a final-task wakeup
            // between the check and the await cannot be missed.
            notified.as_mut().enable();
            if self.inner.state.lock().active == 0 {
                break;
            }
            notified.await;
        }

        let drained = {
            let mut state = self.inner.state.lock();
            let drained = state.queue.drain_for_shutdown();
            state.shut_down = true;
            drained
        };
        if !drained.is_empty() {
            warn!(count = drained.len(), "rejecting tasks still queued at shutdown");
        }
        for record in drained {
            let id = record.id;
            self.emit(PoolEvent::TaskCanceled { id });
            let _ = record.done.send(Err(PoolError::TaskCanceled { id }));
        }
        info!("pool shut down");
    }

    /// Admission loop: start queued tasks while a slot is free.
    ///
    /// Idempotent and safe to call redundantly; every pop and its `active`
    /// increment happen under one lock acquisition. Dispatch stops entirely
    /// once shutdown is requested so the drain sees every remaining record.
    fn try_dispatch(&self) {
        loop {
            let record = {
                let mut state = self.inner.state.lock();
                if state.shutting_down || state.active >= state.limit {
                    return;
                }
                let Some(record) = state.queue.pop_highest() else {
                    return;
                };
                state.active += 1;
                record
            };
            debug!(
                task_id = record.id,
                priority = record.priority,
                attempt = record.attempts_used + 1,
                "dispatching task"
            );
            let pool = self.clone();
            tokio::spawn(async move { pool.supervise(record).await });
        }
    }

    /// Run one attempt of one task under its deadline and classify the
    /// outcome.
    async fn supervise(&self, record: TaskRecord<V>) {
        let id = record.id;
        let timeout_ms = u64::try_from(record.timeout.as_millis()).unwrap_or(u64::MAX);

        // The work runs as its own task so a panic inside it cannot unwind
        // into the scheduler, and so an abandoned attempt keeps running
        // detached after a timeout with only its result discarded.
        let attempt = tokio::spawn((record.work)());
        let outcome = tokio::select! {
            joined = attempt => Some(joined),
            () = tokio::time::sleep(record.timeout) => None,
        };

        match outcome {
            Some(Ok(Ok(value))) => {
                debug!(task_id = id, "task completed");
                self.inner.state.lock().results.insert(id, value.clone());
                self.emit(PoolEvent::TaskCompleted {
                    id,
                    result: value.clone(),
                });
                let _ = record.done.send(Ok(value));
            }
            Some(Ok(Err(err))) => {
                let error = PoolError::TaskExecution {
                    id,
                    reason: format!("{err:#}"),
                };
                self.handle_failed_attempt(record, error);
            }
            Some(Err(join_err)) => {
                let error = PoolError::TaskExecution {
                    id,
                    reason: format!("work aborted: {join_err}"),
                };
                self.handle_failed_attempt(record, error);
            }
            None => {
                warn!(task_id = id, timeout_ms, "task attempt timed out");
                self.emit(PoolEvent::TaskTimeout { id });
                let error = PoolError::TaskTimeout { id, timeout_ms };
                self.handle_failed_attempt(record, error);
            }
        }

        self.finish_attempt();
    }

    /// Retry policy for a failed attempt: re-enqueue while budget remains,
    /// otherwise settle the handle with the terminal error.
    fn handle_failed_attempt(&self, mut record: TaskRecord<V>, error: PoolError) {
        if record.attempts_used < record.retry_budget {
            record.attempts_used += 1;
            debug!(
                task_id = record.id,
                attempt = record.attempts_used,
                "re-queueing failed task"
            );
            // Competes on its original priority and insertion order; no
            // head-of-line status. During a shutdown drain this record is
            // rejected instead of retried.
            self.inner.state.lock().queue.insert(record);
        } else {
            warn!(task_id = record.id, %error, "task failed, retries exhausted");
            self.emit(PoolEvent::TaskError {
                id: record.id,
                error: error.clone(),
            });
            let _ = record.done.send(Err(error));
        }
    }

    /// Post-attempt bookkeeping: free the slot, wake the shutdown barrier at
    /// idle, and keep throughput self-sustaining.
    fn finish_attempt(&self) {
        let idle = {
            let mut state = self.inner.state.lock();
            state.active -= 1;
            state.active == 0
        };
        if idle {
            self.inner.idle.notify_waiters();
        }
        self.try_dispatch();
    }

    fn emit(&self, event: PoolEvent<V>) {
        // Send fails only when no subscriber is registered, which is fine.
        let _ = self.inner.events.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_submit_after_shutdown_fails_fast() {
        let pool: WorkerPool<u32> = WorkerPool::with_limit(2).unwrap();
        pool.shutdown().await;

        let err = pool
            .submit(|| async { Ok(1) }, SubmitOptions::default())
            .unwrap_err();
        assert_eq!(err, PoolError::PoolClosed);
    }

    #[tokio::test]
    async fn test_resize_to_zero_rejected_without_state_change() {
        let pool: WorkerPool<u32> = WorkerPool::with_limit(3).unwrap();
        let err = pool.set_concurrency_limit(0).unwrap_err();
        assert!(matches!(err, PoolError::InvalidArgument(_)));
        assert_eq!(pool.concurrency_limit(), 3);
    }

    #[tokio::test]
    async fn test_cancel_unknown_id_is_noop() {
        let pool: WorkerPool<u32> = WorkerPool::with_limit(1).unwrap();
        let mut events = pool.subscribe();
        pool.cancel(42);
        assert!(matches!(
            events.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }

    #[tokio::test]
    async fn test_shutdown_is_idempotent() {
        let pool: WorkerPool<u32> = WorkerPool::with_limit(1).unwrap();
        pool.shutdown().await;
        pool.shutdown().await;
        assert_eq!(pool.progress().total, 0);
    }
}
