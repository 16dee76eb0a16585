//! # Workpool
//!
//! A bounded-concurrency priority task pool built on tokio.
//!
//! Callers submit asynchronous units of work together with a priority, a
//! per-attempt timeout, and a retry budget. The pool runs at most
//! `concurrency limit` tasks at once, races every attempt against its
//! deadline, re-queues failed attempts while budget remains, supports
//! cancellation of not-yet-started tasks, allows the concurrency limit to be
//! raised or lowered at runtime, and drains cleanly on shutdown.
//!
//! ## Scheduling model
//!
//! - Pending tasks are ordered by priority (higher first) with FIFO ordering
//!   among equal priorities, so scheduling is deterministic.
//! - An attempt and its timeout timer race; whichever settles first wins and
//!   the loser's eventual outcome is discarded. A timed-out attempt's work is
//!   not preempted - it keeps running detached and its result is ignored.
//! - Cancellation only affects tasks still in the queue. In-flight work is
//!   never interrupted.
//!
//! ## Example
//!
//! ```rust,no_run
//! use workpool::{PoolConfig, SubmitOptions, WorkerPool};
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let pool: WorkerPool<String> = WorkerPool::new(
//!     PoolConfig::new().with_max_workers(3),
//! )?;
//!
//! let handle = pool.submit(
//!     || async { Ok("done".to_string()) },
//!     SubmitOptions::default().priority(5),
//! )?;
//!
//! let value = handle.await?;
//! assert_eq!(value, "done");
//!
//! pool.shutdown().await;
//! # Ok(())
//! # }
//! ```
//!
//! Lifecycle notifications (`TaskCompleted`, `TaskError`, `TaskTimeout`,
//! `TaskCanceled`) are delivered over a broadcast channel obtained from
//! [`WorkerPool::subscribe`].

#![deny(warnings)]
#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]

/// Core pool, queue, and event types.
pub mod core;
/// Configuration model for pools.
pub mod config;
/// Shared utilities.
pub mod util;

pub use crate::config::PoolConfig;
pub use crate::core::{
    AppResult, PoolError, PoolEvent, PoolProgress, QueueEntry, SubmitOptions, TaskHandle, TaskId,
    WorkerPool,
};
