//! Error types for pool operations.

use thiserror::Error;

use crate::core::task::TaskId;

/// Errors produced by the pool and surfaced through task handles.
///
/// Terminal task outcomes are always delivered to the task's own handle,
/// never thrown into unrelated scheduler control flow; a failing task cannot
/// abort the dispatch loop or affect other tasks. All variants are `Clone` so
/// they can also ride the event channel.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PoolError {
    /// Submission was rejected because shutdown has begun.
    #[error("pool is not accepting new tasks")]
    PoolClosed,
    /// An operation received an invalid argument.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// The attempt timer expired before the work settled and the retry
    /// budget is exhausted.
    #[error("task {id} timed out after {timeout_ms}ms")]
    TaskTimeout {
        /// Id of the task that timed out.
        id: TaskId,
        /// Per-attempt budget that elapsed.
        timeout_ms: u64,
    },
    /// The work itself failed and the retry budget is exhausted.
    #[error("task {id} failed: {reason}")]
    TaskExecution {
        /// Id of the task that failed.
        id: TaskId,
        /// Message of the underlying cause.
        reason: String,
    },
    /// The task was canceled before it started, explicitly or by shutdown.
    #[error("task {id} was canceled")]
    TaskCanceled {
        /// Id of the canceled task.
        id: TaskId,
    },
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
