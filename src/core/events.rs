//! Lifecycle notifications emitted by the pool.

use crate::core::error::PoolError;
use crate::core::task::TaskId;

/// A lifecycle notification for one task.
///
/// Each subscriber sees all events for a given task in causal order: a
/// `TaskTimeout` precedes the `TaskError` it causes when the timeout exhausts
/// the retry budget, and exactly one of `TaskCompleted` / `TaskError` /
/// `TaskCanceled` is emitted per task's terminal outcome.
#[derive(Debug, Clone, PartialEq)]
pub enum PoolEvent<V> {
    /// The task terminally succeeded.
    TaskCompleted {
        /// Task identifier.
        id: TaskId,
        /// The stored success value.
        result: V,
    },
    /// The task terminally failed with its retry budget exhausted.
    TaskError {
        /// Task identifier.
        id: TaskId,
        /// The terminal error, as delivered to the task's handle.
        error: PoolError,
    },
    /// One attempt's timer fired before the work settled. Not terminal by
    /// itself; retries may follow.
    TaskTimeout {
        /// Task identifier.
        id: TaskId,
    },
    /// The task was removed before starting, by `cancel` or the shutdown
    /// drain.
    TaskCanceled {
        /// Task identifier.
        id: TaskId,
    },
}

impl<V> PoolEvent<V> {
    /// Id of the task this event concerns.
    #[must_use]
    pub fn task_id(&self) -> TaskId {
        match self {
            Self::TaskCompleted { id, .. }
            | Self::TaskError { id, .. }
            | Self::TaskTimeout { id }
            | Self::TaskCanceled { id } => *id,
        }
    }
}
