//! Core scheduling types: the pending queue, the worker pool, and its events.

pub mod error;
pub mod events;
pub mod pool;
pub mod queue;
pub mod task;

pub use error::{AppResult, PoolError};
pub use events::PoolEvent;
pub use pool::WorkerPool;
pub use queue::PendingQueue;
pub use task::{PoolProgress, QueueEntry, SubmitOptions, TaskHandle, TaskId};
