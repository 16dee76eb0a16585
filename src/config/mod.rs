//! Configuration model for pools.

pub mod pool;

pub use pool::PoolConfig;
