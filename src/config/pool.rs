//! Pool configuration structure.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::task::SubmitOptions;

/// Worker pool configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Maximum simultaneous running tasks.
    pub max_workers: usize,
    /// Default per-attempt timeout in milliseconds for submissions that do
    /// not set one.
    pub default_timeout_ms: u64,
    /// Default retry budget for submissions that do not set one.
    pub default_retry_budget: u32,
    /// Buffer size of the event broadcast channel.
    pub event_capacity: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_workers: num_cpus::get(),
            default_timeout_ms: 5000,
            default_retry_budget: 0,
            event_capacity: 64,
        }
    }
}

impl PoolConfig {
    /// Create a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum simultaneous running tasks.
    #[must_use]
    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers;
        self
    }

    /// Set the default per-attempt timeout in milliseconds.
    #[must_use]
    pub fn with_default_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.default_timeout_ms = timeout_ms;
        self
    }

    /// Set the default retry budget.
    #[must_use]
    pub fn with_default_retry_budget(mut self, retry_budget: u32) -> Self {
        self.default_retry_budget = retry_budget;
        self
    }

    /// Set the event channel capacity.
    #[must_use]
    pub fn with_event_capacity(mut self, event_capacity: usize) -> Self {
        self.event_capacity = event_capacity;
        self
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns a message naming the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_workers == 0 {
            return Err("max_workers must be greater than 0".into());
        }
        if self.default_timeout_ms == 0 {
            return Err("default_timeout_ms must be greater than 0".into());
        }
        if self.event_capacity == 0 {
            return Err("event_capacity must be greater than 0".into());
        }
        Ok(())
    }

    /// Parse a configuration from a JSON string and validate it.
    ///
    /// # Errors
    ///
    /// Returns a message describing the parse or validation failure.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Submission options seeded from this configuration's defaults.
    #[must_use]
    pub fn submit_defaults(&self) -> SubmitOptions {
        SubmitOptions::default()
            .timeout(Duration::from_millis(self.default_timeout_ms))
            .retry_budget(self.default_retry_budget)
    }
}
