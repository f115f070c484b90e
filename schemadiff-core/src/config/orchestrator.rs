//! Orchestrator configuration.
//!
//! Controls per-invocation timeouts and whether object types are compared
//! one after another or dispatched to a bounded set of concurrent engine
//! processes.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Upper bound on concurrent engine processes.
pub const MAX_WORKERS: usize = 64;

/// How the orchestrator schedules per-type engine invocations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ExecutionMode {
    /// One object type at a time, in requested order
    #[default]
    Sequential,
    /// Up to `max_workers` engine processes at once; results are still
    /// reported in requested order
    Concurrent { max_workers: usize },
}

/// Configuration for a [`crate::DiffOrchestrator`].
///
/// # Example
/// ```rust
/// use schemadiff_core::config::{ExecutionMode, OrchestratorConfig};
/// use std::time::Duration;
///
/// let config = OrchestratorConfig::new()
///     .with_timeout(Duration::from_secs(120))
///     .with_max_workers(4);
///
/// assert!(config.validate().is_ok());
/// assert_eq!(config.execution, ExecutionMode::Concurrent { max_workers: 4 });
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Bound on a single engine invocation; `None` waits indefinitely
    pub timeout: Option<Duration>,
    /// Scheduling of per-type invocations
    pub execution: ExecutionMode,
}

impl OrchestratorConfig {
    /// Creates a sequential configuration without a timeout.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set the per-invocation timeout.
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Builder method to enable concurrent dispatch.
    ///
    /// A single worker is equivalent to sequential execution and is stored
    /// as such.
    pub const fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.execution = if max_workers == 1 {
            ExecutionMode::Sequential
        } else {
            ExecutionMode::Concurrent { max_workers }
        };
        self
    }

    /// Validates configuration values.
    ///
    /// # Errors
    /// Returns error if the timeout is zero or the worker limit is outside
    /// `1..=MAX_WORKERS`.
    pub fn validate(&self) -> crate::Result<()> {
        if self.timeout.is_some_and(|t| t.is_zero()) {
            return Err(crate::error::SchemaDiffError::configuration(
                "timeout must be greater than 0",
            ));
        }

        if let ExecutionMode::Concurrent { max_workers } = self.execution {
            if max_workers == 0 {
                return Err(crate::error::SchemaDiffError::configuration(
                    "max_workers must be greater than 0",
                ));
            }

            if max_workers > MAX_WORKERS {
                return Err(crate::error::SchemaDiffError::configuration(format!(
                    "max_workers should not exceed {MAX_WORKERS}"
                )));
            }
        }

        Ok(())
    }
}
