//! Comparison engine contract.
//!
//! The engine is the external black box that introspects both databases and
//! produces a textual diff for one object type. This module defines the
//! object-safe trait the orchestrator talks to, the raw output it returns,
//! and the process-backed implementation used in production.

mod command;
mod resolver;

pub use command::{CommandEngine, build_engine_args};
pub use resolver::{
    EngineResolver, FixedEngineResolver, PlatformEngineResolver, bundled_engine_path,
};

use crate::{Result, config::ConnectionTarget, models::SchemaObjectType};
use async_trait::async_trait;

/// Raw result of one engine invocation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EngineOutput {
    /// Diff text written to the success channel
    pub stdout: String,
    /// Diagnostic text written to the error channel
    pub stderr: String,
    /// Exit status; zero means success. `-1` when the process was killed by
    /// a signal.
    pub status: i32,
}

impl EngineOutput {
    /// Successful output carrying `diff`.
    pub fn success(diff: impl Into<String>) -> Self {
        Self {
            stdout: diff.into(),
            ..Self::default()
        }
    }

    /// Failed output with the given status and diagnostics.
    pub fn failure(status: i32, diagnostics: impl Into<String>) -> Self {
        Self {
            stdout: String::new(),
            stderr: diagnostics.into(),
            status,
        }
    }

    /// Whether the engine reported success.
    pub const fn is_success(&self) -> bool {
        self.status == 0
    }
}

/// External schema comparison engine.
///
/// # Object Safety
/// This trait is object-safe; the orchestrator holds it as
/// `Arc<dyn ComparisonEngine>` so tests can substitute an in-memory engine.
///
/// # Cancellation
/// Implementations must release their resources when the returned future is
/// dropped. The orchestrator enforces timeouts and cancellation by dropping
/// the in-flight future.
#[async_trait]
pub trait ComparisonEngine: Send + Sync {
    /// Compares one object type between `source` and `target`.
    ///
    /// A non-zero status is returned as `Ok` with the status in
    /// [`EngineOutput::status`]; `Err` is reserved for failing to run the
    /// engine at all.
    async fn compare(
        &self,
        source: &ConnectionTarget,
        target: &ConnectionTarget,
        object_type: SchemaObjectType,
    ) -> Result<EngineOutput>;

    /// Short human readable description, safe to log.
    fn describe(&self) -> String;
}
