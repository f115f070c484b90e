//! Configuration types for comparison runs.
//!
//! - `ConnectionTarget`: one database endpoint, credentials included
//! - `OrchestratorConfig`: timeout and scheduling of engine invocations

mod orchestrator;
mod target;

pub use orchestrator::{ExecutionMode, MAX_WORKERS, OrchestratorConfig};
pub use target::{ConnectionTarget, DEFAULT_PORT};
