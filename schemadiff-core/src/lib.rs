//! Schema comparison orchestration for schemadiff.
//!
//! This crate drives an external comparison engine (a bundled `pgdiff`
//! binary) once per schema object type, and assembles the per-type diffs
//! into a single report whose layout follows the requested type order.
//!
//! # Security Guarantees
//! - Passwords are held in zeroizing containers and never logged
//! - Engine diagnostics are scrubbed of passwords before logging
//! - The engine is spawned from an argument vector, never through a shell
//!
//! # Architecture
//! - [`engine::ComparisonEngine`] abstracts the external engine
//! - [`engine::EngineResolver`] picks the engine executable per platform
//! - [`DiffOrchestrator`] sequences invocations, enforces timeouts and
//!   cancellation, and builds the [`DiffReport`]

pub mod config;
pub mod engine;
pub mod error;
pub mod logging;
pub mod models;
pub mod orchestrator;
pub mod security;

// Re-export commonly used types
pub use config::{ConnectionTarget, ExecutionMode, OrchestratorConfig};
pub use engine::{
    CommandEngine, ComparisonEngine, EngineOutput, EngineResolver, FixedEngineResolver,
    PlatformEngineResolver,
};
pub use error::{Result, SchemaDiffError};
pub use logging::{LogFormat, init_logging};
pub use models::{DiffReport, DiffSegment, RunFailure, SchemaObjectType};
pub use orchestrator::DiffOrchestrator;
pub use security::parse_connection_url;
pub use tokio_util::sync::CancellationToken;
