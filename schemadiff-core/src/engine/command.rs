//! Process-backed comparison engine.
//!
//! Spawns the engine executable once per object type with an argument
//! vector (never a shell string), captures both output channels, and maps the
//! exit status into an [`EngineOutput`].

use super::{ComparisonEngine, EngineOutput, EngineResolver};
use crate::{
    Result, config::ConnectionTarget, error::SchemaDiffError, models::SchemaObjectType,
};
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tracing::{debug, trace, warn};

/// Status reported when the engine was terminated by a signal.
const SIGNAL_STATUS: i32 = -1;

/// Flag letters for one side of the comparison, in argument order:
/// user, password, host, port, database, options, schema.
struct SideFlags {
    user: &'static str,
    password: &'static str,
    host: &'static str,
    port: &'static str,
    database: &'static str,
    options: &'static str,
    schema: &'static str,
}

const SOURCE_FLAGS: SideFlags = SideFlags {
    user: "-u",
    password: "-w",
    host: "-h",
    port: "-p",
    database: "-d",
    options: "-o",
    schema: "-s",
};

const TARGET_FLAGS: SideFlags = SideFlags {
    user: "-U",
    password: "-W",
    host: "-H",
    port: "-P",
    database: "-D",
    options: "-O",
    schema: "-S",
};

fn push_side(args: &mut Vec<OsString>, flags: &SideFlags, target: &ConnectionTarget) {
    args.push(flags.user.into());
    args.push(target.user().into());
    args.push(flags.password.into());
    args.push(target.credentials().expose_password().into());
    args.push(flags.host.into());
    args.push(target.host().into());
    args.push(flags.port.into());
    args.push(target.port().to_string().into());
    args.push(flags.database.into());
    args.push(target.database().into());
    args.push(flags.options.into());
    args.push(format!("sslmode={}", target.ssl_mode()).into());
    if let Some(schema) = target.schema() {
        args.push(flags.schema.into());
        args.push(schema.into());
    }
}

/// Builds the engine argument vector for one object type.
///
/// Lower-case flags describe the source, upper-case flags the target, and the
/// object type token comes last. The schema flag is omitted for a side with
/// no schema restriction.
///
/// # Security
/// The returned vector contains both passwords. Never log it; use
/// [`CommandEngine::describe`] instead.
pub fn build_engine_args(
    source: &ConnectionTarget,
    target: &ConnectionTarget,
    object_type: SchemaObjectType,
) -> Vec<OsString> {
    let mut args = Vec::with_capacity(29);
    push_side(&mut args, &SOURCE_FLAGS, source);
    push_side(&mut args, &TARGET_FLAGS, target);
    args.push(object_type.as_str().into());
    args
}

/// Decodes one engine output channel.
///
/// Valid UTF-8 passes through unchanged. Invalid sequences are replaced with
/// U+FFFD and logged at warn level.
fn decode_stream(bytes: Vec<u8>, object_type: SchemaObjectType, channel: &str) -> String {
    match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => {
            let valid_up_to = e.utf8_error().valid_up_to();
            warn!(
                object_type = %object_type,
                "Engine {} is not valid UTF-8 (first bad byte at offset {}); invalid bytes replaced",
                channel,
                valid_up_to
            );
            String::from_utf8_lossy(e.as_bytes()).into_owned()
        }
    }
}

/// Comparison engine backed by an external executable.
#[derive(Debug, Clone)]
pub struct CommandEngine {
    program: PathBuf,
}

impl CommandEngine {
    /// Creates an engine that runs `program` without checking that it exists.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Resolves the engine executable and checks that it is a file.
    ///
    /// # Errors
    /// Propagates resolver errors unchanged (including
    /// `UnsupportedPlatform`) and returns a configuration error when the
    /// resolved path is not a file.
    pub fn from_resolver(resolver: &dyn EngineResolver) -> Result<Self> {
        let program = resolver.resolve()?;
        if !program.is_file() {
            return Err(SchemaDiffError::configuration(format!(
                "Comparison engine not found at {}",
                program.display()
            )));
        }
        debug!("Resolved comparison engine at {}", program.display());
        Ok(Self { program })
    }

    /// Path of the engine executable.
    pub fn program(&self) -> &Path {
        &self.program
    }
}

#[async_trait]
impl ComparisonEngine for CommandEngine {
    async fn compare(
        &self,
        source: &ConnectionTarget,
        target: &ConnectionTarget,
        object_type: SchemaObjectType,
    ) -> Result<EngineOutput> {
        trace!(
            "Spawning {} for {} ({} -> {})",
            self.program.display(),
            object_type,
            source,
            target
        );

        // kill_on_drop ties the child's lifetime to this future so timeouts
        // and cancellation in the orchestrator terminate the process.
        let output = tokio::process::Command::new(&self.program)
            .args(build_engine_args(source, target, object_type))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| SchemaDiffError::EngineUnavailable {
                path: self.program.clone(),
                source: e,
            })?;

        Ok(EngineOutput {
            stdout: decode_stream(output.stdout, object_type, "stdout"),
            stderr: decode_stream(output.stderr, object_type, "stderr"),
            status: output.status.code().unwrap_or(SIGNAL_STATUS),
        })
    }

    fn describe(&self) -> String {
        self.program.display().to_string()
    }
}
