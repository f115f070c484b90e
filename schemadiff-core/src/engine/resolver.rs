//! Engine executable resolution.
//!
//! Maps the executing platform to one of the bundled engine binaries. The
//! resolver is a trait so callers can point at an explicit executable, and
//! tests never need a real binary on disk.

use crate::error::SchemaDiffError;
use std::path::{Path, PathBuf};

/// Locates the comparison engine executable.
pub trait EngineResolver: Send + Sync {
    /// Returns the path of the engine executable.
    ///
    /// # Errors
    /// Returns `UnsupportedPlatform` when no engine exists for the platform.
    fn resolve(&self) -> crate::Result<PathBuf>;
}

/// Relative location of the bundled engine for a platform identifier as
/// reported by `std::env::consts::OS`.
pub fn bundled_engine_path(platform: &str) -> Option<&'static str> {
    match platform {
        "linux" => Some("linux/pgdiff"),
        "macos" => Some("macos/pgdiff"),
        "windows" => Some("win/pgdiff.exe"),
        _ => None,
    }
}

/// Resolves the bundled engine under a resources directory.
///
/// # Example
/// ```rust
/// use schemadiff_core::engine::{EngineResolver, PlatformEngineResolver};
/// use std::path::Path;
///
/// let resolver = PlatformEngineResolver::for_platform("/opt/schemadiff/resources", "linux");
/// assert_eq!(
///     resolver.resolve()?,
///     Path::new("/opt/schemadiff/resources/linux/pgdiff")
/// );
/// # Ok::<(), schemadiff_core::SchemaDiffError>(())
/// ```
#[derive(Debug, Clone)]
pub struct PlatformEngineResolver {
    resources_dir: PathBuf,
    platform: String,
}

impl PlatformEngineResolver {
    /// Resolver for the current platform.
    pub fn new(resources_dir: impl Into<PathBuf>) -> Self {
        Self::for_platform(resources_dir, std::env::consts::OS)
    }

    /// Resolver for an explicit platform identifier.
    pub fn for_platform(resources_dir: impl Into<PathBuf>, platform: impl Into<String>) -> Self {
        Self {
            resources_dir: resources_dir.into(),
            platform: platform.into(),
        }
    }

    /// Resolver rooted at `resources/` next to the running executable.
    ///
    /// # Errors
    /// Returns an I/O error if the executable path cannot be determined.
    pub fn beside_current_exe() -> crate::Result<Self> {
        let exe = std::env::current_exe().map_err(|e| SchemaDiffError::Io {
            context: "Failed to locate current executable".to_string(),
            source: e,
        })?;
        let dir = exe.parent().unwrap_or_else(|| Path::new("."));
        Ok(Self::new(dir.join("resources")))
    }

    /// Resources directory this resolver looks in.
    pub fn resources_dir(&self) -> &Path {
        &self.resources_dir
    }
}

impl EngineResolver for PlatformEngineResolver {
    fn resolve(&self) -> crate::Result<PathBuf> {
        bundled_engine_path(&self.platform)
            .map(|relative| self.resources_dir.join(relative))
            .ok_or_else(|| SchemaDiffError::unsupported_platform(&self.platform))
    }
}

/// Resolver returning a caller-supplied executable.
#[derive(Debug, Clone)]
pub struct FixedEngineResolver {
    path: PathBuf,
}

impl FixedEngineResolver {
    /// Creates a resolver that always returns `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl EngineResolver for FixedEngineResolver {
    fn resolve(&self) -> crate::Result<PathBuf> {
        Ok(self.path.clone())
    }
}
