//! Builder pattern for driver configuration.
//!
//! ```no_run
//! use tabrelay::Driver;
//!
//! # fn example() -> tabrelay::Result<()> {
//! let driver = Driver::builder()
//!     .binary("/usr/bin/firefox")
//!     .build()?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

use super::core::Driver;

// ============================================================================
// Constants
// ============================================================================

/// Binary looked up on `PATH` when none is configured.
const DEFAULT_BINARY: &str = "firefox";

// ============================================================================
// DriverBuilder
// ============================================================================

/// Builder for configuring a [`Driver`] instance.
///
/// Use [`Driver::builder()`] to create a new builder.
#[derive(Debug, Default, Clone)]
pub struct DriverBuilder {
    /// Path or command name of the Firefox binary.
    binary: Option<PathBuf>,
}

impl DriverBuilder {
    /// Creates a new driver builder with no configuration.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the Firefox binary.
    ///
    /// A bare command name (no path separator) is resolved through `PATH`.
    #[inline]
    #[must_use]
    pub fn binary(mut self, path: impl Into<PathBuf>) -> Self {
        self.binary = Some(path.into());
        self
    }

    /// Sets the Firefox binary if `path` is `Some`.
    #[inline]
    #[must_use]
    pub fn binary_opt(mut self, path: Option<PathBuf>) -> Self {
        if path.is_some() {
            self.binary = path;
        }
        self
    }

    /// Builds the driver.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FirefoxNotFound`] if the binary cannot be found.
    pub fn build(self) -> Result<Driver> {
        let requested = self
            .binary
            .unwrap_or_else(|| PathBuf::from(DEFAULT_BINARY));

        let binary = resolve_binary(&requested, env::var_os("PATH"))
            .ok_or_else(|| Error::firefox_not_found(&requested))?;

        Ok(Driver::new(binary))
    }
}

// ============================================================================
// Binary Resolution
// ============================================================================

/// Resolves `requested` to an existing file.
///
/// Paths with more than one component are used as given; bare names are
/// searched in `path_var`.
fn resolve_binary(requested: &Path, path_var: Option<OsString>) -> Option<PathBuf> {
    if requested.components().count() > 1 || requested.is_absolute() {
        return requested.is_file().then(|| requested.to_path_buf());
    }

    if requested.is_file() {
        return Some(requested.to_path_buf());
    }

    let path_var = path_var?;
    env::split_paths(&path_var)
        .map(|dir| dir.join(requested))
        .find(|candidate| candidate.is_file())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::fs;

    use tempfile::TempDir;

    #[test]
    fn test_binary_sets_path() {
        let builder = DriverBuilder::new().binary("/usr/bin/firefox");
        assert_eq!(builder.binary, Some(PathBuf::from("/usr/bin/firefox")));
    }

    #[test]
    fn test_binary_opt_keeps_previous_on_none() {
        let builder = DriverBuilder::new()
            .binary("/opt/firefox/firefox")
            .binary_opt(None);
        assert_eq!(builder.binary, Some(PathBuf::from("/opt/firefox/firefox")));
    }

    #[test]
    fn test_build_fails_with_nonexistent_binary() {
        let err = DriverBuilder::new()
            .binary("/nonexistent/firefox")
            .build()
            .expect_err("missing binary");
        assert!(matches!(err, Error::FirefoxNotFound { .. }));
    }

    #[test]
    fn test_resolve_bare_name_through_path() {
        let dir = TempDir::new().expect("temp dir");
        let binary = dir.path().join("firefox-test-bin");
        fs::write(&binary, b"").expect("write");

        let path_var = env::join_paths([dir.path()]).expect("join");
        let resolved = resolve_binary(Path::new("firefox-test-bin"), Some(path_var));
        assert_eq!(resolved, Some(binary));
    }

    #[test]
    fn test_resolve_explicit_path_does_not_search() {
        let dir = TempDir::new().expect("temp dir");
        let path_var = env::join_paths([dir.path()]).expect("join");
        assert_eq!(
            resolve_binary(Path::new("/nonexistent/firefox"), Some(path_var)),
            None
        );
    }
}
