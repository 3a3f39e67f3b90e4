//! Firefox profile management.
//!
//! - Temporary profiles deleted on drop
//! - Existing profile directories kept after exit
//! - Automation preferences written to `user.js`
//!
//! ```no_run
//! use tabrelay::driver::Profile;
//!
//! # fn example() -> tabrelay::Result<()> {
//! let profile = Profile::new_temp()?;
//! profile.write_prefs(&Profile::default_prefs())?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::debug;

use crate::error::{Error, Result};

// ============================================================================
// Submodules
// ============================================================================

/// Firefox preference definitions and serialization.
pub mod preferences;

// ============================================================================
// Re-exports
// ============================================================================

pub use preferences::{FirefoxPreference, PreferenceValue};

// ============================================================================
// Constants
// ============================================================================

/// Header comment for `user.js` file.
const USER_JS_HEADER: &str = "// tabrelay user.js\n\
                              // Generated preferences for automation\n\n";

// ============================================================================
// Profile
// ============================================================================

/// A Firefox profile directory.
pub struct Profile {
    /// Keeps the temporary directory alive.
    _temp_dir: Option<TempDir>,

    /// Path to the profile directory.
    path: PathBuf,
}

impl Profile {
    /// Creates a temporary profile, deleted when dropped.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Profile`] if the directory cannot be created.
    pub fn new_temp() -> Result<Self> {
        let temp_dir = TempDir::with_prefix("tabrelay-")
            .map_err(|e| Error::profile(format!("Failed to create temp profile: {e}")))?;

        let path = temp_dir.path().to_path_buf();
        debug!(path = %path.display(), "Created temporary profile");

        Ok(Self {
            _temp_dir: Some(temp_dir),
            path,
        })
    }

    /// Uses an existing profile directory, creating it if missing.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Profile`] if the directory cannot be created.
    pub fn from_path(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        if !path.exists() {
            fs::create_dir_all(&path).map_err(|e| {
                Error::profile(format!(
                    "Failed to create profile directory at {}: {e}",
                    path.display()
                ))
            })?;
            debug!(path = %path.display(), "Created profile directory");
        }

        Ok(Self {
            _temp_dir: None,
            path,
        })
    }

    /// Returns the path to the profile directory.
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns `true` if the profile is deleted on drop.
    #[inline]
    #[must_use]
    pub fn is_temporary(&self) -> bool {
        self._temp_dir.is_some()
    }
}

// ============================================================================
// Profile - Preferences
// ============================================================================

impl Profile {
    /// Writes preferences to `user.js`, replacing the file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Profile`] if the file cannot be written.
    pub fn write_prefs(&self, prefs: &[FirefoxPreference]) -> Result<()> {
        let file_path = self.path.join("user.js");

        let mut content = String::from(USER_JS_HEADER);
        for pref in prefs {
            content.push_str(&pref.to_user_pref_line());
            content.push('\n');
        }

        fs::write(&file_path, content).map_err(|e| {
            Error::profile(format!(
                "Failed to write user.js at {}: {e}",
                file_path.display()
            ))
        })?;

        debug!(
            path = %file_path.display(),
            pref_count = prefs.len(),
            "Wrote preferences to user.js"
        );

        Ok(())
    }

    /// Returns the preferences used for every automated window.
    #[must_use]
    pub fn default_prefs() -> Vec<FirefoxPreference> {
        use preferences::FirefoxPreference as Pref;

        vec![
            // Remote agent
            Pref::new("remote.active-protocols", 1).with_comment("WebDriver BiDi only"),
            Pref::new("remote.prefs.recommended", true),
            Pref::new("dom.disable_beforeunload", true),
            // Startup
            Pref::new("browser.startup.page", 0).with_comment("Blank start page"),
            Pref::new("browser.startup.homepage", "about:blank"),
            Pref::new("browser.shell.checkDefaultBrowser", false),
            Pref::new("browser.sessionstore.resume_from_crash", false),
            Pref::new("startup.homepage_welcome_url", ""),
            Pref::new("startup.homepage_override_url", ""),
            Pref::new("browser.aboutwelcome.enabled", false),
            // Tabs
            Pref::new("browser.tabs.warnOnClose", false),
            Pref::new("browser.tabs.warnOnCloseOtherTabs", false),
            Pref::new("browser.tabs.closeWindowWithLastTab", false)
                .with_comment("Keep the window when the last tab is captured"),
            Pref::new("browser.warnOnQuit", false),
            // Telemetry and updates
            Pref::new("toolkit.telemetry.enabled", false),
            Pref::new("toolkit.telemetry.unified", false),
            Pref::new("datareporting.policy.dataSubmissionEnabled", false),
            Pref::new("datareporting.healthreport.uploadEnabled", false),
            Pref::new("app.update.auto", false),
            Pref::new("app.normandy.enabled", false),
            Pref::new("extensions.update.enabled", false),
        ]
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temp_profile_is_removed_on_drop() {
        let profile = Profile::new_temp().expect("temp profile");
        let path = profile.path().to_path_buf();
        assert!(path.exists());
        assert!(profile.is_temporary());

        drop(profile);
        assert!(!path.exists());
    }

    #[test]
    fn test_from_path_creates_directory() {
        let dir = TempDir::new().expect("temp dir");
        let target = dir.path().join("nested").join("profile");

        let profile = Profile::from_path(&target).expect("profile");
        assert!(target.is_dir());
        assert!(!profile.is_temporary());
    }

    #[test]
    fn test_write_prefs() {
        let profile = Profile::new_temp().expect("temp profile");
        profile
            .write_prefs(&Profile::default_prefs())
            .expect("write prefs");

        let content = fs::read_to_string(profile.path().join("user.js")).expect("read");
        assert!(content.starts_with("// tabrelay user.js"));
        assert!(content.contains("user_pref(\"remote.active-protocols\", 1);"));
        assert!(content.contains("user_pref(\"browser.tabs.closeWindowWithLastTab\", false);"));
    }
}
