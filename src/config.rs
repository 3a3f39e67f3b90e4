//! Application configuration.
//!
//! Loaded from an optional TOML file; every field has a default, so an
//! empty file (or none at all) is a valid configuration. Command-line flags
//! are applied on top with [`AppConfig::apply`].
//!
//! ```toml
//! [browser]
//! headless = false
//! window_size = { width = 1280, height = 900 }
//!
//! [timing]
//! typing_delay_ms = 100
//! open_stagger_ms = 700
//!
//! [source]
//! path = "./data/references.csv"
//!
//! [capture]
//! output_dir = "./output"
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::path::{Path, PathBuf};
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::capture::CaptureSettings;
use crate::controller::form::{
    DEFAULT_ACKNOWLEDGMENT_PATTERN, DEFAULT_CAPTCHA_FIELD, DEFAULT_ENTRY_URL,
    DEFAULT_INCORRECT_MARKER, DEFAULT_REFERENCE_FIELD, DEFAULT_SUBMIT_CONTROL,
};
use crate::controller::{ControllerSettings, FormProfile, SessionTiming};
use crate::error::{Error, Result};
use crate::source::{DEFAULT_COLUMNS, FileSource};

// ============================================================================
// AppConfig
// ============================================================================

/// Root of the configuration tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub browser: BrowserConfig,
    pub service: ServiceConfig,
    pub timing: TimingConfig,
    pub source: SourceConfig,
    pub capture: CaptureConfig,
}

/// Width and height in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// `[browser]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Firefox binary; `firefox` on `PATH` when unset.
    pub binary: Option<PathBuf>,
    pub headless: bool,
    pub window_size: Dimensions,
    /// Persistent profile directory; a temporary one when unset.
    pub profile: Option<PathBuf>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            binary: None,
            headless: false,
            window_size: Dimensions {
                width: 1280,
                height: 900,
            },
            profile: None,
        }
    }
}

/// `[service]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub entry_url: String,
    /// Regex matched against navigated URLs.
    pub acknowledgment_pattern: String,
    pub reference_field: String,
    pub captcha_field: String,
    pub submit_control: String,
    /// Case-insensitive substring of the wrong-CAPTCHA dialog.
    pub incorrect_marker: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            entry_url: DEFAULT_ENTRY_URL.to_string(),
            acknowledgment_pattern: DEFAULT_ACKNOWLEDGMENT_PATTERN.to_string(),
            reference_field: DEFAULT_REFERENCE_FIELD.to_string(),
            captcha_field: DEFAULT_CAPTCHA_FIELD.to_string(),
            submit_control: DEFAULT_SUBMIT_CONTROL.to_string(),
            incorrect_marker: DEFAULT_INCORRECT_MARKER.to_string(),
        }
    }
}

/// `[timing]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub typing_delay_ms: u64,
    pub field_timeout_ms: u64,
    pub reload_field_timeout_ms: u64,
    pub open_stagger_ms: u64,
    pub populate_attempts: u32,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            typing_delay_ms: 100,
            field_timeout_ms: 10_000,
            reload_field_timeout_ms: 15_000,
            open_stagger_ms: 700,
            populate_attempts: 2,
        }
    }
}

/// `[source]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub path: PathBuf,
    /// Header names tried for the identifier column, in order.
    pub columns: Vec<String>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./data/references.csv"),
            columns: DEFAULT_COLUMNS.iter().map(|c| (*c).to_string()).collect(),
        }
    }
}

/// `[capture]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    pub output_dir: PathBuf,
    pub page_timeout_ms: u64,
    pub viewport: Dimensions,
    pub zoom: f64,
    /// Text of the acknowledgment row holding the customer name.
    pub label_row: String,
    pub label_table: String,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        let settings = CaptureSettings::default();
        Self {
            output_dir: PathBuf::from("./output"),
            page_timeout_ms: settings.page_timeout.as_millis() as u64,
            viewport: Dimensions {
                width: settings.viewport.0,
                height: settings.viewport.1,
            },
            zoom: settings.zoom,
            label_row: settings.label_row,
            label_table: settings.table_selector,
        }
    }
}

// ============================================================================
// Overrides
// ============================================================================

/// Command-line values that take precedence over the file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    pub source: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub firefox: Option<PathBuf>,
    pub headless: bool,
}

// ============================================================================
// Loading & Validation
// ============================================================================

impl AppConfig {
    /// Loads `path`, or the defaults when `path` is `None`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the file cannot be read or parsed, or if
    /// the result fails [`validate`](Self::validate).
    pub async fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => {
                let content = tokio::fs::read_to_string(path).await.map_err(|e| {
                    Error::config(format!("cannot read {}: {e}", path.display()))
                })?;
                Self::parse(&content)?
            }
            None => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Parses TOML text without validating it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] on malformed TOML or unknown value types.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::config(e.to_string()))
    }

    /// Applies command-line overrides.
    #[must_use]
    pub fn apply(mut self, overrides: Overrides) -> Self {
        if let Some(source) = overrides.source {
            self.source.path = source;
        }
        if let Some(output) = overrides.output {
            self.capture.output_dir = output;
        }
        if let Some(firefox) = overrides.firefox {
            self.browser.binary = Some(firefox);
        }
        self.browser.headless |= overrides.headless;
        self
    }

    /// Checks values the type system cannot.
    ///
    /// # Errors
    ///
    /// Returns one [`Error::Config`] listing every problem found.
    pub fn validate(&self) -> Result<()> {
        let mut errors: Vec<String> = Vec::new();

        let service = &self.service;
        if Url::parse(&service.entry_url).is_err() {
            errors.push(format!("service.entry_url {:?} is not a URL", service.entry_url));
        }
        if let Err(e) = Regex::new(&service.acknowledgment_pattern) {
            errors.push(format!("service.acknowledgment_pattern is invalid: {e}"));
        }
        for (name, value) in [
            ("service.reference_field", &service.reference_field),
            ("service.captcha_field", &service.captcha_field),
            ("service.submit_control", &service.submit_control),
            ("service.incorrect_marker", &service.incorrect_marker),
        ] {
            if value.trim().is_empty() {
                errors.push(format!("{name} must not be empty"));
            }
        }

        let timing = &self.timing;
        for (name, value) in [
            ("timing.field_timeout_ms", timing.field_timeout_ms),
            ("timing.reload_field_timeout_ms", timing.reload_field_timeout_ms),
            ("timing.open_stagger_ms", timing.open_stagger_ms),
            ("capture.page_timeout_ms", self.capture.page_timeout_ms),
        ] {
            if value == 0 {
                errors.push(format!("{name} must be greater than 0"));
            }
        }
        if timing.populate_attempts == 0 {
            errors.push("timing.populate_attempts must be greater than 0".to_string());
        }

        if self.source.columns.iter().all(|c| c.trim().is_empty()) {
            errors.push("source.columns must name at least one column".to_string());
        }

        let capture = &self.capture;
        for (name, size) in [
            ("capture.viewport", capture.viewport),
            ("browser.window_size", self.browser.window_size),
        ] {
            if size.width == 0 || size.height == 0 {
                errors.push(format!("{name} must be non-zero"));
            }
        }
        if !(capture.zoom > 0.0 && capture.zoom <= 4.0) {
            errors.push("capture.zoom must be in (0, 4]".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(Error::config(errors.join("; ")))
        }
    }

    // ========================================================================
    // Derived Settings
    // ========================================================================

    /// Builds the controller settings.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for an invalid entry URL or pattern.
    pub fn controller_settings(&self) -> Result<ControllerSettings> {
        let service = &self.service;
        let form = FormProfile::new(&service.entry_url, &service.acknowledgment_pattern)?
            .with_selectors(
                &service.reference_field,
                &service.captcha_field,
                &service.submit_control,
            )
            .with_incorrect_marker(&service.incorrect_marker);

        let timing = &self.timing;
        Ok(ControllerSettings {
            form,
            timing: SessionTiming {
                typing_delay: Duration::from_millis(timing.typing_delay_ms),
                field_timeout: Duration::from_millis(timing.field_timeout_ms),
                reload_field_timeout: Duration::from_millis(timing.reload_field_timeout_ms),
                populate_attempts: timing.populate_attempts,
            },
            open_stagger: Duration::from_millis(timing.open_stagger_ms),
        })
    }

    /// Builds the capture settings.
    #[must_use]
    pub fn capture_settings(&self) -> CaptureSettings {
        let capture = &self.capture;
        CaptureSettings {
            page_timeout: Duration::from_millis(capture.page_timeout_ms),
            viewport: (capture.viewport.width, capture.viewport.height),
            zoom: capture.zoom,
            label_row: capture.label_row.clone(),
            table_selector: capture.label_table.clone(),
        }
    }

    /// Builds the work-item source.
    #[must_use]
    pub fn file_source(&self) -> FileSource {
        FileSource::new(&self.source.path).with_columns(self.source.columns.clone())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use tempfile::TempDir;

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        config.validate().expect("defaults valid");
        assert_eq!(config.timing.open_stagger_ms, 700);
        assert_eq!(config.capture.viewport.width, 1200);
        assert_eq!(config.source.columns[0], "Reference No");
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let config = AppConfig::parse(
            r#"
            [browser]
            headless = true
            window_size = { width = 800, height = 600 }

            [timing]
            typing_delay_ms = 50
            "#,
        )
        .expect("parse");

        assert!(config.browser.headless);
        assert_eq!(config.browser.window_size.width, 800);
        assert_eq!(config.timing.typing_delay_ms, 50);
        assert_eq!(config.timing.field_timeout_ms, 10_000);
        assert_eq!(config.service, ServiceConfig::default());
    }

    #[test]
    fn test_malformed_file_is_config_error() {
        let err = AppConfig::parse("[timing]\nopen_stagger_ms = \"soon\"").expect_err("bad type");
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn test_validate_collects_every_problem() {
        let mut config = AppConfig::default();
        config.service.entry_url = "index.jsp".to_string();
        config.service.acknowledgment_pattern = "(".to_string();
        config.service.reference_field = " ".to_string();
        config.timing.open_stagger_ms = 0;
        config.timing.populate_attempts = 0;
        config.capture.viewport.height = 0;

        let message = config.validate().expect_err("invalid").to_string();
        for needle in [
            "entry_url",
            "acknowledgment_pattern",
            "reference_field",
            "open_stagger_ms",
            "populate_attempts",
            "capture.viewport",
        ] {
            assert!(message.contains(needle), "missing {needle} in {message}");
        }
    }

    #[test]
    fn test_overrides_win() {
        let config = AppConfig::default().apply(Overrides {
            source: Some(PathBuf::from("refs.json")),
            output: Some(PathBuf::from("pdfs")),
            firefox: Some(PathBuf::from("/opt/firefox/firefox")),
            headless: true,
        });

        assert_eq!(config.source.path, PathBuf::from("refs.json"));
        assert_eq!(config.capture.output_dir, PathBuf::from("pdfs"));
        assert_eq!(
            config.browser.binary,
            Some(PathBuf::from("/opt/firefox/firefox"))
        );
        assert!(config.browser.headless);
    }

    #[test]
    fn test_headless_flag_does_not_clear_file_value() {
        let mut config = AppConfig::default();
        config.browser.headless = true;
        let config = config.apply(Overrides::default());
        assert!(config.browser.headless);
    }

    #[test]
    fn test_derived_settings() {
        let mut config = AppConfig::default();
        config.timing.reload_field_timeout_ms = 20_000;
        config.service.incorrect_marker = "wrong code".to_string();

        let settings = config.controller_settings().expect("settings");
        assert_eq!(settings.timing.reload_field_timeout, Duration::from_secs(20));
        assert!(settings.form.is_incorrect_captcha("Wrong Code entered"));
        assert_eq!(settings.open_stagger, Duration::from_millis(700));

        assert_eq!(config.capture_settings(), CaptureSettings::default());
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("tabrelay.toml");
        std::fs::write(&path, "[source]\npath = \"refs.txt\"\n").expect("write");

        let config = AppConfig::load(Some(&path)).await.expect("load");
        assert_eq!(config.source.path, PathBuf::from("refs.txt"));
    }

    #[tokio::test]
    async fn test_load_missing_file_fails() {
        let err = AppConfig::load(Some(Path::new("/nonexistent/tabrelay.toml")))
            .await
            .expect_err("missing");
        assert!(matches!(err, Error::Config { .. }));
    }

    #[tokio::test]
    async fn test_load_without_file_uses_defaults() {
        let config = AppConfig::load(None).await.expect("defaults");
        assert_eq!(config, AppConfig::default());
    }
}
