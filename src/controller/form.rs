//! Target-service form description.
//!
//! Knows the entry page, the acknowledgment URL pattern, the selectors the
//! population sequence touches and how an incorrect-CAPTCHA dialog reads.

// ============================================================================
// Imports
// ============================================================================

use regex::Regex;
use url::Url;

use crate::engine::json_string;
use crate::error::{Error, Result};

// ============================================================================
// Defaults
// ============================================================================

/// Entry page of the online application form.
pub const DEFAULT_ENTRY_URL: &str = "https://www.sngpl.com.pk/onlineapp/pages/index.jsp";

/// Matches the page the service shows after accepting a submission.
pub const DEFAULT_ACKNOWLEDGMENT_PATTERN: &str = r"acknowledge\.jsp";

/// Reference number input.
pub const DEFAULT_REFERENCE_FIELD: &str = "#refNo";

/// CAPTCHA text input.
pub const DEFAULT_CAPTCHA_FIELD: &str = "#kaptchafield1";

/// Submit button.
pub const DEFAULT_SUBMIT_CONTROL: &str = "input[type='submit']";

/// Substring of the dialog the service shows for a wrong CAPTCHA.
pub const DEFAULT_INCORRECT_MARKER: &str = "incorrect";

// ============================================================================
// FormProfile
// ============================================================================

/// Where the form lives and how to drive it.
#[derive(Debug, Clone)]
pub struct FormProfile {
    entry_url: Url,
    acknowledgment: Regex,
    reference_field: String,
    captcha_field: String,
    submit_control: String,
    incorrect_marker: String,
}

impl FormProfile {
    /// Creates a profile with the default selectors.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `entry_url` is not an absolute URL or
    /// `acknowledgment_pattern` is not a valid regex.
    pub fn new(entry_url: &str, acknowledgment_pattern: &str) -> Result<Self> {
        let entry_url = Url::parse(entry_url)
            .map_err(|e| Error::config(format!("invalid entry URL {entry_url:?}: {e}")))?;
        let acknowledgment = Regex::new(acknowledgment_pattern).map_err(|e| {
            Error::config(format!(
                "invalid acknowledgment pattern {acknowledgment_pattern:?}: {e}"
            ))
        })?;

        Ok(Self {
            entry_url,
            acknowledgment,
            reference_field: DEFAULT_REFERENCE_FIELD.to_string(),
            captcha_field: DEFAULT_CAPTCHA_FIELD.to_string(),
            submit_control: DEFAULT_SUBMIT_CONTROL.to_string(),
            incorrect_marker: DEFAULT_INCORRECT_MARKER.to_string(),
        })
    }

    /// Sets the reference, CAPTCHA and submit selectors.
    #[must_use]
    pub fn with_selectors(
        mut self,
        reference_field: impl Into<String>,
        captcha_field: impl Into<String>,
        submit_control: impl Into<String>,
    ) -> Self {
        self.reference_field = reference_field.into();
        self.captcha_field = captcha_field.into();
        self.submit_control = submit_control.into();
        self
    }

    /// Sets the incorrect-CAPTCHA dialog marker.
    #[must_use]
    pub fn with_incorrect_marker(mut self, marker: impl Into<String>) -> Self {
        self.incorrect_marker = marker.into();
        self
    }

    /// Returns the entry page URL.
    #[inline]
    #[must_use]
    pub fn entry_url(&self) -> &str {
        self.entry_url.as_str()
    }

    /// Returns the reference field selector.
    #[inline]
    #[must_use]
    pub fn reference_field(&self) -> &str {
        &self.reference_field
    }

    // ========================================================================
    // Classification
    // ========================================================================

    /// Returns `true` if `url` is the entry page, ignoring query and
    /// fragment.
    #[must_use]
    pub fn is_entry(&self, url: &str) -> bool {
        let Ok(url) = Url::parse(url) else {
            return false;
        };
        url.scheme() == self.entry_url.scheme()
            && url.host_str() == self.entry_url.host_str()
            && url.port_or_known_default() == self.entry_url.port_or_known_default()
            && url.path() == self.entry_url.path()
    }

    /// Returns `true` if `url` is the acknowledgment page.
    #[inline]
    #[must_use]
    pub fn is_acknowledgment(&self, url: &str) -> bool {
        self.acknowledgment.is_match(url)
    }

    /// Returns `true` if a dialog message reports a wrong CAPTCHA.
    #[must_use]
    pub fn is_incorrect_captcha(&self, message: &str) -> bool {
        message
            .to_lowercase()
            .contains(&self.incorrect_marker.to_lowercase())
    }

    // ========================================================================
    // Scripts
    // ========================================================================

    /// Disables or enables the CAPTCHA input and the submit control.
    #[must_use]
    pub fn controls_script(&self, disabled: bool) -> String {
        format!(
            r#"(() => {{
                for (const selector of [{captcha}, {submit}]) {{
                    const el = document.querySelector(selector);
                    if (el) el.disabled = {disabled};
                }}
                return true;
            }})()"#,
            captcha = json_string(&self.captcha_field),
            submit = json_string(&self.submit_control),
        )
    }

    /// Empties the reference field.
    #[must_use]
    pub fn clear_field_script(&self) -> String {
        format!(
            r#"(() => {{
                const el = document.querySelector({field});
                if (!el) return false;
                el.value = "";
                return true;
            }})()"#,
            field = json_string(&self.reference_field),
        )
    }
}

impl Default for FormProfile {
    fn default() -> Self {
        Self {
            entry_url: Url::parse(DEFAULT_ENTRY_URL).expect("invalid default entry URL"),
            acknowledgment: Regex::new(DEFAULT_ACKNOWLEDGMENT_PATTERN)
                .expect("invalid default acknowledgment regex"),
            reference_field: DEFAULT_REFERENCE_FIELD.to_string(),
            captcha_field: DEFAULT_CAPTCHA_FIELD.to_string(),
            submit_control: DEFAULT_SUBMIT_CONTROL.to_string(),
            incorrect_marker: DEFAULT_INCORRECT_MARKER.to_string(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
