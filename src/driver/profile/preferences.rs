//! Firefox preference serialization for `user.js`.
//!
//! Firefox reads preferences as JavaScript calls:
//!
//! ```javascript
//! user_pref("preference.name", value);
//! ```

// ============================================================================
// PreferenceValue
// ============================================================================

/// A preference value in `user.js`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PreferenceValue {
    /// Boolean value.
    Bool(bool),

    /// Integer value.
    Int(i32),

    /// String value.
    String(String),
}

impl PreferenceValue {
    /// Formats the value as a JavaScript literal.
    #[must_use]
    pub fn to_js_string(&self) -> String {
        match self {
            Self::Bool(b) => b.to_string(),
            Self::Int(i) => i.to_string(),
            Self::String(s) => format!("\"{}\"", escape_js_string(s)),
        }
    }
}

impl From<bool> for PreferenceValue {
    #[inline]
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i32> for PreferenceValue {
    #[inline]
    fn from(value: i32) -> Self {
        Self::Int(value)
    }
}

impl From<&str> for PreferenceValue {
    #[inline]
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

// ============================================================================
// FirefoxPreference
// ============================================================================

/// A named Firefox preference.
#[derive(Debug, Clone)]
pub struct FirefoxPreference {
    /// Preference name (e.g., "remote.active-protocols").
    pub key: String,

    /// Preference value.
    pub value: PreferenceValue,

    /// Optional comment written above the preference.
    pub comment: Option<String>,
}

impl FirefoxPreference {
    /// Creates a new preference.
    #[must_use]
    pub fn new(key: impl Into<String>, value: impl Into<PreferenceValue>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            comment: None,
        }
    }

    /// Adds a comment.
    #[must_use]
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Generates the `user_pref("key", value);` line, preceded by the
    /// comment when one is set.
    #[must_use]
    pub fn to_user_pref_line(&self) -> String {
        let line = format!(
            "user_pref(\"{}\", {});",
            escape_js_string(&self.key),
            self.value.to_js_string()
        );

        match &self.comment {
            Some(comment) => format!("// {comment}\n{line}"),
            None => line,
        }
    }
}

// ============================================================================
// Private Helpers
// ============================================================================

/// Escapes special characters for JavaScript strings.
fn escape_js_string(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
        .replace('\r', "\\r")
        .replace('\t', "\\t")
}

// ============================================================================
// Tests
// ============================================================================
