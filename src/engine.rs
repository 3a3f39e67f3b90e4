//! Browser engine seam.
//!
//! The controller drives tabs only through [`Browser`] and [`Page`]. The
//! shipped implementation is [`Window`](crate::browser::Window) and
//! [`Tab`](crate::browser::Tab) over WebDriver BiDi.
//!
//! | Trait | Responsibility |
//! |-------|----------------|
//! | [`Browser`] | Open tabs, shut the browser down |
//! | [`Page`] | Navigate, query, type, print, report [`PageEvent`]s |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

// ============================================================================
// PageEvent
// ============================================================================

/// Something that happened in a tab without the controller asking for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageEvent {
    /// A modal dialog opened.
    Dialog {
        /// Text shown by the dialog.
        message: String,
    },
    /// The top-level document changed.
    Navigated {
        /// URL of the new document.
        url: String,
    },
    /// The tab was destroyed.
    Closed,
}

impl fmt::Display for PageEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dialog { message } => write!(f, "dialog({message})"),
            Self::Navigated { url } => write!(f, "navigated({url})"),
            Self::Closed => f.write_str("closed"),
        }
    }
}

/// Receives [`PageEvent`]s for one tab.
///
/// Called on the connection's event loop; must not block.
pub type PageEventHandler = Box<dyn Fn(PageEvent) + Send + Sync>;

// ============================================================================
// Page
// ============================================================================

/// One browser tab.
#[async_trait]
pub trait Page: Send + Sync {
    /// Short identifier used in log lines.
    fn id(&self) -> String;

    /// Navigates the tab and waits until the document is interactive.
    async fn goto(&self, url: &str) -> Result<()>;

    /// Waits until `selector` matches an element.
    ///
    /// Fails with a timeout error once `timeout` elapses.
    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<()>;

    /// Evaluates an expression, resolving promises, and returns its value.
    async fn evaluate(&self, expression: &str) -> Result<Value>;

    /// Like [`Page::evaluate`], but lets the promise run for up to
    /// `timeout` and fails with a timeout error after that.
    async fn evaluate_within(&self, expression: &str, timeout: Duration) -> Result<Value>;

    /// Focuses `selector` and types `text` one key at a time.
    async fn type_text(&self, selector: &str, text: &str, delay: Duration) -> Result<()>;

    /// Dismisses the open modal dialog.
    async fn dismiss_dialog(&self) -> Result<()>;

    /// Resizes the viewport in CSS pixels.
    async fn set_viewport(&self, width: u32, height: u32) -> Result<()>;

    /// Renders the document as an A4 portrait PDF.
    async fn print_pdf(&self) -> Result<Vec<u8>>;

    /// Closes the tab.
    async fn close(&self) -> Result<()>;

    /// Installs the event handler, replacing any previous one.
    fn set_event_handler(&self, handler: PageEventHandler);

    /// Removes the event handler.
    fn clear_event_handler(&self);
}

// ============================================================================
// Browser
// ============================================================================

/// A running browser.
#[async_trait]
pub trait Browser: Send + Sync {
    /// Opens a new blank tab.
    async fn open_page(&self) -> Result<Arc<dyn Page>>;

    /// Closes every tab and terminates the browser.
    async fn shutdown(&self) -> Result<()>;
}

// ============================================================================
// Script Helpers
// ============================================================================

/// Quotes `s` as a JavaScript string literal.
#[must_use]
pub fn json_string(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| format!("\"{s}\""))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_event_display() {
        let event = PageEvent::Dialog {
            message: "Incorrect Captcha".to_string(),
        };
        assert_eq!(event.to_string(), "dialog(Incorrect Captcha)");
        assert_eq!(PageEvent::Closed.to_string(), "closed");
    }

    #[test]
    fn test_json_string_escapes_quotes() {
        assert_eq!(
            json_string(r#"input[type="submit"]"#),
            r#""input[type=\"submit\"]""#
        );
    }

    #[test]
    fn test_traits_are_object_safe() {
        fn assert_page(_: Option<Arc<dyn Page>>) {}
        fn assert_browser(_: Option<Arc<dyn Browser>>) {}
        assert_page(None);
        assert_browser(None);
    }
}
