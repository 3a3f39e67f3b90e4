//! Core Tab struct and the engine implementation.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::browser::Window;
use crate::engine::{Page, PageEventHandler};
use crate::error::Result;
use crate::identifiers::ContextId;
use crate::protocol::Command;

// ============================================================================
// Types
// ============================================================================

/// Internal shared state for a tab.
pub(crate) struct TabInner {
    /// Browsing context ID.
    pub context: ContextId,
    /// Owning window.
    pub window: Window,
}

// ============================================================================
// Tab
// ============================================================================

/// A handle to a browser tab.
#[derive(Clone)]
pub struct Tab {
    pub(crate) inner: Arc<TabInner>,
}

impl fmt::Debug for Tab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tab")
            .field("context", &self.inner.context)
            .finish_non_exhaustive()
    }
}

impl Tab {
    /// Creates a new tab handle.
    pub(crate) fn new(context: ContextId, window: Window) -> Self {
        Self {
            inner: Arc::new(TabInner { context, window }),
        }
    }

    /// Returns the browsing context ID.
    #[inline]
    #[must_use]
    pub fn context(&self) -> &ContextId {
        &self.inner.context
    }
}

// ============================================================================
// Tab - Internal
// ============================================================================

impl Tab {
    /// Sends a command and returns its result value.
    pub(crate) async fn send_command(&self, command: Command) -> Result<Value> {
        self.inner.window.send_command(command).await
    }

    /// Sends a command with a custom timeout.
    pub(crate) async fn send_command_with_timeout(
        &self,
        command: Command,
        timeout: Duration,
    ) -> Result<Value> {
        self.inner
            .window
            .send_command_with_timeout(command, timeout)
            .await
    }
}

// ============================================================================
// Tab - Page
// ============================================================================

#[async_trait]
impl Page for Tab {
    fn id(&self) -> String {
        self.inner.context.to_string()
    }

    async fn goto(&self, url: &str) -> Result<()> {
        Tab::goto(self, url).await
    }

    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<()> {
        Tab::wait_for_selector(self, selector, timeout).await
    }

    async fn evaluate(&self, expression: &str) -> Result<Value> {
        Tab::evaluate(self, expression).await
    }

    async fn evaluate_within(&self, expression: &str, timeout: Duration) -> Result<Value> {
        Tab::evaluate_within(self, expression, timeout).await
    }

    async fn type_text(&self, selector: &str, text: &str, delay: Duration) -> Result<()> {
        Tab::type_text(self, selector, text, delay).await
    }

    async fn dismiss_dialog(&self) -> Result<()> {
        Tab::dismiss_dialog(self).await
    }

    async fn set_viewport(&self, width: u32, height: u32) -> Result<()> {
        Tab::set_viewport(self, width, height).await
    }

    async fn print_pdf(&self) -> Result<Vec<u8>> {
        Tab::print_pdf(self).await
    }

    async fn close(&self) -> Result<()> {
        Tab::close(self).await
    }

    fn set_event_handler(&self, handler: PageEventHandler) {
        self.inner
            .window
            .set_route(self.inner.context.clone(), handler);
    }

    fn clear_event_handler(&self) {
        self.inner.window.clear_route(&self.inner.context);
    }
}

// ============================================================================
// Tests
// ============================================================================
