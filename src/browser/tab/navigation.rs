//! Tab navigation methods.

use tracing::debug;

use crate::error::Result;
use crate::protocol::{BrowsingContextCommand, Command, ReadinessState};

use super::Tab;

// ============================================================================
// Tab - Navigation
// ============================================================================

impl Tab {
    /// Navigates to a URL and waits until the document is interactive.
    ///
    /// # Errors
    ///
    /// Returns an error if navigation fails or times out.
    pub async fn goto(&self, url: &str) -> Result<()> {
        debug!(url = %url, context = %self.inner.context, "Navigating");

        let command = Command::BrowsingContext(BrowsingContextCommand::Navigate {
            context: self.inner.context.clone(),
            url: url.to_string(),
            wait: ReadinessState::Interactive,
        });

        self.send_command(command).await?;
        Ok(())
    }

    /// Closes this tab.
    ///
    /// The event handler is removed first so the closure is not reported
    /// back as an external close.
    pub async fn close(&self) -> Result<()> {
        debug!(context = %self.inner.context, "Closing tab");
        self.inner.window.clear_route(&self.inner.context);

        let command = Command::BrowsingContext(BrowsingContextCommand::Close {
            context: self.inner.context.clone(),
        });
        self.send_command(command).await?;
        Ok(())
    }
}
