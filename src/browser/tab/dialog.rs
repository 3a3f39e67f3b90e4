//! Modal prompt handling.

use tracing::debug;

use crate::error::Result;
use crate::protocol::{BrowsingContextCommand, Command};

use super::Tab;

impl Tab {
    /// Dismisses the prompt currently open in this tab.
    ///
    /// # Errors
    ///
    /// Returns a protocol error (`no such alert`) if no prompt is open.
    pub async fn dismiss_dialog(&self) -> Result<()> {
        debug!(context = %self.inner.context, "Dismissing prompt");

        let command = Command::BrowsingContext(BrowsingContextCommand::HandleUserPrompt {
            context: self.inner.context.clone(),
            accept: false,
        });
        self.send_command(command).await?;
        Ok(())
    }
}
