//! Keyboard input.

use std::time::Duration;

use tracing::debug;

use crate::engine::json_string;
use crate::error::{Error, Result};
use crate::protocol::{Command, InputCommand, KeySource};
use crate::transport::DEFAULT_COMMAND_TIMEOUT;

use super::Tab;

impl Tab {
    /// Focuses the element matching `selector` and types `text` with
    /// `delay` between keystrokes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ScriptError`] if no element matches.
    pub async fn type_text(&self, selector: &str, text: &str, delay: Duration) -> Result<()> {
        debug!(
            context = %self.inner.context,
            selector = %selector,
            chars = text.chars().count(),
            "Typing"
        );

        let focus = format!(
            "(() => {{ const el = document.querySelector({}); if (!el) return false; el.focus(); return true; }})()",
            json_string(selector)
        );
        if self.evaluate(&focus).await?.as_bool() != Some(true) {
            return Err(Error::script_error(format!("No element matches {selector}")));
        }

        let delay_ms = delay.as_millis() as u64;
        let typing_time = Duration::from_millis(delay_ms * text.chars().count() as u64);

        self.send_command_with_timeout(
            Command::Input(InputCommand::PerformActions {
                context: self.inner.context.clone(),
                actions: vec![KeySource::typing(text, delay_ms)],
            }),
            DEFAULT_COMMAND_TIMEOUT + typing_time,
        )
        .await?;

        self.send_command(Command::Input(InputCommand::ReleaseActions {
            context: self.inner.context.clone(),
        }))
        .await?;

        Ok(())
    }
}
