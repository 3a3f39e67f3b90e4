//! Operator command channel.
//!
//! Reads operator input one line at a time. `refresh` (any case, surrounding
//! whitespace ignored) re-reads the work items and reconciles the pool;
//! every other line is ignored.

use std::fmt;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};
use tracing::{debug, error, info};

use crate::error::Result;

use super::Controller;

// ============================================================================
// OperatorCommand
// ============================================================================

/// A recognized operator command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorCommand {
    /// Re-read the work items and reconcile.
    Refresh,
}

impl OperatorCommand {
    /// Parses one input line.
    #[must_use]
    pub fn parse(line: &str) -> Option<Self> {
        line.trim()
            .eq_ignore_ascii_case("refresh")
            .then_some(Self::Refresh)
    }
}

impl fmt::Display for OperatorCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Refresh => f.write_str("refresh"),
        }
    }
}

// ============================================================================
// CommandChannel
// ============================================================================

/// Line-oriented operator input.
pub struct CommandChannel<R> {
    lines: Lines<R>,
}

impl<R: AsyncBufRead + Unpin> CommandChannel<R> {
    /// Wraps a buffered reader.
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
        }
    }

    /// Returns the next recognized command, or `None` at end of input.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`](crate::Error::Io) if reading fails.
    pub async fn next_command(&mut self) -> Result<Option<OperatorCommand>> {
        while let Some(line) = self.lines.next_line().await? {
            match OperatorCommand::parse(&line) {
                Some(command) => return Ok(Some(command)),
                None => debug!(input = %line.trim(), "Ignored operator input"),
            }
        }
        Ok(None)
    }

    /// Serves commands until input ends.
    ///
    /// A failed refresh is logged and the loop keeps going.
    pub async fn run(&mut self, controller: &mut Controller) -> Result<()> {
        while let Some(command) = self.next_command().await? {
            info!(%command, "Operator command");
            match command {
                OperatorCommand::Refresh => {
                    if let Err(e) = controller.refresh().await {
                        error!(error = %e, "Refresh failed, tabs left unchanged");
                    }
                }
            }
        }
        info!("Operator input closed");
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
