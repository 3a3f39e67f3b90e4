//! WebDriver BiDi message types.
//!
//! This module defines the message format spoken with Firefox's remote
//! agent.
//!
//! # Protocol Overview
//!
//! | Message Type | Direction | Purpose |
//! |--------------|-----------|---------|
//! | `Request` | Local → Firefox | Command request |
//! | `Response` | Firefox → Local | Command response |
//! | `Event` | Firefox → Local | Browser notification |
//!
//! # Command Naming
//!
//! Commands follow `module.methodName` format:
//!
//! - `browsingContext.navigate`
//! - `script.evaluate`
//! - `input.performActions`
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `command` | Command definitions by domain |
//! | `event` | Event types |
//! | `request` | Request and Response types |

// ============================================================================
// Submodules
// ============================================================================

/// Command definitions organized by module.
pub mod command;

/// Event message types.
pub mod event;

/// Request and Response message types.
pub mod request;

// ============================================================================
// Re-exports
// ============================================================================

pub use command::{
    BrowserCommand, BrowsingContextCommand, Command, InputCommand, KeyAction, KeySource,
    PrintPage, ReadinessState, ScriptCommand, ScriptTarget, SessionCommand, Viewport,
};
pub use event::{Event, ParsedEvent, SUBSCRIBED_EVENTS};
pub use request::{Request, Response, ResponseType};
