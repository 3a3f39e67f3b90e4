//! Event message types.
//!
//! Events are notifications Firefox sends for subscribed browser activity.
//!
//! # Event Types
//!
//! | Event | Meaning |
//! |-------|---------|
//! | `browsingContext.userPromptOpened` | `alert`/`confirm`/`prompt` shown |
//! | `browsingContext.domContentLoaded` | A document became interactive |
//! | `browsingContext.load` | A document finished loading |
//! | `browsingContext.contextDestroyed` | A tab or frame went away |

// ============================================================================
// Imports
// ============================================================================

use serde::Deserialize;
use serde_json::Value;

use crate::identifiers::ContextId;

// ============================================================================
// Constants
// ============================================================================

/// Events the window subscribes to at session start.
pub const SUBSCRIBED_EVENTS: [&str; 4] = [
    "browsingContext.userPromptOpened",
    "browsingContext.domContentLoaded",
    "browsingContext.load",
    "browsingContext.contextDestroyed",
];

// ============================================================================
// Event
// ============================================================================

/// An event notification from Firefox.
///
/// # Format
///
/// ```json
/// {
///   "type": "event",
///   "method": "module.eventName",
///   "params": { ... }
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct Event {
    /// Event name in `module.eventName` format.
    pub method: String,

    /// Event-specific data.
    #[serde(default)]
    pub params: Value,
}

impl Event {
    /// Returns the module name from the method.
    #[inline]
    #[must_use]
    pub fn module(&self) -> &str {
        self.method.split('.').next().unwrap_or_default()
    }

    /// Returns the event name from the method.
    #[inline]
    #[must_use]
    pub fn event_name(&self) -> &str {
        self.method.split('.').nth(1).unwrap_or_default()
    }

    /// Parses the event into a typed variant.
    #[must_use]
    pub fn parse(&self) -> ParsedEvent {
        match self.method.as_str() {
            "browsingContext.userPromptOpened" => ParsedEvent::UserPromptOpened {
                context: self.get_context(),
                prompt_type: self.get_string_or("type", "alert"),
                message: self.get_string("message"),
            },

            "browsingContext.domContentLoaded" => ParsedEvent::DomContentLoaded {
                context: self.get_context(),
                url: self.get_string("url"),
            },

            "browsingContext.load" => ParsedEvent::Load {
                context: self.get_context(),
                url: self.get_string("url"),
            },

            "browsingContext.contextDestroyed" => ParsedEvent::ContextDestroyed {
                context: self.get_context(),
            },

            _ => ParsedEvent::Unknown {
                method: self.method.clone(),
                params: self.params.clone(),
            },
        }
    }

    /// Gets the `context` param.
    #[inline]
    fn get_context(&self) -> ContextId {
        ContextId::new(self.get_string("context"))
    }

    /// Gets a string from params.
    #[inline]
    fn get_string(&self, key: &str) -> String {
        self.params
            .get(key)
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string()
    }

    /// Gets a string from params with default.
    #[inline]
    fn get_string_or(&self, key: &str, default: &str) -> String {
        self.params
            .get(key)
            .and_then(|v| v.as_str())
            .unwrap_or(default)
            .to_string()
    }
}

// ============================================================================
// ParsedEvent
// ============================================================================

/// Parsed event types for type-safe handling.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedEvent {
    /// A modal prompt opened.
    UserPromptOpened {
        /// Tab showing the prompt.
        context: ContextId,
        /// `alert`, `confirm`, `prompt` or `beforeunload`.
        prompt_type: String,
        /// Prompt text.
        message: String,
    },

    /// DOM content loaded.
    DomContentLoaded {
        /// Tab or frame context.
        context: ContextId,
        /// Document URL.
        url: String,
    },

    /// Page load complete.
    Load {
        /// Tab or frame context.
        context: ContextId,
        /// Document URL.
        url: String,
    },

    /// A context was destroyed.
    ContextDestroyed {
        /// Destroyed context.
        context: ContextId,
    },

    /// Unknown event type.
    Unknown {
        /// Event method.
        method: String,
        /// Event params.
        params: Value,
    },
}

// ============================================================================
// Tests
// ============================================================================
