//! Command definitions organized by module.
//!
//! Commands follow the WebDriver BiDi `module.methodName` format.
//!
//! # Command Modules
//!
//! | Module | Commands |
//! |--------|----------|
//! | `session` | `new`, `subscribe`, `end` |
//! | `browser` | `close` |
//! | `browsingContext` | Tabs, navigation, prompts, viewport, print |
//! | `script` | `evaluate` |
//! | `input` | `performActions`, `releaseActions` |
//!
//! Every variant is a struct variant so that `params` is always emitted,
//! even when empty.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::identifiers::ContextId;

// ============================================================================
// Command Wrapper
// ============================================================================

/// All protocol commands organized by module.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Command {
    /// Session module commands.
    Session(SessionCommand),
    /// Browser module commands.
    Browser(BrowserCommand),
    /// BrowsingContext module commands.
    BrowsingContext(BrowsingContextCommand),
    /// Script module commands.
    Script(ScriptCommand),
    /// Input module commands.
    Input(InputCommand),
}

impl Command {
    /// Returns the BiDi method name, for logging.
    #[must_use]
    pub fn method(&self) -> String {
        serde_json::to_value(self)
            .ok()
            .and_then(|v| v.get("method").and_then(Value::as_str).map(str::to_string))
            .unwrap_or_default()
    }
}

// ============================================================================
// Session Commands
// ============================================================================

/// Session module commands.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "method", content = "params")]
pub enum SessionCommand {
    /// Start a BiDi-only session.
    #[serde(rename = "session.new")]
    New {
        /// Requested capabilities.
        capabilities: Value,
    },

    /// Subscribe to events for all contexts.
    #[serde(rename = "session.subscribe")]
    Subscribe {
        /// Event names.
        events: Vec<String>,
    },

    /// End the session.
    #[serde(rename = "session.end")]
    End {},
}

// ============================================================================
// Browser Commands
// ============================================================================

/// Browser module commands.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "method", content = "params")]
pub enum BrowserCommand {
    /// Close every window and end the session.
    #[serde(rename = "browser.close")]
    Close {},
}

// ============================================================================
// BrowsingContext Commands
// ============================================================================

/// Document readiness to wait for after navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadinessState {
    /// Return as soon as navigation is committed.
    None,
    /// Wait for `DOMContentLoaded`.
    Interactive,
    /// Wait for `load`.
    Complete,
}

/// Page dimensions in centimetres for `browsingContext.print`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PrintPage {
    /// Width in cm.
    pub width: f64,
    /// Height in cm.
    pub height: f64,
}

impl PrintPage {
    /// ISO A4.
    pub const A4: Self = Self {
        width: 21.0,
        height: 29.7,
    };
}

/// Viewport dimensions in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    /// Width in px.
    pub width: u32,
    /// Height in px.
    pub height: u32,
}

/// BrowsingContext module commands for tabs and navigation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "method", content = "params")]
pub enum BrowsingContextCommand {
    /// Open a new tab.
    #[serde(rename = "browsingContext.create")]
    Create {
        /// Always `"tab"`.
        #[serde(rename = "type")]
        kind: String,
    },

    /// Close a tab.
    #[serde(rename = "browsingContext.close")]
    Close {
        /// Tab to close.
        context: ContextId,
    },

    /// Navigate a tab to a URL.
    #[serde(rename = "browsingContext.navigate")]
    Navigate {
        /// Tab to navigate.
        context: ContextId,
        /// Destination URL.
        url: String,
        /// When the command returns.
        wait: ReadinessState,
    },

    /// Accept or dismiss an open prompt.
    #[serde(rename = "browsingContext.handleUserPrompt")]
    HandleUserPrompt {
        /// Tab showing the prompt.
        context: ContextId,
        /// `false` dismisses.
        accept: bool,
    },

    /// Resize the tab's viewport.
    #[serde(rename = "browsingContext.setViewport")]
    SetViewport {
        /// Tab to resize.
        context: ContextId,
        /// New viewport.
        viewport: Viewport,
        /// Device pixel ratio.
        #[serde(rename = "devicePixelRatio")]
        device_pixel_ratio: f64,
    },

    /// Render the tab as PDF.
    #[serde(rename = "browsingContext.print")]
    Print {
        /// Tab to print.
        context: ContextId,
        /// Include background graphics.
        background: bool,
        /// `"portrait"` or `"landscape"`.
        orientation: String,
        /// Paper size.
        page: PrintPage,
        /// Shrink content to the page width.
        #[serde(rename = "shrinkToFit")]
        shrink_to_fit: bool,
    },
}

// ============================================================================
// Script Commands
// ============================================================================

/// Realm target for script evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptTarget {
    /// Tab whose main realm runs the script.
    pub context: ContextId,
}

/// Script module commands.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "method", content = "params")]
pub enum ScriptCommand {
    /// Evaluate an expression.
    #[serde(rename = "script.evaluate")]
    Evaluate {
        /// JavaScript expression.
        expression: String,
        /// Where to evaluate.
        target: ScriptTarget,
        /// Resolve returned promises before responding.
        #[serde(rename = "awaitPromise")]
        await_promise: bool,
        /// Always `"none"`; results are serialized by value.
        #[serde(rename = "resultOwnership")]
        result_ownership: String,
    },
}

// ============================================================================
// Input Commands
// ============================================================================

/// One keyboard action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum KeyAction {
    /// Press a key.
    #[serde(rename = "keyDown")]
    Down {
        /// Single grapheme.
        value: String,
    },
    /// Release a key.
    #[serde(rename = "keyUp")]
    Up {
        /// Single grapheme.
        value: String,
    },
    /// Wait between keys.
    #[serde(rename = "pause")]
    Pause {
        /// Milliseconds.
        duration: u64,
    },
}

/// A keyboard input source and its action sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeySource {
    /// Always `"key"`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Input source id.
    pub id: String,
    /// Ordered actions.
    pub actions: Vec<KeyAction>,
}

impl KeySource {
    /// Builds the actions that type `text` with `delay_ms` between keys.
    #[must_use]
    pub fn typing(text: &str, delay_ms: u64) -> Self {
        let mut actions = Vec::with_capacity(text.chars().count() * 3);
        for ch in text.chars() {
            let value = ch.to_string();
            actions.push(KeyAction::Down {
                value: value.clone(),
            });
            actions.push(KeyAction::Up { value });
            if delay_ms > 0 {
                actions.push(KeyAction::Pause { duration: delay_ms });
            }
        }
        Self {
            kind: "key".to_string(),
            id: "keyboard".to_string(),
            actions,
        }
    }
}

/// Input module commands.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "method", content = "params")]
pub enum InputCommand {
    /// Dispatch input actions.
    #[serde(rename = "input.performActions")]
    PerformActions {
        /// Target tab.
        context: ContextId,
        /// Input sources.
        actions: Vec<KeySource>,
    },

    /// Release any pressed keys.
    #[serde(rename = "input.releaseActions")]
    ReleaseActions {
        /// Target tab.
        context: ContextId,
    },
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_navigate_serialization() {
        let command = Command::BrowsingContext(BrowsingContextCommand::Navigate {
            context: ContextId::new("ctx-1"),
            url: "https://example.com/".to_string(),
            wait: ReadinessState::Interactive,
        });

        let json = serde_json::to_value(&command).expect("serialize");
        assert_eq!(json["method"], "browsingContext.navigate");
        assert_eq!(json["params"]["context"], "ctx-1");
        assert_eq!(json["params"]["wait"], "interactive");
    }

    #[test]
    fn test_empty_params_are_emitted() {
        let command = Command::Browser(BrowserCommand::Close {});
        let json = serde_json::to_value(&command).expect("serialize");
        assert_eq!(json["method"], "browser.close");
        assert!(json["params"].is_object());
    }

    #[test]
    fn test_method_name() {
        let command = Command::Session(SessionCommand::Subscribe { events: vec![] });
        assert_eq!(command.method(), "session.subscribe");
    }

    #[test]
    fn test_print_uses_camel_case() {
        let command = Command::BrowsingContext(BrowsingContextCommand::Print {
            context: ContextId::new("ctx"),
            background: true,
            orientation: "portrait".to_string(),
            page: PrintPage::A4,
            shrink_to_fit: true,
        });
        let json = serde_json::to_value(&command).expect("serialize");
        assert_eq!(json["params"]["shrinkToFit"], true);
        assert_eq!(json["params"]["page"]["width"], 21.0);
    }

    #[test]
    fn test_typing_actions() {
        let source = KeySource::typing("ab", 100);
        assert_eq!(source.actions.len(), 6);
        assert_eq!(
            source.actions[0],
            KeyAction::Down {
                value: "a".to_string()
            }
        );
        assert_eq!(source.actions[2], KeyAction::Pause { duration: 100 });

        let json = serde_json::to_value(&source).expect("serialize");
        assert_eq!(json["type"], "key");
        assert_eq!(json["actions"][1]["type"], "keyUp");
    }

    #[test]
    fn test_typing_without_delay_has_no_pauses() {
        let source = KeySource::typing("xyz", 0);
        assert!(
            source
                .actions
                .iter()
                .all(|a| !matches!(a, KeyAction::Pause { .. }))
        );
    }
}
