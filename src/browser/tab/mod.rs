//! Browser tab automation.
//!
//! Each [`Tab`] is one top-level browsing context.
//!
//! # Module Structure
//!
//! | Module | Description |
//! |--------|-------------|
//! | `core` | Tab struct, event handler, [`Page`](crate::engine::Page) impl |
//! | `navigation` | Navigation and closing |
//! | `script` | JavaScript evaluation and selector waits |
//! | `input` | Keyboard input |
//! | `dialog` | Modal prompts |
//! | `print` | Viewport and PDF rendering |

// ============================================================================
// Submodules
// ============================================================================

mod core;
mod dialog;
mod input;
mod navigation;
mod print;
mod script;

// ============================================================================
// Re-exports
// ============================================================================

pub use core::Tab;
