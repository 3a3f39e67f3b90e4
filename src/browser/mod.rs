//! Firefox over WebDriver BiDi.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Window`] | Firefox process, BiDi session and event routing |
//! | [`Tab`] | One browsing context |
//!
//! Both implement the [`engine`](crate::engine) traits the controller
//! drives.

// ============================================================================
// Submodules
// ============================================================================

/// Browser tab automation.
pub mod tab;

/// Browser window management.
pub mod window;

// ============================================================================
// Re-exports
// ============================================================================

pub use tab::Tab;
pub use window::{Window, WindowBuilder};
