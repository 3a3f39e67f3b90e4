//! WebSocket transport layer.
//!
//! This module handles communication with Firefox's remote agent over a
//! WebDriver BiDi WebSocket.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐                              ┌─────────────────┐
//! │  Window (Rust)  │         WebSocket            │  Firefox        │
//! │                 │◄────────────────────────────►│  Remote Agent   │
//! │  Connection     │   ws://127.0.0.1:PORT/session│  (BiDi server)  │
//! └─────────────────┘                              └─────────────────┘
//! ```
//!
//! # Connection Lifecycle
//!
//! 1. Launch Firefox with `--remote-debugging-port`
//! 2. Read the announced WebSocket URL from stderr
//! 3. `connect_async` to `<url>/session`
//! 4. `Connection` - Send commands, receive responses/events
//! 5. `Connection::shutdown` - Close the socket
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `connection` | WebSocket connection and event loop |

// ============================================================================
// Submodules
// ============================================================================

/// WebSocket connection and event loop.
pub mod connection;

// ============================================================================
// Re-exports
// ============================================================================

pub use connection::{Connection, DEFAULT_COMMAND_TIMEOUT, EventHandler};
