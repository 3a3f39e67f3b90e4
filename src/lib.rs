//! tabrelay - one Firefox tab per reference, human-solved CAPTCHA, PDF
//! acknowledgments.
//!
//! Keeps a pool of browser tabs aligned with a mutable list of reference
//! identifiers. Each tab loads the target form, types its reference with
//! the CAPTCHA and submit controls locked, and then waits for a human to
//! solve the CAPTCHA. When the service navigates to its acknowledgment
//! page, the page is printed to PDF and the tab is closed.
//!
//! # Architecture
//!
//! ```text
//!  stdin ──► CommandChannel ──► Controller ──► WorkItemSource
//!                                   │
//!                                   ▼
//!                               TabPool ──► TabSession × N ──► CaptureSink
//!                                   │             ▲
//!                                   ▼             │ PageEvent
//!                               Browser ─────► Page
//! ```
//!
//! The controller talks to the browser only through the [`engine`] traits.
//! The shipped engine drives Firefox over WebDriver BiDi:
//!
//! - Each [`Window`] owns: Firefox process + WebSocket connection + event loop
//! - Protocol uses `module.methodName` format
//! - Events are routed per browsing context to one replaceable handler
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use tabrelay::{
//!     Browser, CaptureSettings, Controller, ControllerSettings, Driver, FileSource, PdfArchive,
//!     Result,
//! };
//!
//! # async fn example() -> Result<()> {
//! let source = Arc::new(FileSource::new("data/references.csv"));
//! let sink = Arc::new(PdfArchive::new("output", CaptureSettings::default()));
//!
//! let controller = Controller::start(source, sink, ControllerSettings::default(), || async {
//!     let driver = Driver::builder().build()?;
//!     let window = driver.window().window_size(1280, 900).spawn().await?;
//!     Ok::<_, tabrelay::Error>(Arc::new(window) as Arc<dyn Browser>)
//! })
//! .await?;
//!
//! controller.shutdown().await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`controller`] | Sessions, pool reconciliation, operator commands |
//! | [`source`] | Work items and the file source |
//! | [`capture`] | PDF capture sink |
//! | [`engine`] | Browser/page traits the controller depends on |
//! | [`browser`] | Firefox [`Window`] and [`Tab`] |
//! | [`driver`] | Firefox launch and profiles |
//! | [`config`] | TOML configuration |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`protocol`] | WebDriver BiDi message types (internal) |
//! | [`transport`] | WebSocket connection (internal) |

// ============================================================================
// Modules
// ============================================================================

/// Process wiring used by the binary.
pub mod app;

/// Firefox window and tab implementations of the engine traits.
pub mod browser;

/// Acknowledgment capture.
pub mod capture;

/// Configuration file and command-line overrides.
pub mod config;

/// Tab lifecycle and reconciliation.
pub mod controller;

/// Driver factory and launch options.
///
/// Use [`Driver::builder()`] to create a configured driver instance.
pub mod driver;

/// Browser engine seam.
pub mod engine;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers for protocol entities.
pub mod identifiers;

/// WebDriver BiDi message types.
pub mod protocol;

/// Work items and their sources.
pub mod source;

/// WebSocket transport layer.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Browser types
pub use browser::{Tab, Window, WindowBuilder};

// Capture types
pub use capture::{CaptureSettings, CaptureSink, PdfArchive};

// Configuration
pub use config::AppConfig;

// Controller types
pub use controller::{
    CommandChannel, Controller, ControllerSettings, OperatorCommand, ReconcileSummary,
    SessionSnapshot, SessionState,
};

// Driver types
pub use driver::{Driver, DriverBuilder, FirefoxOptions, Profile};

// Engine traits
pub use engine::{Browser, Page, PageEvent};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::{CommandId, ContextId, ListenerEpoch, SessionId};

// Work items
pub use source::{FileSource, WorkItem, WorkItemSource};
