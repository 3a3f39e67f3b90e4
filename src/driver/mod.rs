//! Firefox launcher.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Driver`] | Launches Firefox windows |
//! | [`DriverBuilder`] | Resolves the Firefox binary |
//! | [`FirefoxOptions`] | Command-line options |
//! | [`Profile`] | Profile directory and `user.js` |
//!
//! # Example
//!
//! ```no_run
//! use tabrelay::{Driver, Result};
//!
//! # async fn example() -> Result<()> {
//! let driver = Driver::builder().build()?;
//! let window = driver.window().headless().spawn().await?;
//! let tab = window.new_tab().await?;
//! tab.goto("https://example.com").await?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Submodules
// ============================================================================

/// Fluent builder pattern for driver configuration.
pub mod builder;

/// Core driver implementation.
pub mod core;

/// Firefox command-line options.
pub mod options;

/// Firefox profile management.
pub mod profile;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::DriverBuilder;
pub use core::Driver;
pub use options::FirefoxOptions;
pub use profile::Profile;
