//! Browser window management.
//!
//! Each [`Window`] owns:
//! - One Firefox process
//! - One WebDriver BiDi session over one WebSocket connection
//! - One profile directory (temporary or persistent)
//!
//! Events arrive for every browsing context on the shared connection and
//! are routed to at most one handler per context. Contexts without a
//! handler (including child frames) are dropped.
//!
//! ```no_run
//! use tabrelay::Driver;
//!
//! # async fn example() -> tabrelay::Result<()> {
//! let driver = Driver::builder().build()?;
//! let window = driver.window().window_size(1280, 900).spawn().await?;
//!
//! let tab = window.new_tab().await?;
//! tab.goto("https://example.com").await?;
//!
//! window.close().await?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde_json::{Value, json};
use tokio::process::Child;
use tokio::time::timeout;
use tracing::{debug, info, trace};

use crate::driver::{Driver, FirefoxOptions, Profile};
use crate::engine::{Browser, Page, PageEvent, PageEventHandler};
use crate::error::{Error, Result};
use crate::identifiers::{ContextId, SessionId};
use crate::protocol::{
    BrowserCommand, BrowsingContextCommand, Command, Event, ParsedEvent, Request,
    SUBSCRIBED_EVENTS, SessionCommand,
};
use crate::transport::{Connection, DEFAULT_COMMAND_TIMEOUT};

use super::Tab;

// ============================================================================
// Constants
// ============================================================================

/// How long `browser.close` may take before the process is killed.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

// ============================================================================
// ProcessGuard
// ============================================================================

/// Guards a child process and ensures it is killed when dropped.
struct ProcessGuard {
    /// The child process handle.
    child: Option<Child>,
    /// Process ID for logging.
    pid: u32,
}

impl ProcessGuard {
    fn new(child: Child) -> Self {
        let pid = child.id().unwrap_or(0);
        Self {
            child: Some(child),
            pid,
        }
    }

    /// Takes the child out of the guard for an orderly shutdown.
    fn take(&mut self) -> Option<Child> {
        self.child.take()
    }
}

impl Drop for ProcessGuard {
    fn drop(&mut self) {
        if let Some(mut child) = self.child.take()
            && let Err(e) = child.start_kill()
        {
            debug!(pid = self.pid, error = %e, "Failed to send kill signal in Drop");
        }
    }
}

/// Waits for Firefox to exit on its own, killing it after [`CLOSE_TIMEOUT`].
async fn terminate(pid: u32, mut child: Child) {
    match timeout(CLOSE_TIMEOUT, child.wait()).await {
        Ok(Ok(status)) => debug!(pid, %status, "Firefox exited"),
        Ok(Err(e)) => debug!(pid, error = %e, "Failed to wait for process"),
        Err(_) => {
            debug!(pid, "Firefox still running, killing");
            if let Err(e) = child.kill().await {
                debug!(pid, error = %e, "Failed to kill process");
            }
        }
    }
    info!(pid, "Process terminated");
}

// ============================================================================
// Types
// ============================================================================

/// Per-context event handlers.
type Routes = FxHashMap<ContextId, PageEventHandler>;

/// Internal shared state for a window.
pub(crate) struct WindowInner {
    /// BiDi session ID.
    session_id: SessionId,
    /// Firefox process.
    process: Mutex<ProcessGuard>,
    /// WebSocket connection.
    connection: Connection,
    /// Profile directory; deleted on drop when temporary.
    _profile: Profile,
    /// Event handler per browsing context.
    routes: Arc<Mutex<Routes>>,
}

// ============================================================================
// Window
// ============================================================================

/// A handle to a Firefox instance.
///
/// When the last handle is dropped, the process is killed.
#[derive(Clone)]
pub struct Window {
    /// Shared inner state.
    pub(crate) inner: Arc<WindowInner>,
}

impl fmt::Debug for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Window")
            .field("session_id", &self.inner.session_id)
            .field("pid", &self.pid())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Window - Constructor
// ============================================================================

impl Window {
    /// Starts a BiDi session on `connection` and subscribes to tab events.
    pub(crate) async fn open(
        connection: Connection,
        process: Child,
        profile: Profile,
    ) -> Result<Self> {
        let process = ProcessGuard::new(process);
        let routes: Arc<Mutex<Routes>> = Arc::new(Mutex::new(Routes::default()));

        let routes_clone = Arc::clone(&routes);
        connection.set_event_handler(Box::new(move |event: Event| {
            dispatch_event(&routes_clone, event);
        }));

        let capabilities = json!({
            "alwaysMatch": {
                "unhandledPromptBehavior": { "default": "ignore" }
            }
        });
        let result = send(
            &connection,
            Command::Session(SessionCommand::New { capabilities }),
            DEFAULT_COMMAND_TIMEOUT,
        )
        .await?;

        let session_id = result
            .get("sessionId")
            .and_then(Value::as_str)
            .map(SessionId::new)
            .ok_or_else(|| Error::protocol("Expected sessionId in session.new response"))?;

        send(
            &connection,
            Command::Session(SessionCommand::Subscribe {
                events: SUBSCRIBED_EVENTS.iter().map(|e| (*e).to_string()).collect(),
            }),
            DEFAULT_COMMAND_TIMEOUT,
        )
        .await?;

        debug!(session_id = %session_id, pid = process.pid, "BiDi session started");

        Ok(Self {
            inner: Arc::new(WindowInner {
                session_id,
                process: Mutex::new(process),
                connection,
                _profile: profile,
                routes,
            }),
        })
    }
}

// ============================================================================
// Window - Accessors
// ============================================================================

impl Window {
    /// Returns the BiDi session ID.
    #[inline]
    #[must_use]
    pub fn session_id(&self) -> &SessionId {
        &self.inner.session_id
    }

    /// Returns the Firefox process ID.
    #[inline]
    #[must_use]
    pub fn pid(&self) -> u32 {
        self.inner.process.lock().pid
    }

    /// Returns the number of tabs with an event handler installed.
    #[inline]
    #[must_use]
    pub fn routed_tab_count(&self) -> usize {
        self.inner.routes.lock().len()
    }
}

// ============================================================================
// Window - Tabs
// ============================================================================

impl Window {
    /// Opens a new blank tab.
    ///
    /// # Errors
    ///
    /// Returns an error if Firefox refuses to create the tab.
    pub async fn new_tab(&self) -> Result<Tab> {
        let result = self
            .send_command(Command::BrowsingContext(BrowsingContextCommand::Create {
                kind: "tab".to_string(),
            }))
            .await?;

        let context = result
            .get("context")
            .and_then(Value::as_str)
            .map(ContextId::new)
            .ok_or_else(|| Error::protocol("Expected context in browsingContext.create response"))?;

        debug!(session_id = %self.inner.session_id, context = %context, "New tab created");
        Ok(Tab::new(context, self.clone()))
    }

    /// Closes the browser and terminates the process.
    ///
    /// # Errors
    ///
    /// Never fails; shutdown problems are logged.
    pub async fn close(&self) -> Result<()> {
        debug!(session_id = %self.inner.session_id, "Closing window");

        self.inner.routes.lock().clear();

        if !self.inner.connection.is_closed()
            && let Err(e) = send(
                &self.inner.connection,
                Command::Browser(BrowserCommand::Close {}),
                CLOSE_TIMEOUT,
            )
            .await
        {
            debug!(error = %e, "browser.close failed");
        }
        self.inner.connection.shutdown();

        let (pid, child) = {
            let mut guard = self.inner.process.lock();
            (guard.pid, guard.take())
        };
        if let Some(child) = child {
            terminate(pid, child).await;
        }

        info!(session_id = %self.inner.session_id, "Window closed");
        Ok(())
    }
}

// ============================================================================
// Window - Internal
// ============================================================================

impl Window {
    /// Sends a command and returns its result value.
    pub(crate) async fn send_command(&self, command: Command) -> Result<Value> {
        send(&self.inner.connection, command, DEFAULT_COMMAND_TIMEOUT).await
    }

    /// Sends a command with a custom timeout.
    pub(crate) async fn send_command_with_timeout(
        &self,
        command: Command,
        request_timeout: Duration,
    ) -> Result<Value> {
        send(&self.inner.connection, command, request_timeout).await
    }

    /// Installs the handler for `context`, replacing any previous one.
    pub(crate) fn set_route(&self, context: ContextId, handler: PageEventHandler) {
        self.inner.routes.lock().insert(context, handler);
    }

    /// Removes the handler for `context`.
    pub(crate) fn clear_route(&self, context: &ContextId) {
        self.inner.routes.lock().remove(context);
    }
}

/// Sends `command` on `connection` and unwraps the BiDi result.
async fn send(connection: &Connection, command: Command, request_timeout: Duration) -> Result<Value> {
    let request = Request::new(command);
    connection
        .send_with_timeout(request, request_timeout)
        .await?
        .into_result()
}

/// Routes a BiDi event to the handler registered for its context.
fn dispatch_event(routes: &Mutex<Routes>, event: Event) {
    let (context, page_event) = match event.parse() {
        ParsedEvent::UserPromptOpened {
            context, message, ..
        } => (context, PageEvent::Dialog { message }),

        ParsedEvent::DomContentLoaded { context, url } => (context, PageEvent::Navigated { url }),

        ParsedEvent::ContextDestroyed { context } => {
            let handler = routes.lock().remove(&context);
            if let Some(handler) = handler {
                handler(PageEvent::Closed);
            }
            return;
        }

        ParsedEvent::Load { context, url } => {
            trace!(context = %context, url = %url, "Load");
            return;
        }

        ParsedEvent::Unknown { method, .. } => {
            trace!(method = %method, "Unhandled event");
            return;
        }
    };

    let routes = routes.lock();
    match routes.get(&context) {
        Some(handler) => handler(page_event),
        None => trace!(context = %context, event = %page_event, "Event for untracked context"),
    }
}

// ============================================================================
// Window - Browser
// ============================================================================

#[async_trait]
impl Browser for Window {
    async fn open_page(&self) -> Result<Arc<dyn Page>> {
        let tab = self.new_tab().await?;
        Ok(Arc::new(tab))
    }

    async fn shutdown(&self) -> Result<()> {
        self.close().await
    }
}

// ============================================================================
// WindowBuilder
// ============================================================================

/// Builder for launching a Firefox window.
pub struct WindowBuilder<'a> {
    /// Reference to the driver.
    driver: &'a Driver,
    /// Firefox launch options.
    options: FirefoxOptions,
    /// Optional custom profile path.
    profile: Option<PathBuf>,
}

impl<'a> WindowBuilder<'a> {
    /// Creates a new window builder.
    pub(crate) fn new(driver: &'a Driver) -> Self {
        Self {
            driver,
            options: FirefoxOptions::new(),
            profile: None,
        }
    }

    /// Enables headless mode.
    #[must_use]
    pub fn headless(mut self) -> Self {
        self.options = self.options.with_headless();
        self
    }

    /// Sets the window size.
    #[must_use]
    pub fn window_size(mut self, width: u32, height: u32) -> Self {
        self.options = self.options.with_window_size(width, height);
        self
    }

    /// Uses a persistent profile directory instead of a temporary one.
    #[must_use]
    pub fn profile(mut self, path: impl Into<PathBuf>) -> Self {
        self.profile = Some(path.into());
        self
    }

    /// Launches Firefox.
    ///
    /// # Errors
    ///
    /// Returns an error if the process fails to start or the BiDi session
    /// cannot be established.
    pub async fn spawn(self) -> Result<Window> {
        self.driver.spawn_window(self.options, self.profile).await
    }
}

// ============================================================================
// Tests
// ============================================================================
