//! Firefox launcher and window factory.
//!
//! Launch sequence for one window:
//!
//! 1. Prepare the profile and write `user.js`
//! 2. Start Firefox with `--remote-debugging-port` on a free local port
//! 3. Read `WebDriver BiDi listening on ws://...` from stderr
//! 4. Connect to `<url>/session` and open a BiDi session

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::net::{Ipv4Addr, TcpListener};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::time::timeout;
use tokio_tungstenite::connect_async;
use tracing::{debug, info, trace};

use crate::browser::{Window, WindowBuilder};
use crate::error::{Error, Result};
use crate::transport::Connection;

use super::builder::DriverBuilder;
use super::options::FirefoxOptions;
use super::profile::Profile;

// ============================================================================
// Constants
// ============================================================================

/// How long Firefox may take to announce its BiDi endpoint.
const STARTUP_TIMEOUT: Duration = Duration::from_secs(30);

/// Prefix of the stderr line carrying the BiDi WebSocket URL.
const BIDI_ANNOUNCEMENT: &str = "WebDriver BiDi listening on ";

// ============================================================================
// Types
// ============================================================================

/// Internal shared state for the driver.
pub(crate) struct DriverInner {
    /// Path to the Firefox binary executable.
    pub binary: PathBuf,
}

// ============================================================================
// Driver
// ============================================================================

/// Launches Firefox windows.
///
/// ```no_run
/// use tabrelay::Driver;
///
/// # async fn example() -> tabrelay::Result<()> {
/// let driver = Driver::builder().binary("/usr/bin/firefox").build()?;
/// let window = driver.window().window_size(1280, 900).spawn().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Driver {
    /// Shared inner state.
    pub(crate) inner: Arc<DriverInner>,
}

impl fmt::Debug for Driver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Driver")
            .field("binary", &self.inner.binary)
            .finish()
    }
}

// ============================================================================
// Driver - Public API
// ============================================================================

impl Driver {
    /// Creates a configuration builder for the driver.
    #[inline]
    #[must_use]
    pub fn builder() -> DriverBuilder {
        DriverBuilder::new()
    }

    /// Creates a window builder for launching Firefox.
    #[inline]
    #[must_use]
    pub fn window(&self) -> WindowBuilder<'_> {
        WindowBuilder::new(self)
    }

    /// Returns the resolved Firefox binary.
    #[inline]
    #[must_use]
    pub fn binary(&self) -> &Path {
        &self.inner.binary
    }
}

// ============================================================================
// Driver - Internal API
// ============================================================================

impl Driver {
    /// Creates a new driver instance.
    pub(crate) fn new(binary: PathBuf) -> Self {
        Self {
            inner: Arc::new(DriverInner { binary }),
        }
    }

    /// Launches Firefox and opens a BiDi session on it.
    pub(crate) async fn spawn_window(
        &self,
        options: FirefoxOptions,
        custom_profile: Option<PathBuf>,
    ) -> Result<Window> {
        options.validate().map_err(Error::config)?;

        let profile = self.prepare_profile(custom_profile)?;
        let prefs = Profile::default_prefs();
        profile.write_prefs(&prefs)?;

        let port = free_local_port()?;
        let mut child = self.spawn_firefox_process(&profile, &options, port)?;
        let pid = child.id();
        info!(pid, port, "Firefox process spawned");

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| Error::connection("Firefox stderr was not captured"))?;
        let ws_url = wait_for_bidi_url(stderr, STARTUP_TIMEOUT).await?;
        debug!(url = %ws_url, "BiDi endpoint announced");

        let session_url = format!("{}/session", ws_url.trim_end_matches('/'));
        let (ws_stream, _) = connect_async(session_url.as_str())
            .await
            .map_err(|e| Error::connection(format!("{session_url}: {e}")))?;

        let connection = Connection::new(ws_stream);
        let window = Window::open(connection, child, profile).await?;

        info!(pid, session_id = %window.session_id(), "Window ready");
        Ok(window)
    }

    /// Prepares a Firefox profile for the window.
    fn prepare_profile(&self, custom_profile: Option<PathBuf>) -> Result<Profile> {
        match custom_profile {
            Some(path) => {
                debug!(path = %path.display(), "Using custom profile");
                Profile::from_path(path)
            }
            None => Profile::new_temp(),
        }
    }

    /// Spawns the Firefox process with the given configuration.
    fn spawn_firefox_process(
        &self,
        profile: &Profile,
        options: &FirefoxOptions,
        port: u16,
    ) -> Result<Child> {
        let mut cmd = Command::new(&self.inner.binary);

        cmd.arg("--remote-debugging-port")
            .arg(port.to_string())
            .arg("--profile")
            .arg(profile.path())
            .arg("--no-remote")
            .arg("--new-instance");

        cmd.args(options.to_args());

        cmd.stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        cmd.spawn().map_err(Error::process_launch_failed)
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Asks the OS for an unused local port.
fn free_local_port() -> Result<u16> {
    let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0))?;
    Ok(listener.local_addr()?.port())
}

/// Extracts the WebSocket URL from a Firefox stderr line.
fn parse_bidi_url(line: &str) -> Option<String> {
    let (_, rest) = line.split_once(BIDI_ANNOUNCEMENT)?;
    let url = rest.split_whitespace().next()?;
    url.starts_with("ws://").then(|| url.to_string())
}

/// Reads `stderr` until the BiDi URL appears, then keeps draining it in
/// the background so Firefox never blocks on a full pipe.
async fn wait_for_bidi_url<R>(stderr: R, wait: Duration) -> Result<String>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let mut lines = BufReader::new(stderr).lines();

    let found = timeout(wait, async {
        while let Some(line) = lines.next_line().await? {
            trace!(target: "firefox", "{line}");
            if let Some(url) = parse_bidi_url(&line) {
                return Ok(Some(url));
            }
        }
        Ok::<_, Error>(None)
    })
    .await
    .map_err(|_| Error::connection_timeout(wait.as_millis() as u64))??;

    let url = found.ok_or_else(|| {
        Error::connection("Firefox exited before announcing its WebDriver BiDi endpoint")
    })?;

    tokio::spawn(async move {
        while let Ok(Some(line)) = lines.next_line().await {
            trace!(target: "firefox", "{line}");
        }
    });

    Ok(url)
}

// ============================================================================
// Tests
// ============================================================================
