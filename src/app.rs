//! Process-level wiring.
//!
//! Builds the source, sink and browser from an [`AppConfig`], starts the
//! [`Controller`] and serves operator commands until Ctrl+C.

use std::sync::Arc;

use tokio::io::BufReader;
use tracing::{info, warn};

use crate::capture::{CaptureSink, PdfArchive};
use crate::config::{AppConfig, BrowserConfig};
use crate::controller::{CommandChannel, Controller};
use crate::driver::Driver;
use crate::engine::Browser;
use crate::error::Result;
use crate::source::WorkItemSource;

/// Above this many tabs the operator is reminded about `refresh`.
const REFRESH_HINT_THRESHOLD: usize = 5;

/// Runs until Ctrl+C, then closes every tab and the browser.
///
/// # Errors
///
/// Fails before opening any tab if the output directory cannot be created,
/// the source is unreadable or empty, or Firefox cannot be launched.
pub async fn run(config: AppConfig) -> Result<()> {
    tokio::fs::create_dir_all(&config.capture.output_dir).await?;

    let source: Arc<dyn WorkItemSource> = Arc::new(config.file_source());
    let sink: Arc<dyn CaptureSink> = Arc::new(PdfArchive::new(
        &config.capture.output_dir,
        config.capture_settings(),
    ));
    let settings = config.controller_settings()?;

    info!(
        source = %config.source.path.display(),
        output = %config.capture.output_dir.display(),
        "Starting"
    );
    let mut controller =
        Controller::start(source, sink, settings, || launch(&config.browser)).await?;

    info!("All tabs open. Solve the CAPTCHA and press Submit in each tab; acknowledgment pages are saved automatically");
    if controller.len() > REFRESH_HINT_THRESHOLD {
        info!("Type `refresh` and press Enter after editing the reference list");
    }

    let mut commands = CommandChannel::new(BufReader::new(tokio::io::stdin()));
    let outcome = tokio::select! {
        served = async {
            commands.run(&mut controller).await?;
            info!("Press Ctrl+C to exit");
            std::future::pending::<Result<()>>().await
        } => served,
        signal = tokio::signal::ctrl_c() => {
            info!("Interrupted");
            signal.map_err(Into::into)
        }
    };

    if let Err(e) = &outcome {
        warn!(error = %e, "Stopping after error");
    }
    controller.shutdown().await?;
    outcome
}

/// Launches Firefox with one empty window.
async fn launch(browser: &BrowserConfig) -> Result<Arc<dyn Browser>> {
    let driver = Driver::builder().binary_opt(browser.binary.clone()).build()?;

    let size = browser.window_size;
    let mut window = driver.window().window_size(size.width, size.height);
    if browser.headless {
        window = window.headless();
    }
    if let Some(profile) = &browser.profile {
        window = window.profile(profile);
    }

    let window = window.spawn().await?;
    info!(pid = window.pid(), binary = %driver.binary().display(), "Firefox started");
    Ok(Arc::new(window))
}
