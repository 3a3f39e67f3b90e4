//! `tabrelay` command-line entry point.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::error;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use tabrelay::config::{AppConfig, Overrides};

/// Opens one Firefox tab per reference, waits for the CAPTCHA to be solved
/// by hand and saves each acknowledgment page as PDF.
#[derive(Debug, Parser)]
#[command(name = "tabrelay", version, about)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Reference list (.csv, .json or one per line).
    #[arg(short, long)]
    source: Option<PathBuf>,

    /// Directory for acknowledgment PDFs.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Firefox binary.
    #[arg(long)]
    firefox: Option<PathBuf>,

    /// Run Firefox without a visible window.
    #[arg(long)]
    headless: bool,

    /// Log at debug level.
    #[arg(long)]
    debug: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.debug);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(debug: bool) {
    let default = if debug { "tabrelay=debug" } else { "tabrelay=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to build runtime")?;

    let result = runtime.block_on(async {
        let config = AppConfig::load(cli.config.as_deref())
            .await
            .context("failed to load configuration")?
            .apply(Overrides {
                source: cli.source,
                output: cli.output,
                firefox: cli.firefox,
                headless: cli.headless,
            });
        config.validate().context("invalid configuration")?;

        tabrelay::app::run(config).await.context("tabrelay stopped")
    });

    // stdin is read on a blocking thread that never returns on its own
    runtime.shutdown_timeout(Duration::from_millis(500));
    result
}
