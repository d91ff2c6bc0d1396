//! # anniebelle
//!
//! Flashes an image in the middle of the screen whenever the X11 bell rings,
//! and hides it again shortly after the last bell.
//!
//! Exit codes: 0 for `--help` and `--version`, 1 for any argument,
//! environment, connection or image problem. Once running, the overlay loop
//! only ends when the display connection goes away.

use anyhow::Result;
use clap::Parser;
use log::{error, info};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anniebelle::config::{OverlayConfig, DEFAULT_HIDE_DELAY_MS};

#[derive(Parser, Debug)]
#[command(name = "anniebelle")]
#[command(about = "Flash an image on screen whenever the X11 bell rings")]
#[command(version)]
struct Cli {
    /// Image to show when the bell rings
    image: PathBuf,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Milliseconds the overlay stays up after the last bell
    #[arg(long, value_name = "MS", default_value_t = DEFAULT_HIDE_DELAY_MS)]
    hide_delay: u64,
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // Help and version go to stdout and are not failures
            let code = if e.use_stderr() { 1 } else { 0 };
            // Nowhere left to report a failed write of the usage text
            e.print().ok();
            return ExitCode::from(code);
        }
    };

    // Initialize logging
    let default_filter = if cli.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("❌ {:#}", e);
            eprintln!("anniebelle: {:#}", e);
            ExitCode::from(1)
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = OverlayConfig::from_env(cli.image, Duration::from_millis(cli.hide_delay))?;

    info!("🚀 Starting anniebelle {}", env!("CARGO_PKG_VERSION"));
    info!("📄 Image: {}", config.image.display());

    anniebelle::app::run(&config)
}
