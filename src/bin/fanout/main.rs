//! fanout - terminal control surface for a small FM patch
//!
//! Run with: cargo run --bin fanout

mod app;
mod config;
mod ui;

use std::fs::{self, File};
use std::sync::Mutex;

use color_eyre::eyre::{Result as EyreResult, WrapErr};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use app::App;

fn main() -> EyreResult<()> {
    color_eyre::install()?;
    init_logging()?;

    let config = config::load().wrap_err("failed to load config")?;
    tracing::info!(path = %config::config_path().display(), "starting fanout");

    App::new(config).run()
}

/// Log to a file; the terminal belongs to the UI.
fn init_logging() -> EyreResult<()> {
    let dir = config::log_dir();
    fs::create_dir_all(&dir).wrap_err_with(|| format!("failed to create {}", dir.display()))?;
    let file = File::create(dir.join("fanout.log")).wrap_err("failed to create log file")?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("fanout_dsp=info,fanout=info"));
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        )
        .with(filter)
        .init();
    Ok(())
}
