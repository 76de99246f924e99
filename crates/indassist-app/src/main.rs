#![warn(missing_docs)]
//! # indassist binary
//!
//! Desktop entry point for the industrial AI assistant.

mod gui;

use indassist_app::{AppConfig, AppError, app_version, init_logging};
use indassist_capture::CaptureSettings;
use indassist_client::AnalysisClient;

/// CLI entry point.
fn main() {
    if let Err(error) = run() {
        eprintln!("failed to start indassist: {error}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), AppError> {
    let config = AppConfig::load()?;
    init_logging(config.log_level()?)?;
    tracing::info!(
        stage = "startup",
        action = "config_loaded",
        "version={} base_url={} camera={:?}",
        app_version(),
        config.base_url,
        config.camera.backend
    );

    let client = AnalysisClient::with_http(config.service_config()?)?;
    gui::run(client, config.media_devices(), CaptureSettings::default())
}
