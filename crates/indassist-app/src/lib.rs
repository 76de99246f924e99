#![warn(missing_docs)]
//! # indassist-app
//!
//! ## Purpose
//! Orchestrates capture, upload, analysis and UI state for `indassist`.
//!
//! ## Responsibilities
//! - Load layered configuration and install logging.
//! - Drive the camera lifecycle from the active view.
//! - Route captured and uploaded images to the analysis client.
//! - Turn every outcome into notifications and UI state updates.
//!
//! ## Data flow
//! User input -> [`Session`] -> capture controller or upload handler ->
//! analysis worker -> [`Session::tick`] -> UI state -> desktop shell.
//!
//! ## Ownership and lifetimes
//! The session is owned by the UI thread. Only the analysis worker runs off
//! that thread, and it hands results back through a channel.
//!
//! ## Error model
//! Subsystem failures are wrapped in [`AppError`]. Runtime failures after
//! startup never terminate the process; they become notifications.
//!
//! ## Security and privacy notes
//! Image payloads reach logs only as [`indassist_core::EncodedImage::summary`]:
//! MIME type and length, never the data URL.

pub mod messages;
mod session;
mod settings;

use indassist_capture::CaptureError;
use indassist_client::ClientError;
use indassist_core::CoreError;
use indassist_upload::UploadError;
use thiserror::Error;
use tracing::Level;

pub use settings::{
    AppConfig, CONFIG_PATH_ENV, CameraBackend, CameraConfig, DEFAULT_CONFIG_FILE, ENV_PREFIX,
};
pub use session::Session;

/// Build-time application version loaded from root `VERSION` file.
pub const APP_VERSION: &str = env!("INDASSIST_VERSION");

/// Returns the app version sourced from root `VERSION`.
pub fn app_version() -> &'static str {
    APP_VERSION
}

/// Installs the global `tracing` subscriber.
///
/// # Errors
/// Returns [`AppError::Logging`] when a subscriber is already installed.
pub fn init_logging(level: Level) -> Result<(), AppError> {
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .try_init()
        .map_err(|error| AppError::Logging(error.to_string()))
}

/// App integration error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration source could not be read or merged.
    #[error("config error: {0}")]
    Config(#[from] config::ConfigError),
    /// Configuration values are out of range.
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    /// Core model error.
    #[error("core error: {0}")]
    Core(#[from] CoreError),
    /// Capture subsystem error.
    #[error("capture error: {0}")]
    Capture(#[from] CaptureError),
    /// Upload subsystem error.
    #[error("upload error: {0}")]
    Upload(#[from] UploadError),
    /// Analysis client error.
    #[error("analysis error: {0}")]
    Client(#[from] ClientError),
    /// Logging could not be installed.
    #[error("logging error: {0}")]
    Logging(String),
    /// Desktop shell failure.
    #[error("gui error: {0}")]
    Gui(String),
}
