//! Layered application configuration.
//!
//! Sources, lowest precedence first: built-in defaults, an optional TOML file
//! (`indassist.toml`, or the path in `INDASSIST_CONFIG`), then `INDASSIST_*`
//! environment variables with `__` separating nested keys.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use indassist_capture::{MediaDevices, SyntheticMediaDevices, UnavailableMediaDevices};
use indassist_core::{DEFAULT_BASE_URL, DEFAULT_REQUEST_TIMEOUT, ServiceConfig};
use serde::Deserialize;
use tracing::Level;

use crate::AppError;

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "INDASSIST";

/// Environment variable naming an alternative config file.
pub const CONFIG_PATH_ENV: &str = "INDASSIST_CONFIG";

/// Config file used when [`CONFIG_PATH_ENV`] is unset.
pub const DEFAULT_CONFIG_FILE: &str = "indassist.toml";

/// Camera backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraBackend {
    /// No camera; the camera view shows the error panel.
    None,
    /// Deterministic noise frames.
    Synthetic,
    /// Host camera through the `native-camera` feature.
    Native,
}

impl Default for CameraBackend {
    fn default() -> Self {
        if cfg!(feature = "native-camera") {
            Self::Native
        } else {
            Self::None
        }
    }
}

/// Camera section.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Backend to open streams with.
    pub backend: CameraBackend,
    /// Host device index for the native backend.
    pub device_index: u32,
}

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Analysis service origin.
    pub base_url: String,
    /// Analysis round-trip limit in milliseconds.
    pub request_timeout_ms: u64,
    /// `trace`, `debug`, `info`, `warn` or `error`.
    pub log_level: String,
    /// Camera section.
    pub camera: CameraConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT.as_millis() as u64,
            log_level: "info".to_string(),
            camera: CameraConfig::default(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from the process environment.
    ///
    /// # Errors
    /// Returns [`AppError::Config`] when a source is malformed.
    pub fn load() -> Result<Self, AppError> {
        let path = std::env::var_os(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
        Self::load_from(Some(&path), None)
    }

    /// Loads configuration from an explicit file and environment map.
    ///
    /// `env` replaces the process environment when provided. A missing file
    /// is skipped.
    ///
    /// # Errors
    /// Returns [`AppError::Config`] when a source is malformed.
    pub fn load_from(
        path: Option<&Path>,
        env: Option<config::Map<String, String>>,
    ) -> Result<Self, AppError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(false));
        }
        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .source(env),
        );

        let loaded: Self = builder.build()?.try_deserialize()?;
        loaded.validate()?;
        Ok(loaded)
    }

    fn validate(&self) -> Result<(), AppError> {
        ServiceConfig::parse(&self.base_url)?;
        self.log_level()?;
        if self.request_timeout_ms == 0 {
            return Err(AppError::InvalidConfig(
                "request_timeout_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Request timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Parsed log level.
    ///
    /// # Errors
    /// Returns [`AppError::InvalidConfig`] for unknown level names.
    pub fn log_level(&self) -> Result<Level, AppError> {
        self.log_level
            .parse::<Level>()
            .map_err(|_| AppError::InvalidConfig(format!("unknown log level {}", self.log_level)))
    }

    /// Service configuration with the default tracing sink.
    ///
    /// # Errors
    /// Returns [`AppError::Core`] when `base_url` is not a usable address.
    pub fn service_config(&self) -> Result<ServiceConfig, AppError> {
        Ok(ServiceConfig::parse(&self.base_url)?.with_request_timeout(self.request_timeout()))
    }

    /// Media devices for the configured backend.
    pub fn media_devices(&self) -> Arc<dyn MediaDevices> {
        match self.camera.backend {
            CameraBackend::None => Arc::new(UnavailableMediaDevices::new("camera backend disabled")),
            CameraBackend::Synthetic => Arc::new(SyntheticMediaDevices::with_resolution(1280, 720)),
            CameraBackend::Native => native_devices(self.camera.device_index),
        }
    }
}

#[cfg(feature = "native-camera")]
fn native_devices(index: u32) -> Arc<dyn MediaDevices> {
    Arc::new(indassist_capture::NativeMediaDevices::new(index))
}

#[cfg(not(feature = "native-camera"))]
fn native_devices(_index: u32) -> Arc<dyn MediaDevices> {
    Arc::new(UnavailableMediaDevices::new(
        "built without the native-camera feature",
    ))
}
