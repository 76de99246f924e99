//! Integration tests for layered configuration loading.

use std::fs;
use std::path::Path;
use std::time::Duration;

use indassist_app::{AppConfig, AppError, CameraBackend};
use indassist_capture::{MediaDevices, MediaStream, VideoConstraints};

fn env(pairs: &[(&str, &str)]) -> Option<config::Map<String, String>> {
    Some(
        pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect(),
    )
}

fn config_file(tag: &str, contents: &str) -> std::path::PathBuf {
    let directory =
        std::env::temp_dir().join(format!("indassist-config-{}-{tag}", std::process::id()));
    fs::create_dir_all(&directory).expect("temp dir should be created");
    let path = directory.join("indassist.toml");
    fs::write(&path, contents).expect("config file should be written");
    path
}

#[test]
fn config_layering_tests_defaults_without_sources() {
    let loaded = AppConfig::load_from(Some(Path::new("/missing/indassist.toml")), env(&[]))
        .expect("defaults should load");

    assert_eq!(loaded, AppConfig::default());
    assert_eq!(loaded.base_url, "http://localhost:8000");
    assert_eq!(loaded.request_timeout(), Duration::from_secs(120));
}

#[test]
fn config_layering_tests_environment_overrides_file() {
    let path = config_file(
        "override",
        "base_url = \"http://file-host:9000\"\nrequest_timeout_ms = 30000\n\n[camera]\nbackend = \"synthetic\"\n",
    );
    let loaded = AppConfig::load_from(
        Some(&path),
        env(&[
            ("INDASSIST_BASE_URL", "http://env-host:8100"),
            ("INDASSIST_CAMERA__DEVICE_INDEX", "2"),
        ]),
    )
    .expect("layered config should load");

    assert_eq!(loaded.base_url, "http://env-host:8100");
    assert_eq!(loaded.request_timeout_ms, 30_000);
    assert_eq!(loaded.camera.backend, CameraBackend::Synthetic);
    assert_eq!(loaded.camera.device_index, 2);
}

#[test]
fn config_layering_tests_rejects_invalid_values() {
    let zero_timeout = AppConfig::load_from(None, env(&[("INDASSIST_REQUEST_TIMEOUT_MS", "0")]));
    assert!(matches!(zero_timeout, Err(AppError::InvalidConfig(_))));

    let bad_level = AppConfig::load_from(None, env(&[("INDASSIST_LOG_LEVEL", "loud")]));
    assert!(matches!(bad_level, Err(AppError::InvalidConfig(_))));

    let bad_url = AppConfig::load_from(None, env(&[("INDASSIST_BASE_URL", "not a url")]));
    assert!(matches!(bad_url, Err(AppError::Core(_))));
}

#[test]
fn config_layering_tests_synthetic_backend_opens_streams() {
    let loaded = AppConfig::load_from(None, env(&[("INDASSIST_CAMERA__BACKEND", "synthetic")]))
        .expect("config should load");
    let devices = loaded.media_devices();
    let stream = devices
        .open_stream(&VideoConstraints::default())
        .expect("synthetic stream should open");

    assert_eq!(stream.resolution(), Some((1280, 720)));
}
