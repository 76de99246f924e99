//! Shared fixtures for app integration tests.

use std::collections::VecDeque;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use indassist_app::Session;
use indassist_capture::{CaptureSettings, SyntheticMediaDevices};
use indassist_client::{AnalysisClient, AnalysisTransport, TransportError, TransportResponse};
use indassist_core::{MemorySink, ServiceConfig};
use serde_json::json;
use url::Url;

/// Camera settle delay used by [`CaptureSettings::default`].
#[allow(dead_code)]
pub const SETTLE_MS: u64 = 1_000;

/// Serialized analysis record with one detection.
#[allow(dead_code)]
pub fn record_body(id: &str) -> Vec<u8> {
    serde_json::to_vec(&json!({
        "id": id,
        "timestamp": "2024-05-01T10:20:30",
        "detected_objects": ["wrench"],
        "confidence_scores": [0.91],
        "task_phase": "tool_preparation",
        "expert_analysis": "Wrench is in position.",
        "safety_assessment": "No hazards detected.",
        "next_steps": "",
        "image_url": format!("/static/{id}.jpg")
    }))
    .expect("record fixture should serialize")
}

/// Replays scripted responses, optionally after a delay.
#[allow(dead_code)]
#[derive(Default)]
pub struct ScriptedTransport {
    responses: Mutex<VecDeque<Result<TransportResponse, TransportError>>>,
    posts: Mutex<Vec<Vec<u8>>>,
    delay: Duration,
}

#[allow(dead_code)]
impl ScriptedTransport {
    /// Transport answering every post with the next scripted response.
    pub fn with(responses: Vec<Result<TransportResponse, TransportError>>) -> Arc<Self> {
        Self::delayed(responses, Duration::ZERO)
    }

    /// Like [`ScriptedTransport::with`], sleeping before each answer.
    pub fn delayed(
        responses: Vec<Result<TransportResponse, TransportError>>,
        delay: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            posts: Mutex::new(Vec::new()),
            delay,
        })
    }

    /// Transport answering once with status and body.
    pub fn answering(status: u16, body: Vec<u8>) -> Arc<Self> {
        Self::with(vec![Ok(TransportResponse { status, body })])
    }

    /// Bodies posted so far.
    pub fn posts(&self) -> Vec<Vec<u8>> {
        self.posts.lock().expect("posts lock").clone()
    }
}

impl AnalysisTransport for ScriptedTransport {
    fn post_json(
        &self,
        _url: &Url,
        body: &[u8],
        _timeout: Duration,
    ) -> Result<TransportResponse, TransportError> {
        self.posts.lock().expect("posts lock").push(body.to_vec());
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
        self.responses
            .lock()
            .expect("responses lock")
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Failed("script exhausted".to_string())))
    }

    fn get(&self, _url: &Url, _timeout: Duration) -> Result<TransportResponse, TransportError> {
        Err(TransportError::Failed("status check not scripted".to_string()))
    }
}

/// Session under test with handles to its collaborators.
#[allow(dead_code)]
pub struct Harness {
    /// Session under test.
    pub session: Session,
    /// Camera device shared with the session.
    pub devices: SyntheticMediaDevices,
    /// Diagnostics written by the session and its subsystems.
    pub sink: Arc<MemorySink>,
}

/// Session on a synthetic camera, started at `now_ms = 0`.
#[allow(dead_code)]
pub fn harness(transport: Arc<dyn AnalysisTransport>) -> Harness {
    harness_with_settings(transport, CaptureSettings::default())
}

/// Like [`harness`], with explicit capture tunables.
#[allow(dead_code)]
pub fn harness_with_settings(
    transport: Arc<dyn AnalysisTransport>,
    capture_settings: CaptureSettings,
) -> Harness {
    let sink = Arc::new(MemorySink::new());
    let config = ServiceConfig::parse("http://localhost:8000")
        .expect("fixture base url should parse")
        .with_logger(sink.clone());
    let devices = SyntheticMediaDevices::new();
    let client = AnalysisClient::new(config, transport);
    let session = Session::new(
        "0.1.0",
        client,
        Arc::new(devices.clone()),
        capture_settings,
        0,
    );
    Harness {
        session,
        devices,
        sink,
    }
}

/// Session whose camera has already settled.
#[allow(dead_code)]
pub fn ready_harness(transport: Arc<dyn AnalysisTransport>) -> Harness {
    let mut harness = harness(transport);
    harness.session.tick(SETTLE_MS);
    assert!(harness.session.state().camera_ready());
    harness
}

/// Ticks at a fixed time until the pending analysis settles.
#[allow(dead_code)]
pub fn wait_for_analysis(session: &mut Session, now_ms: u64) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while session.state().analyzing {
        assert!(Instant::now() < deadline, "analysis did not settle in time");
        thread::sleep(Duration::from_millis(5));
        session.tick(now_ms);
    }
}

/// Writes bytes to `<temp>/indassist-app-<pid>-<tag>/<name>`.
#[allow(dead_code)]
pub fn temp_file(tag: &str, name: &str, bytes: &[u8]) -> PathBuf {
    let directory =
        std::env::temp_dir().join(format!("indassist-app-{}-{tag}", std::process::id()));
    fs::create_dir_all(&directory).expect("temp dir should be created");
    let path = directory.join(name);
    fs::write(&path, bytes).expect("temp file should be written");
    path
}

/// Small valid PNG.
#[allow(dead_code)]
pub fn png_bytes() -> Vec<u8> {
    let mut bytes = Vec::new();
    image::RgbImage::from_pixel(8, 8, image::Rgb([40, 120, 200]))
        .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
        .expect("png fixture should encode");
    bytes
}
