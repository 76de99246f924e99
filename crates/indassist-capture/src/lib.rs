#![warn(missing_docs)]
//! # indassist-capture
//!
//! ## Purpose
//! Provides camera stream acquisition and still-frame capture.
//!
//! ## Responsibilities
//! - Define host-agnostic media device and stream traits.
//! - Own at most one active stream and release it on every exit path.
//! - Drive settling delay and countdown capture from caller-supplied time.
//! - Encode frames as JPEG data URLs and reject implausibly small payloads.
//! - Expose deterministic synthetic devices for CI and unit tests.
//!
//! ## Data flow
//! Session enters the camera view -> [`CaptureController::start`] opens a
//! stream -> [`CaptureController::tick`] marks it ready after settling ->
//! capture produces an [`indassist_core::EncodedImage`] for the analysis client.
//!
//! ## Ownership and lifetimes
//! The controller exclusively owns the active stream through a scoped guard
//! whose `Drop` stops the stream tracks. Frames are owned `RgbImage` buffers.
//!
//! ## Error model
//! Device and backend failures are [`CaptureError`] values. Capture attempts
//! that must not reach the network are reported as [`CaptureRejection`].
//!
//! ## Security and privacy notes
//! Frames are never persisted to disk; encoded payloads are logged only as
//! length summaries.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use image::RgbImage;
use image::codecs::jpeg::JpegEncoder;
use indassist_core::{EncodedImage, MIN_PLAUSIBLE_CAPTURE_LEN, ServiceConfig};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use thiserror::Error;

#[cfg(feature = "native-camera")]
mod native;

#[cfg(feature = "native-camera")]
pub use native::NativeMediaDevices;

/// Preferred camera orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FacingMode {
    /// Rear-facing camera.
    Environment,
    /// Front-facing camera.
    User,
}

/// Stream request constraints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoConstraints {
    /// Preferred frame width.
    pub ideal_width: u32,
    /// Preferred frame height.
    pub ideal_height: u32,
    /// Smallest acceptable frame width.
    pub min_width: u32,
    /// Smallest acceptable frame height.
    pub min_height: u32,
    /// Preferred camera orientation.
    pub facing: FacingMode,
}

impl VideoConstraints {
    /// Returns `true` when a stream resolution meets the minimum.
    pub fn satisfied_by(&self, width: u32, height: u32) -> bool {
        width >= self.min_width && height >= self.min_height
    }
}

impl Default for VideoConstraints {
    fn default() -> Self {
        Self {
            ideal_width: 1280,
            ideal_height: 720,
            min_width: 640,
            min_height: 480,
            facing: FacingMode::Environment,
        }
    }
}

/// Host media API able to open camera streams.
pub trait MediaDevices: Send + Sync {
    /// Requests a new video stream.
    ///
    /// # Errors
    /// Returns [`CaptureError::AccessDenied`] or [`CaptureError::Unavailable`]
    /// when no stream can be granted.
    fn open_stream(
        &self,
        constraints: &VideoConstraints,
    ) -> Result<Box<dyn MediaStream>, CaptureError>;
}

/// One acquired camera stream.
pub trait MediaStream {
    /// Human-readable device label.
    fn label(&self) -> String;

    /// Negotiated resolution, once stream metadata is known.
    fn resolution(&self) -> Option<(u32, u32)>;

    /// Starts playback.
    ///
    /// # Errors
    /// Returns [`CaptureError::Playback`] when the stream cannot start.
    fn play(&mut self) -> Result<(), CaptureError>;

    /// Returns the current frame.
    ///
    /// # Errors
    /// Returns [`CaptureError::Backend`] when no frame is available.
    fn grab_frame(&mut self) -> Result<RgbImage, CaptureError>;

    /// Stops every track of the stream and releases the device.
    fn stop_tracks(&mut self);
}

/// Scoped ownership of a stream; tracks are stopped exactly once.
struct ActiveStream {
    stream: Box<dyn MediaStream>,
    stopped: bool,
}

impl ActiveStream {
    fn new(stream: Box<dyn MediaStream>) -> Self {
        Self {
            stream,
            stopped: false,
        }
    }

    fn stop(&mut self) {
        if !self.stopped {
            self.stream.stop_tracks();
            self.stopped = true;
        }
    }
}

impl Drop for ActiveStream {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Why the camera could not be brought up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraFailure {
    /// Access was denied or no suitable device exists.
    Unavailable,
    /// A stream was granted but playback failed.
    Playback,
}

impl From<&CaptureError> for CameraFailure {
    fn from(error: &CaptureError) -> Self {
        match error {
            CaptureError::Playback(_) => Self::Playback,
            _ => Self::Unavailable,
        }
    }
}

/// Lifecycle of the camera stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraPhase {
    /// No stream is held.
    Idle,
    /// Stream is playing; readiness is pending the settling delay.
    Settling {
        /// Time at which the stream becomes ready.
        ready_at_ms: u64,
    },
    /// Stream is ready for capture.
    Ready,
    /// The last start attempt failed.
    Failed(CameraFailure),
}

/// Tunables of the capture controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureSettings {
    /// Constraints for every stream request.
    pub constraints: VideoConstraints,
    /// Delay between playback start and readiness.
    pub settle_delay_ms: u64,
    /// First value shown by countdown capture.
    pub countdown_from: u8,
    /// Interval between countdown ticks.
    pub countdown_interval_ms: u64,
    /// JPEG quality in [1, 100].
    pub jpeg_quality: u8,
    /// Encoded payloads at or below this length are rejected.
    pub min_payload_len: usize,
    /// Canvas size used when a frame reports zero dimensions.
    pub fallback_resolution: (u32, u32),
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            constraints: VideoConstraints::default(),
            settle_delay_ms: 1_000,
            countdown_from: 3,
            countdown_interval_ms: 1_000,
            jpeg_quality: 85,
            min_payload_len: MIN_PLAUSIBLE_CAPTURE_LEN,
            fallback_resolution: (640, 480),
        }
    }
}

/// Events produced while the controller is ticked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureEvent {
    /// Settling finished; capture is possible.
    Ready,
    /// Countdown advanced; `remaining` is the value now displayed.
    CountdownTick {
        /// Ticks left before capture.
        remaining: u8,
    },
    /// Countdown finished with a valid capture.
    Captured(EncodedImage),
    /// Countdown finished but the capture was rejected.
    Rejected(CaptureRejection),
}

/// Reasons a capture attempt produced no image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureRejection {
    /// No ready stream.
    NotReady,
    /// The stream returned no frame.
    FrameUnavailable(String),
    /// JPEG encoding failed.
    EncodeFailed(String),
    /// Encoded payload too small to be a real frame.
    PayloadTooSmall {
        /// Encoded data URL length.
        len: usize,
    },
}

#[derive(Debug, Clone, Copy)]
struct Countdown {
    remaining: u8,
    next_tick_at_ms: u64,
}

/// Owns the camera stream and produces encoded captures.
pub struct CaptureController {
    config: ServiceConfig,
    devices: Arc<dyn MediaDevices>,
    settings: CaptureSettings,
    stream: Option<ActiveStream>,
    phase: CameraPhase,
    countdown: Option<Countdown>,
}

impl CaptureController {
    /// Creates an idle controller.
    pub fn new(
        config: &ServiceConfig,
        devices: Arc<dyn MediaDevices>,
        settings: CaptureSettings,
    ) -> Self {
        Self {
            config: config.clone(),
            devices,
            settings,
            stream: None,
            phase: CameraPhase::Idle,
            countdown: None,
        }
    }

    /// Releases any prior stream, then acquires and starts a new one.
    ///
    /// # Errors
    /// Returns the device error after moving to [`CameraPhase::Failed`].
    pub fn start(&mut self, now_ms: u64) -> Result<(), CaptureError> {
        self.release("restart");
        self.config.log_info("capture", "start", "requesting camera stream");

        match self.acquire() {
            Ok(stream) => {
                self.config.log_info(
                    "capture",
                    "playing",
                    &format!("device={}", stream.stream.label()),
                );
                self.stream = Some(stream);
                self.phase = CameraPhase::Settling {
                    ready_at_ms: now_ms.saturating_add(self.settings.settle_delay_ms),
                };
                Ok(())
            }
            Err(error) => {
                self.config.log_error("capture", "start_failed", &error.to_string());
                self.phase = CameraPhase::Failed(CameraFailure::from(&error));
                Err(error)
            }
        }
    }

    fn acquire(&self) -> Result<ActiveStream, CaptureError> {
        let constraints = self.settings.constraints;
        // Dropping `stream` on any early return stops its tracks.
        let mut stream = ActiveStream::new(self.devices.open_stream(&constraints)?);

        if let Some((width, height)) = stream.stream.resolution()
            && !constraints.satisfied_by(width, height)
        {
            return Err(CaptureError::Unavailable(format!(
                "resolution {width}x{height} is below the {}x{} minimum",
                constraints.min_width, constraints.min_height
            )));
        }

        stream.stream.play()?;
        Ok(stream)
    }

    /// Stops the active stream and returns to [`CameraPhase::Idle`].
    pub fn stop(&mut self) {
        self.release("stop");
        self.phase = CameraPhase::Idle;
    }

    fn release(&mut self, reason: &str) {
        self.countdown = None;
        if let Some(mut stream) = self.stream.take() {
            stream.stop();
            self.config.log_info("capture", "released", reason);
        }
    }

    /// Advances settling and countdown to `now_ms`.
    pub fn tick(&mut self, now_ms: u64) -> Vec<CaptureEvent> {
        let mut events = Vec::new();

        if let CameraPhase::Settling { ready_at_ms } = self.phase
            && now_ms >= ready_at_ms
        {
            self.phase = CameraPhase::Ready;
            self.config.log_info("capture", "ready", "camera settled");
            events.push(CaptureEvent::Ready);
        }

        while let Some(mut countdown) = self.countdown {
            if now_ms < countdown.next_tick_at_ms {
                break;
            }

            if countdown.remaining <= 1 {
                self.countdown = None;
                events.push(match self.capture() {
                    Ok(image) => CaptureEvent::Captured(image),
                    Err(rejection) => CaptureEvent::Rejected(rejection),
                });
                break;
            }

            countdown.remaining -= 1;
            countdown.next_tick_at_ms = countdown
                .next_tick_at_ms
                .saturating_add(self.settings.countdown_interval_ms);
            self.countdown = Some(countdown);
            events.push(CaptureEvent::CountdownTick {
                remaining: countdown.remaining,
            });
        }

        events
    }

    /// Starts countdown capture.
    ///
    /// # Returns
    /// The countdown value now displayed. A countdown already running is kept.
    ///
    /// # Errors
    /// Returns [`CaptureRejection::NotReady`] when the stream is not ready.
    pub fn start_countdown(&mut self, now_ms: u64) -> Result<u8, CaptureRejection> {
        if !self.is_ready() {
            return Err(CaptureRejection::NotReady);
        }
        if let Some(countdown) = self.countdown {
            return Ok(countdown.remaining);
        }

        let remaining = self.settings.countdown_from.max(1);
        self.countdown = Some(Countdown {
            remaining,
            next_tick_at_ms: now_ms.saturating_add(self.settings.countdown_interval_ms),
        });
        Ok(remaining)
    }

    /// Captures and encodes the current frame.
    ///
    /// # Errors
    /// Returns a [`CaptureRejection`]; the controller state is unchanged.
    pub fn capture(&mut self) -> Result<EncodedImage, CaptureRejection> {
        if !self.is_ready() {
            return Err(CaptureRejection::NotReady);
        }
        let stream = self.stream.as_mut().ok_or(CaptureRejection::NotReady)?;

        let frame = stream
            .stream
            .grab_frame()
            .map_err(|error| CaptureRejection::FrameUnavailable(error.to_string()))?;
        let frame = normalize_frame(frame, self.settings.fallback_resolution);
        let image = encode_jpeg(&frame, self.settings.jpeg_quality)
            .map_err(|error| CaptureRejection::EncodeFailed(error.to_string()))?;
        check_payload(&image, self.settings.min_payload_len)?;

        self.config.log_info(
            "capture",
            "frame_encoded",
            &format!("{}x{} {}", frame.width(), frame.height(), image.summary()),
        );
        Ok(image)
    }

    /// Returns the current frame for live preview without encoding it.
    pub fn preview_frame(&mut self) -> Option<RgbImage> {
        if !matches!(
            self.phase,
            CameraPhase::Settling { .. } | CameraPhase::Ready
        ) {
            return None;
        }
        self.stream
            .as_mut()
            .and_then(|stream| stream.stream.grab_frame().ok())
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> CameraPhase {
        self.phase
    }

    /// Returns `true` when capture is possible.
    pub fn is_ready(&self) -> bool {
        self.phase == CameraPhase::Ready && self.stream.is_some()
    }

    /// Countdown value currently displayed, if any.
    pub fn countdown(&self) -> Option<u8> {
        self.countdown.map(|countdown| countdown.remaining)
    }

    /// Negotiated stream resolution, if a stream is held.
    pub fn resolution(&self) -> Option<(u32, u32)> {
        self.stream
            .as_ref()
            .and_then(|stream| stream.stream.resolution())
    }

    /// Returns `true` while a stream is held.
    pub fn has_active_stream(&self) -> bool {
        self.stream.is_some()
    }

    /// Changes JPEG quality for subsequent captures.
    pub fn set_jpeg_quality(&mut self, quality: u8) {
        self.settings.jpeg_quality = quality.clamp(1, 100);
    }

    /// Current capture tunables.
    pub fn settings(&self) -> &CaptureSettings {
        &self.settings
    }
}

/// Replaces zero-sized frames with a blank canvas of `fallback` size.
pub fn normalize_frame(frame: RgbImage, fallback: (u32, u32)) -> RgbImage {
    if frame.width() == 0 || frame.height() == 0 {
        RgbImage::new(fallback.0.max(1), fallback.1.max(1))
    } else {
        frame
    }
}

/// Encodes an RGB frame as a JPEG data URL.
///
/// # Errors
/// Returns [`CaptureError::Encode`] when the encoder fails.
pub fn encode_jpeg(frame: &RgbImage, quality: u8) -> Result<EncodedImage, CaptureError> {
    let mut buffer = Vec::new();
    {
        let mut encoder = JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100));
        encoder
            .encode_image(frame)
            .map_err(|error| CaptureError::Encode(error.to_string()))?;
    }

    EncodedImage::from_bytes("image/jpeg", &buffer)
        .map_err(|error| CaptureError::Encode(error.to_string()))
}

/// Rejects payloads at or below `min_len` characters.
///
/// # Errors
/// Returns [`CaptureRejection::PayloadTooSmall`] for short payloads.
pub fn check_payload(image: &EncodedImage, min_len: usize) -> Result<(), CaptureRejection> {
    if image.len() <= min_len {
        return Err(CaptureRejection::PayloadTooSmall { len: image.len() });
    }
    Ok(())
}

/// Device that never grants a stream.
#[derive(Debug, Clone, Default)]
pub struct UnavailableMediaDevices {
    reason: String,
}

impl UnavailableMediaDevices {
    /// Creates a device that fails with `reason`.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl MediaDevices for UnavailableMediaDevices {
    fn open_stream(
        &self,
        _constraints: &VideoConstraints,
    ) -> Result<Box<dyn MediaStream>, CaptureError> {
        Err(CaptureError::Unavailable(self.reason.clone()))
    }
}

/// Deterministic synthetic device for test and CI usage.
///
/// Clones share counters, so a test can keep one handle while the controller
/// owns another.
#[derive(Debug, Clone)]
pub struct SyntheticMediaDevices {
    state: Arc<SyntheticState>,
}

#[derive(Debug)]
struct SyntheticState {
    width: u32,
    height: u32,
    opened: AtomicUsize,
    stopped: AtomicUsize,
    deny_access: AtomicBool,
    fail_playback: AtomicBool,
    fail_frames: AtomicBool,
    sequence: AtomicU64,
}

impl SyntheticMediaDevices {
    /// Creates a device producing 640x480 noise frames.
    pub fn new() -> Self {
        Self::with_resolution(640, 480)
    }

    /// Creates a device producing noise frames of the given size.
    pub fn with_resolution(width: u32, height: u32) -> Self {
        Self {
            state: Arc::new(SyntheticState {
                width,
                height,
                opened: AtomicUsize::new(0),
                stopped: AtomicUsize::new(0),
                deny_access: AtomicBool::new(false),
                fail_playback: AtomicBool::new(false),
                fail_frames: AtomicBool::new(false),
                sequence: AtomicU64::new(0),
            }),
        }
    }

    /// Makes subsequent `open_stream` calls fail with access denied.
    pub fn set_access_denied(&self, denied: bool) {
        self.state.deny_access.store(denied, Ordering::SeqCst);
    }

    /// Makes subsequent `play` calls fail.
    pub fn set_playback_failure(&self, failing: bool) {
        self.state.fail_playback.store(failing, Ordering::SeqCst);
    }

    /// Makes subsequent frame grabs fail.
    pub fn set_frame_failure(&self, failing: bool) {
        self.state.fail_frames.store(failing, Ordering::SeqCst);
    }

    /// Number of streams granted so far.
    pub fn streams_opened(&self) -> usize {
        self.state.opened.load(Ordering::SeqCst)
    }

    /// Number of streams whose tracks were stopped.
    pub fn streams_stopped(&self) -> usize {
        self.state.stopped.load(Ordering::SeqCst)
    }

    /// Streams granted and not yet stopped.
    pub fn live_streams(&self) -> usize {
        self.streams_opened()
            .saturating_sub(self.streams_stopped())
    }
}

impl Default for SyntheticMediaDevices {
    fn default() -> Self {
        Self::new()
    }
}

impl MediaDevices for SyntheticMediaDevices {
    fn open_stream(
        &self,
        _constraints: &VideoConstraints,
    ) -> Result<Box<dyn MediaStream>, CaptureError> {
        if self.state.deny_access.load(Ordering::SeqCst) {
            return Err(CaptureError::AccessDenied(
                "synthetic device denied access".to_string(),
            ));
        }

        let index = self.state.opened.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(Box::new(SyntheticStream {
            state: Arc::clone(&self.state),
            label: format!("Synthetic Camera #{index}"),
            stopped: false,
        }))
    }
}

struct SyntheticStream {
    state: Arc<SyntheticState>,
    label: String,
    stopped: bool,
}

impl MediaStream for SyntheticStream {
    fn label(&self) -> String {
        self.label.clone()
    }

    fn resolution(&self) -> Option<(u32, u32)> {
        Some((self.state.width, self.state.height))
    }

    fn play(&mut self) -> Result<(), CaptureError> {
        if self.state.fail_playback.load(Ordering::SeqCst) {
            return Err(CaptureError::Playback(
                "synthetic playback failure".to_string(),
            ));
        }
        Ok(())
    }

    fn grab_frame(&mut self) -> Result<RgbImage, CaptureError> {
        if self.stopped {
            return Err(CaptureError::Backend("stream already stopped".to_string()));
        }
        if self.state.fail_frames.load(Ordering::SeqCst) {
            return Err(CaptureError::Backend("synthetic frame failure".to_string()));
        }

        let seed = self.state.sequence.fetch_add(1, Ordering::SeqCst);
        let mut rng = StdRng::seed_from_u64(seed);
        let mut pixels = vec![0_u8; (self.state.width as usize) * (self.state.height as usize) * 3];
        rng.fill_bytes(&mut pixels);

        RgbImage::from_raw(self.state.width, self.state.height, pixels)
            .ok_or_else(|| CaptureError::Backend("synthetic frame shape mismatch".to_string()))
    }

    fn stop_tracks(&mut self) {
        if !self.stopped {
            self.stopped = true;
            self.state.stopped.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// Capture layer error type.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// The user or platform denied camera access.
    #[error("camera access denied: {0}")]
    AccessDenied(String),
    /// No camera matching the constraints is available.
    #[error("camera unavailable: {0}")]
    Unavailable(String),
    /// Stream playback could not start.
    #[error("camera playback failure: {0}")]
    Playback(String),
    /// Backend runtime failure.
    #[error("capture backend failure: {0}")]
    Backend(String),
    /// Frame encoding failure.
    #[error("frame encode failure: {0}")]
    Encode(String),
}

#[cfg(test)]
mod tests {
    //! Unit tests for frame helpers and stream ownership.

    use super::*;

    #[test]
    fn zero_sized_frame_falls_back_to_default_canvas() {
        let frame = normalize_frame(RgbImage::new(0, 0), (640, 480));
        assert_eq!(frame.dimensions(), (640, 480));
    }

    #[test]
    fn noise_frame_encodes_above_plausibility_floor() {
        let devices = SyntheticMediaDevices::with_resolution(64, 48);
        let mut stream = devices
            .open_stream(&VideoConstraints::default())
            .expect("stream should open");
        let frame = stream.grab_frame().expect("frame should be produced");
        let image = encode_jpeg(&frame, 85).expect("frame should encode");
        assert_eq!(image.mime_type(), "image/jpeg");
        assert!(check_payload(&image, MIN_PLAUSIBLE_CAPTURE_LEN).is_ok());
    }

    #[test]
    fn active_stream_stops_tracks_once() {
        let devices = SyntheticMediaDevices::new();
        let mut active = ActiveStream::new(
            devices
                .open_stream(&VideoConstraints::default())
                .expect("stream should open"),
        );
        active.stop();
        drop(active);
        assert_eq!(devices.streams_stopped(), 1);
        assert_eq!(devices.live_streams(), 0);
    }
}
