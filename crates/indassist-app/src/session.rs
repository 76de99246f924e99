//! Session orchestration between capture, upload, analysis and UI state.

use std::path::Path;
use std::sync::Arc;
use std::thread::JoinHandle;

use image::RgbImage;
use indassist_capture::{
    CameraFailure, CameraPhase, CaptureController, CaptureEvent, CaptureRejection,
    CaptureSettings, MediaDevices,
};
use indassist_client::{
    AnalysisClient, ClientError, FailureKind, PendingAnalysis, classify_client_error,
};
use indassist_core::{EncodedImage, ServiceConfig, SystemStatus};
use indassist_notify::{NotificationId, NotificationQueue};
use indassist_ui::{CameraIndicator, DetectionSettings, UiState, View};
use indassist_upload::{UploadHandler, display_name};

use crate::messages;

/// Owns all session state; driven by the UI thread.
pub struct Session {
    config: ServiceConfig,
    state: UiState,
    notifications: NotificationQueue,
    camera: CaptureController,
    upload: UploadHandler,
    client: AnalysisClient,
    pending: Option<PendingAnalysis>,
}

impl Session {
    /// Creates a session on the camera view and starts the camera.
    pub fn new(
        version: impl Into<String>,
        client: AnalysisClient,
        devices: Arc<dyn MediaDevices>,
        capture_settings: CaptureSettings,
        now_ms: u64,
    ) -> Self {
        let config = client.config().clone();
        let camera = CaptureController::new(&config, devices, capture_settings);
        let mut session = Self {
            config,
            state: UiState::new(version),
            notifications: NotificationQueue::new(),
            camera,
            upload: UploadHandler::new(),
            client,
            pending: None,
        };
        session.start_camera(now_ms);
        session
    }

    /// Current UI state.
    pub fn state(&self) -> &UiState {
        &self.state
    }

    /// Visible notifications.
    pub fn notifications(&self) -> &NotificationQueue {
        &self.notifications
    }

    /// Analysis client, for image downloads.
    pub fn client(&self) -> &AnalysisClient {
        &self.client
    }

    /// Camera controller.
    pub fn camera(&self) -> &CaptureController {
        &self.camera
    }

    /// Current camera frame for live preview.
    pub fn preview_frame(&mut self) -> Option<RgbImage> {
        if self.state.view != View::Camera {
            return None;
        }
        self.camera.preview_frame()
    }

    /// Checks the service status in the background. Outcomes are only logged.
    pub fn spawn_status_check(&self) -> Option<JoinHandle<Option<SystemStatus>>> {
        match self.client.spawn_status_check() {
            Ok(handle) => Some(handle),
            Err(error) => {
                self.config.log_warn("status", "check_not_started", &error.to_string());
                None
            }
        }
    }

    /// Switches views; the camera runs only while its view is active.
    pub fn switch_view(&mut self, view: View, now_ms: u64) {
        if self.state.view == view {
            return;
        }

        let leaving_camera = self.state.view == View::Camera;
        self.state.view = view;
        self.config.log_info("ui", "view", view.label());

        if leaving_camera {
            self.camera.stop();
        }
        if view == View::Camera {
            self.start_camera(now_ms);
        }
        self.sync_camera();
    }

    /// Restarts the camera after an error.
    pub fn retry_camera(&mut self, now_ms: u64) {
        if self.state.view == View::Camera {
            self.start_camera(now_ms);
        }
    }

    /// Leaves a failed camera for the upload view.
    pub fn fallback_to_upload(&mut self, now_ms: u64) {
        self.switch_view(View::Upload, now_ms);
    }

    fn start_camera(&mut self, now_ms: u64) {
        if let Err(error) = self.camera.start(now_ms)
            && CameraFailure::from(&error) == CameraFailure::Unavailable
        {
            self.notify(messages::CAMERA_ACCESS_FAILED, now_ms);
        }
        self.sync_camera();
    }

    /// Handles the Enter key.
    ///
    /// # Returns
    /// `false` when the key was ignored.
    pub fn on_enter_key(&mut self, now_ms: u64) -> bool {
        if !self.state.can_countdown_capture() {
            return false;
        }
        self.press_capture(now_ms)
    }

    /// Handles the capture button: starts a countdown capture.
    ///
    /// # Returns
    /// `true` when a countdown is running afterwards.
    pub fn press_capture(&mut self, now_ms: u64) -> bool {
        if self.state.analyzing {
            return false;
        }
        if self.camera.countdown().is_some() {
            return true;
        }

        match self.camera.start_countdown(now_ms) {
            Ok(_) => {
                self.notify(messages::COUNTDOWN_STARTED, now_ms);
                self.sync_camera();
                true
            }
            Err(rejection) => {
                self.reject_capture(&rejection, now_ms);
                false
            }
        }
    }

    /// Captures immediately and starts analysis.
    pub fn capture_now(&mut self, now_ms: u64) {
        match self.camera.capture() {
            Ok(image) => self.accept_capture(image, now_ms),
            Err(rejection) => self.reject_capture(&rejection, now_ms),
        }
    }

    fn accept_capture(&mut self, image: EncodedImage, now_ms: u64) {
        self.notify(messages::CAPTURE_SUCCEEDED, now_ms);
        self.begin_analysis(image, now_ms);
    }

    fn reject_capture(&mut self, rejection: &CaptureRejection, now_ms: u64) {
        self.config.log_warn("capture", "rejected", &format!("{rejection:?}"));
        let message = match rejection {
            CaptureRejection::NotReady => messages::CAMERA_NOT_READY,
            CaptureRejection::PayloadTooSmall { .. } => messages::CAPTURE_FAILED,
            CaptureRejection::FrameUnavailable(_) | CaptureRejection::EncodeFailed(_) => {
                messages::CAPTURE_ERROR
            }
        };
        self.notify(message, now_ms);
    }

    /// Reads a picked file and sends it for analysis.
    pub fn upload_file(&mut self, path: &Path, now_ms: u64) {
        self.upload.select(path);
        self.notify(messages::processing(&display_name(path)), now_ms);

        match self.upload.take_and_read() {
            Some(Ok(image)) => self.begin_analysis(image, now_ms),
            Some(Err(error)) => {
                self.config.log_error("upload", "read_failed", &error.to_string());
                self.notify(messages::FILE_READ_FAILED, now_ms);
            }
            None => {}
        }
    }

    fn begin_analysis(&mut self, image: EncodedImage, now_ms: u64) {
        let summary = image.summary();
        match self.client.spawn_analysis(image) {
            Ok(pending) => {
                self.config.log_info("analysis", "started", &summary);
                self.pending = Some(pending);
                self.state.analyzing = true;
                self.notify(messages::ANALYSIS_STARTING, now_ms);
            }
            Err(error) => self.report_failure(&error, now_ms),
        }
    }

    /// Cancels the pending analysis. Returns `false` when none is pending.
    pub fn cancel_analysis(&mut self, now_ms: u64) -> bool {
        let Some(pending) = self.pending.take() else {
            return false;
        };
        pending.cancel();
        self.state.analyzing = false;
        self.config.log_info("analysis", "cancel_requested", "pending analysis abandoned");
        self.notify(messages::ANALYSIS_CANCELLED, now_ms);
        true
    }

    /// Advances camera timers, collects analysis results and expires
    /// notifications.
    pub fn tick(&mut self, now_ms: u64) {
        for event in self.camera.tick(now_ms) {
            match event {
                CaptureEvent::Ready => self.notify(messages::CAMERA_READY, now_ms),
                CaptureEvent::CountdownTick { .. } => {}
                CaptureEvent::Captured(image) => self.accept_capture(image, now_ms),
                CaptureEvent::Rejected(rejection) => self.reject_capture(&rejection, now_ms),
            }
        }

        let finished = self
            .pending
            .as_mut()
            .and_then(PendingAnalysis::try_finish);
        if let Some(result) = finished {
            self.pending = None;
            self.state.analyzing = false;
            match result {
                Ok(record) => {
                    self.state.record_analysis(record);
                    self.notify(messages::ANALYSIS_COMPLETE, now_ms);
                }
                Err(error) => self.report_failure(&error, now_ms),
            }
        }

        self.notifications.expire(now_ms);
        self.sync_camera();
    }

    fn report_failure(&mut self, error: &ClientError, now_ms: u64) {
        let message = match classify_client_error(error) {
            FailureKind::Busy => messages::ANALYSIS_BUSY,
            FailureKind::TimedOut => messages::ANALYSIS_TIMED_OUT,
            FailureKind::Cancelled => messages::ANALYSIS_CANCELLED,
            FailureKind::Unavailable => messages::ANALYSIS_FAILED,
        };
        self.notify(message, now_ms);
    }

    /// Clears the results panel.
    pub fn clear_current(&mut self) {
        self.state.clear_current();
    }

    /// Re-opens a history entry as the current analysis.
    pub fn view_history_entry(&mut self, id: &str) -> bool {
        self.state.show_history_entry(id)
    }

    /// Opens or closes the detection settings panel.
    pub fn toggle_settings(&mut self) {
        self.state.toggle_settings();
    }

    /// Replaces the values in the settings controls.
    pub fn set_draft_settings(&mut self, settings: DetectionSettings) {
        self.state.draft_settings = settings;
    }

    /// Applies the draft settings to capture and result display.
    pub fn apply_settings(&mut self) {
        let applied = self.state.apply_settings();
        self.camera
            .set_jpeg_quality(applied.quality.jpeg_quality());
        self.config.log_info(
            "settings",
            "applied",
            &format!(
                "quality={} threshold={}%",
                applied.quality.jpeg_quality(),
                applied.confidence_threshold
            ),
        );
    }

    /// Removes one notification early.
    pub fn dismiss_notification(&mut self, id: NotificationId) -> bool {
        self.notifications.dismiss(id)
    }

    /// Cancels pending work and releases the camera.
    pub fn shutdown(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.cancel();
        }
        self.state.analyzing = false;
        self.camera.stop();
        self.sync_camera();
        self.config.log_info("session", "shutdown", "camera released");
    }

    fn notify(&mut self, message: impl Into<String>, now_ms: u64) {
        let message = message.into();
        self.config.log_info("notify", "push", &message);
        self.notifications.push(message, now_ms);
    }

    fn sync_camera(&mut self) {
        self.state.camera.indicator = match self.camera.phase() {
            CameraPhase::Ready => CameraIndicator::Ready,
            CameraPhase::Idle | CameraPhase::Settling { .. } => CameraIndicator::Initializing,
            CameraPhase::Failed(CameraFailure::Unavailable) => {
                CameraIndicator::Error(messages::CAMERA_UNAVAILABLE.to_string())
            }
            CameraPhase::Failed(CameraFailure::Playback) => {
                CameraIndicator::Error(messages::STREAM_FAILED.to_string())
            }
        };
        self.state.camera.resolution = self.camera.resolution();
        self.state.camera.countdown = self.camera.countdown();
    }
}
