#![warn(missing_docs)]
//! # indassist-ui
//!
//! ## Purpose
//! Defines the view/result state of the assistant and the pure panel models
//! the desktop shell draws from it.
//!
//! ## Responsibilities
//! - Track the active view, the in-flight flag, the current record and history.
//! - Mirror camera readiness, resolution and countdown for rendering.
//! - Hold draft and applied detection settings.
//! - Project state into camera, results, history and footer models.
//!
//! ## Data flow
//! Session events mutate [`UiState`]; the shell calls [`UiState::camera_panel`],
//! [`UiState::results_panel`] and [`UiState::history_cards`] every frame.
//!
//! ## Ownership and lifetimes
//! `UiState` owns every record it shows; panel models are owned snapshots so
//! rendering never borrows state across a mutation.
//!
//! ## Error model
//! This crate favors explicit state over recoverable errors. Invalid
//! combinations are prevented by guard methods.
//!
//! ## Security and privacy notes
//! UI state never holds raw frames or encoded image payloads.

use indassist_analysis_contract::{
    DetectionBadge, HISTORY_OBJECT_PREVIEW, ObjectPreview, UNKNOWN_PHASE, UNKNOWN_PHASE_SHORT,
    detection_badges, display_timestamp, object_count_label, object_preview, phase_label,
    short_id,
};
use indassist_core::AnalysisRecord;

/// Hint shown by the empty results panel in the camera view.
pub const CAPTURE_HINT: &str = "Capture an image to perform analysis";

/// Hint shown by the empty results panel outside the camera view.
pub const UPLOAD_HINT: &str = "Upload an image to perform analysis";

/// Empty results panel headline.
pub const NO_ANALYSIS: &str = "No analysis data available";

/// Empty detection list text.
pub const NO_OBJECTS: &str = "No objects detected";

/// Empty history text.
pub const NO_HISTORY: &str = "No history data available";

/// Overlay text while the camera initializes.
pub const INITIALIZING_CAMERA: &str = "Initializing camera...";

/// Overlay text while an analysis is pending.
pub const ANALYZING_IMAGE: &str = "Analyzing image...";

/// Overlay hint when capture is possible.
pub const ENTER_HINT: &str = "Press Enter to capture";

/// Top-level view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum View {
    /// Live camera with capture controls.
    Camera,
    /// File upload.
    Upload,
    /// Past analyses.
    History,
}

impl View {
    /// Navigation order.
    pub const ALL: [View; 3] = [View::Camera, View::Upload, View::History];

    /// Navigation label.
    pub fn label(self) -> &'static str {
        match self {
            View::Camera => "Camera",
            View::Upload => "Upload",
            View::History => "History",
        }
    }
}

/// Camera status as the shell shows it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CameraIndicator {
    /// Stream requested or settling.
    Initializing,
    /// Capture possible.
    Ready,
    /// Start failed; the message is shown in the error panel.
    Error(String),
}

/// Camera facts mirrored from the capture controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraSnapshot {
    /// Current indicator.
    pub indicator: CameraIndicator,
    /// Stream resolution when known.
    pub resolution: Option<(u32, u32)>,
    /// Countdown value currently displayed.
    pub countdown: Option<u8>,
}

impl Default for CameraSnapshot {
    fn default() -> Self {
        Self {
            indicator: CameraIndicator::Initializing,
            resolution: None,
            countdown: None,
        }
    }
}

/// Detection quality selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DetectionQuality {
    /// Default JPEG quality.
    #[default]
    Standard,
    /// Higher JPEG quality for captures.
    HighQuality,
}

impl DetectionQuality {
    /// Both options in selector order.
    pub const ALL: [DetectionQuality; 2] = [DetectionQuality::Standard, DetectionQuality::HighQuality];

    /// Selector label.
    pub fn label(self) -> &'static str {
        match self {
            DetectionQuality::Standard => "Standard (Faster)",
            DetectionQuality::HighQuality => "High Quality (Slower)",
        }
    }

    /// JPEG quality used for camera captures.
    pub fn jpeg_quality(self) -> u8 {
        match self {
            DetectionQuality::Standard => 85,
            DetectionQuality::HighQuality => 95,
        }
    }
}

/// Detection settings panel values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetectionSettings {
    /// Quality selector.
    pub quality: DetectionQuality,
    /// Badge threshold in whole percent.
    pub confidence_threshold: u8,
}

impl Default for DetectionSettings {
    fn default() -> Self {
        Self {
            quality: DetectionQuality::Standard,
            confidence_threshold: 40,
        }
    }
}

/// Aggregate UI state.
#[derive(Debug, Clone, PartialEq)]
pub struct UiState {
    /// App version string sourced from root `VERSION`.
    pub version: String,
    /// Active view.
    pub view: View,
    /// Whether an analysis is pending.
    pub analyzing: bool,
    /// Record shown in the results panel.
    pub current_analysis: Option<AnalysisRecord>,
    /// Every record of this process, newest first.
    pub history: Vec<AnalysisRecord>,
    /// Mirrored camera facts.
    pub camera: CameraSnapshot,
    /// Whether the settings panel is open.
    pub show_settings: bool,
    /// Values currently in the settings controls.
    pub draft_settings: DetectionSettings,
    /// Values in effect, once applied.
    pub applied_settings: Option<DetectionSettings>,
}

impl UiState {
    /// Creates state for a fresh session on the camera view.
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            view: View::Camera,
            analyzing: false,
            current_analysis: None,
            history: Vec::new(),
            camera: CameraSnapshot::default(),
            show_settings: false,
            draft_settings: DetectionSettings::default(),
            applied_settings: None,
        }
    }

    /// Shows a fresh record and prepends it to history.
    pub fn record_analysis(&mut self, record: AnalysisRecord) {
        self.history.insert(0, record.clone());
        self.current_analysis = Some(record);
    }

    /// Clears the results panel; history is kept.
    pub fn clear_current(&mut self) {
        self.current_analysis = None;
    }

    /// Re-opens a history entry. Returns `false` when the id is unknown.
    pub fn show_history_entry(&mut self, id: &str) -> bool {
        match self.history.iter().find(|record| record.id == id) {
            Some(record) => {
                self.current_analysis = Some(record.clone());
                true
            }
            None => false,
        }
    }

    /// Returns `true` when the camera is ready.
    pub fn camera_ready(&self) -> bool {
        self.camera.indicator == CameraIndicator::Ready
    }

    /// Returns `true` when Enter or the capture button may start a countdown.
    pub fn can_countdown_capture(&self) -> bool {
        self.view == View::Camera && self.camera_ready() && !self.analyzing
    }

    /// Opens or closes the settings panel.
    pub fn toggle_settings(&mut self) {
        self.show_settings = !self.show_settings;
    }

    /// Puts the draft settings into effect.
    pub fn apply_settings(&mut self) -> DetectionSettings {
        self.applied_settings = Some(self.draft_settings);
        self.draft_settings
    }

    /// Badge threshold in effect, if settings were applied.
    pub fn badge_threshold(&self) -> Option<u8> {
        self.applied_settings
            .map(|settings| settings.confidence_threshold)
    }

    /// Camera panel model.
    pub fn camera_panel(&self) -> CameraPanel {
        let ready = self.camera_ready();
        let error = match &self.camera.indicator {
            CameraIndicator::Error(message) => Some(message.clone()),
            _ => None,
        };
        let (width, height) = self.camera.resolution.unwrap_or((0, 0));

        CameraPanel {
            status_label: if ready { "READY" } else { "INITIALIZING" },
            resolution_label: format!("{width} x {height}"),
            initializing: !ready && error.is_none(),
            error,
            analyzing: self.analyzing,
            show_enter_hint: ready && !self.analyzing,
            capture_enabled: ready && !self.analyzing,
            countdown: self.camera.countdown,
        }
    }

    /// Results panel model.
    pub fn results_panel(&self) -> ResultsPanel {
        match &self.current_analysis {
            Some(record) => ResultsPanel::Record(RecordView::new(record, self.badge_threshold())),
            None => ResultsPanel::Empty {
                hint: if self.view == View::Camera {
                    CAPTURE_HINT
                } else {
                    UPLOAD_HINT
                },
            },
        }
    }

    /// History card models, newest first.
    pub fn history_cards(&self) -> Vec<HistoryCard> {
        self.history.iter().map(HistoryCard::new).collect()
    }

    /// History header, for example `3 RECORDS`.
    pub fn history_header(&self) -> String {
        format!("{} RECORDS", self.history.len())
    }

    /// Footer text.
    pub fn footer_label(&self) -> String {
        format!("INDUSTRIAL AI ASSISTANT v{}", self.version)
    }
}

/// Camera panel model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraPanel {
    /// `READY` or `INITIALIZING`.
    pub status_label: &'static str,
    /// `W x H`, `0 x 0` when unknown.
    pub resolution_label: String,
    /// Show the initializing spinner.
    pub initializing: bool,
    /// Error panel message with retry and upload actions.
    pub error: Option<String>,
    /// Show the analyzing overlay.
    pub analyzing: bool,
    /// Show the Enter hint.
    pub show_enter_hint: bool,
    /// Capture button enabled.
    pub capture_enabled: bool,
    /// Countdown badge.
    pub countdown: Option<u8>,
}

/// Results panel model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultsPanel {
    /// No current record.
    Empty {
        /// View-dependent hint.
        hint: &'static str,
    },
    /// Current record.
    Record(RecordView),
}

/// Display values of one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordView {
    /// Full record id.
    pub id: String,
    /// `ID: <first 8 chars>`.
    pub id_label: String,
    /// Backend-relative image path.
    pub image_url: String,
    /// Operation phase label.
    pub phase_label: String,
    /// Detection badges after the applied threshold.
    pub badges: Vec<DetectionBadge>,
    /// Shown when no badge remains.
    pub empty_badges_label: Option<&'static str>,
    /// Safety narrative.
    pub safety_assessment: String,
    /// Expert narrative.
    pub expert_analysis: String,
    /// Next steps, when the backend sent any.
    pub next_steps: Option<String>,
}

impl RecordView {
    fn new(record: &AnalysisRecord, threshold: Option<u8>) -> Self {
        let badges = detection_badges(record, threshold);
        let next_steps = record.next_steps.trim();
        Self {
            id: record.id.clone(),
            id_label: format!("ID: {}", short_id(&record.id)),
            image_url: record.image_url.clone(),
            phase_label: phase_label(record.task_phase.as_deref(), UNKNOWN_PHASE),
            empty_badges_label: badges.is_empty().then_some(NO_OBJECTS),
            badges,
            safety_assessment: record.safety_assessment.clone(),
            expert_analysis: record.expert_analysis.clone(),
            next_steps: (!next_steps.is_empty()).then(|| next_steps.to_string()),
        }
    }
}

/// One history card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryCard {
    /// Record id, used to re-open the entry.
    pub id: String,
    /// Backend-relative image path.
    pub image_url: String,
    /// `N objects`.
    pub object_count_label: String,
    /// Display timestamp.
    pub timestamp_label: String,
    /// Phase label, `Unknown` when absent.
    pub phase_label: String,
    /// First labels plus `+N more`.
    pub preview: ObjectPreview,
}

impl HistoryCard {
    fn new(record: &AnalysisRecord) -> Self {
        Self {
            id: record.id.clone(),
            image_url: record.image_url.clone(),
            object_count_label: object_count_label(record.detected_objects.len()),
            timestamp_label: display_timestamp(&record.timestamp),
            phase_label: phase_label(record.task_phase.as_deref(), UNKNOWN_PHASE_SHORT),
            preview: object_preview(&record.detected_objects, HISTORY_OBJECT_PREVIEW),
        }
    }
}
