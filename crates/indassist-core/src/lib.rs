#![warn(missing_docs)]
//! # indassist-core
//!
//! ## Purpose
//! Defines the pure data model and shared runtime plumbing used across the
//! `indassist` workspace.
//!
//! ## Responsibilities
//! - Represent encoded images exactly as they travel to the analysis service.
//! - Represent analysis requests, analysis records and status check payloads.
//! - Carry the explicit service configuration (base address, timeout, logger).
//! - Define the diagnostic sink used instead of ad-hoc console logging.
//!
//! ## Data flow
//! Capture and upload code produce [`EncodedImage`] values.
//! The analysis client wraps them in [`AnalysisRequest`], sends them to the
//! endpoint resolved from [`ServiceConfig`], and receives [`AnalysisRecord`]
//! values that the UI state stores.
//!
//! ## Ownership and lifetimes
//! Images and records own their strings so they can move between the UI thread
//! and analysis worker threads without borrowing from transient buffers.
//!
//! ## Error model
//! Validation and codec failures return [`CoreError`] variants.
//!
//! ## Security and privacy notes
//! Encoded image payloads are never written to diagnostics; use
//! [`EncodedImage::summary`] when an image needs to appear in a log line.
//!
//! ## Example
//! ```rust
//! use indassist_core::{AnalysisRequest, EncodedImage, ANALYSIS_TYPE_COMPREHENSIVE};
//!
//! let image = EncodedImage::from_bytes("image/png", &[1, 2, 3]).unwrap();
//! assert!(image.as_data_url().starts_with("data:image/png;base64,"));
//! let request = AnalysisRequest::comprehensive(&image);
//! assert_eq!(request.analysis_type, ANALYSIS_TYPE_COMPREHENSIVE);
//! ```

use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Analysis mode tag sent with every request.
pub const ANALYSIS_TYPE_COMPREHENSIVE: &str = "comprehensive";

/// Path of the analysis endpoint relative to the backend base address.
pub const ANALYZE_PATH: &str = "/analyze/image";

/// Path of the status check relative to the backend base address.
pub const STATUS_PATH: &str = "/";

/// Backend origin used when no configuration overrides it.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Default upper bound for one analysis round trip.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Encoded payloads at or below this many characters are treated as blank or
/// corrupt captures.
pub const MIN_PLAUSIBLE_CAPTURE_LEN: usize = 1_000;

/// Image encoded as a `data:<mime>;base64,<payload>` URL.
#[derive(Clone, PartialEq, Eq)]
pub struct EncodedImage {
    mime_type: String,
    data_url: String,
}

impl EncodedImage {
    /// Encodes raw image file bytes into a data URL.
    ///
    /// # Errors
    /// Returns [`CoreError::EmptyImage`] for empty input and
    /// [`CoreError::InvalidMimeType`] when `mime_type` is not an `image/*` type.
    pub fn from_bytes(mime_type: impl Into<String>, bytes: &[u8]) -> Result<Self, CoreError> {
        let mime_type = mime_type.into();
        validate_image_mime(&mime_type)?;
        if bytes.is_empty() {
            return Err(CoreError::EmptyImage);
        }

        let data_url = format!("data:{mime_type};base64,{}", STANDARD.encode(bytes));
        Ok(Self {
            mime_type,
            data_url,
        })
    }

    /// Parses an existing data URL.
    ///
    /// # Errors
    /// Returns [`CoreError::InvalidDataUrl`] when the `data:` prefix, the
    /// `;base64,` marker, or the payload is missing.
    pub fn parse_data_url(raw: &str) -> Result<Self, CoreError> {
        let rest = raw
            .strip_prefix("data:")
            .ok_or_else(|| CoreError::InvalidDataUrl("missing data: prefix".to_string()))?;
        let (mime_type, payload) = rest
            .split_once(";base64,")
            .ok_or_else(|| CoreError::InvalidDataUrl("missing ;base64, marker".to_string()))?;
        validate_image_mime(mime_type)?;
        if payload.is_empty() {
            return Err(CoreError::EmptyImage);
        }

        Ok(Self {
            mime_type: mime_type.to_string(),
            data_url: raw.to_string(),
        })
    }

    /// Returns the MIME type embedded in the data URL.
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// Returns the complete data URL.
    pub fn as_data_url(&self) -> &str {
        &self.data_url
    }

    /// Returns the data URL length in characters.
    pub fn len(&self) -> usize {
        // Data URLs are pure ASCII, so bytes and characters coincide.
        self.data_url.len()
    }

    /// Returns `true` when the data URL is empty (never the case for values
    /// built through the constructors).
    pub fn is_empty(&self) -> bool {
        self.data_url.is_empty()
    }

    /// Returns `true` when the payload is long enough to plausibly hold a real frame.
    pub fn is_plausible_capture(&self) -> bool {
        self.len() > MIN_PLAUSIBLE_CAPTURE_LEN
    }

    /// Decodes the base64 payload back into raw file bytes.
    ///
    /// # Errors
    /// Returns [`CoreError::Base64`] when the payload is not valid base64.
    pub fn decode_payload(&self) -> Result<Vec<u8>, CoreError> {
        let payload = self
            .data_url
            .split_once(";base64,")
            .map(|(_, payload)| payload)
            .unwrap_or_default();
        Ok(STANDARD.decode(payload)?)
    }

    /// Log-safe description: MIME type and length, never the payload.
    pub fn summary(&self) -> String {
        format!("mime={} chars={}", self.mime_type, self.len())
    }
}

impl fmt::Debug for EncodedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncodedImage")
            .field("mime_type", &self.mime_type)
            .field("len", &self.len())
            .finish()
    }
}

fn validate_image_mime(mime_type: &str) -> Result<(), CoreError> {
    match mime_type.strip_prefix("image/") {
        Some(subtype) if !subtype.trim().is_empty() => Ok(()),
        _ => Err(CoreError::InvalidMimeType(mime_type.to_string())),
    }
}

/// Body of `POST /analyze/image`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    /// Encoded image as a data URL.
    pub image_base64: String,
    /// Analysis mode tag; always [`ANALYSIS_TYPE_COMPREHENSIVE`].
    pub analysis_type: String,
}

impl AnalysisRequest {
    /// Builds the only request shape the client sends.
    pub fn comprehensive(image: &EncodedImage) -> Self {
        Self {
            image_base64: image.as_data_url().to_string(),
            analysis_type: ANALYSIS_TYPE_COMPREHENSIVE.to_string(),
        }
    }

    /// Serializes the request to compact JSON bytes.
    ///
    /// # Errors
    /// Returns [`CoreError::Codec`] when JSON serialization fails.
    pub fn to_json_bytes(&self) -> Result<Vec<u8>, CoreError> {
        serde_json::to_vec(self).map_err(CoreError::Codec)
    }
}

/// Result of one backend image analysis.
///
/// Records are immutable after deserialization; UI state clones them into the
/// current slot and the history list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    /// Opaque identifier assigned by the backend.
    pub id: String,
    /// ISO-8601 production time as emitted by the backend.
    pub timestamp: String,
    /// Detected object labels.
    #[serde(default)]
    pub detected_objects: Vec<String>,
    /// Confidence per detected object, index-aligned with `detected_objects`.
    #[serde(default)]
    pub confidence_scores: Vec<f64>,
    /// Task phase label such as `tool_preparation`.
    #[serde(default)]
    pub task_phase: Option<String>,
    /// Expert narrative.
    #[serde(default)]
    pub expert_analysis: String,
    /// Safety narrative.
    #[serde(default)]
    pub safety_assessment: String,
    /// Suggested next steps.
    #[serde(default)]
    pub next_steps: String,
    /// Path of the annotated image relative to the backend base address.
    pub image_url: String,
}

impl AnalysisRecord {
    /// Returns `true` when labels and scores have the same length.
    pub fn is_aligned(&self) -> bool {
        self.detected_objects.len() == self.confidence_scores.len()
    }

    /// Iterates `(label, score)` pairs in detection order.
    pub fn detections(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.detected_objects
            .iter()
            .map(String::as_str)
            .zip(self.confidence_scores.iter().copied())
    }

    /// Deserializes a record from JSON bytes.
    ///
    /// # Errors
    /// Returns [`CoreError::Codec`] when JSON decoding fails.
    pub fn from_json_bytes(raw: &[u8]) -> Result<Self, CoreError> {
        serde_json::from_slice(raw).map_err(CoreError::Codec)
    }

    /// Serializes the record to JSON bytes.
    ///
    /// # Errors
    /// Returns [`CoreError::Codec`] when JSON serialization fails.
    pub fn to_json_bytes(&self) -> Result<Vec<u8>, CoreError> {
        serde_json::to_vec(self).map_err(CoreError::Codec)
    }
}

/// Body of the `GET /` status check. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemStatus {
    /// Overall service status string.
    pub status: Option<String>,
    /// Whether the detection model is loaded.
    pub owlvit_loaded: Option<bool>,
    /// Whether the affordance engine is initialized.
    pub affordance_engine: Option<bool>,
    /// Whether the narrative backend is connected.
    pub openai_connected: Option<bool>,
    /// Number of analyses performed by the service.
    pub total_analyses: Option<u64>,
}

impl SystemStatus {
    /// One-line description for diagnostics.
    pub fn summary(&self) -> String {
        format!(
            "status={} detector={} affordance={} narrative={} total_analyses={}",
            self.status.as_deref().unwrap_or("unknown"),
            flag(self.owlvit_loaded),
            flag(self.affordance_engine),
            flag(self.openai_connected),
            self.total_analyses
                .map_or_else(|| "unknown".to_string(), |count| count.to_string()),
        )
    }
}

fn flag(value: Option<bool>) -> &'static str {
    match value {
        Some(true) => "yes",
        Some(false) => "no",
        None => "unknown",
    }
}

/// Joins a backend-relative path onto the base address.
///
/// The base path is kept as a prefix, so `http://host/api` + `/static/a.jpg`
/// becomes `http://host/api/static/a.jpg`.
///
/// # Errors
/// Returns [`CoreError::InvalidEndpoint`] when the result does not parse.
pub fn resolve_endpoint(base_url: &Url, path: &str) -> Result<Url, CoreError> {
    let base = base_url.as_str().trim_end_matches('/');
    let joined = if path.starts_with('/') {
        format!("{base}{path}")
    } else {
        format!("{base}/{path}")
    };

    Url::parse(&joined).map_err(|error| CoreError::InvalidEndpoint(format!("{joined}: {error}")))
}

/// Severity of a diagnostic record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticLevel {
    /// Verbose tracing detail.
    Debug,
    /// Normal lifecycle event.
    Info,
    /// Recovered failure.
    Warn,
    /// Failure surfaced to the user.
    Error,
}

/// Destination for diagnostic records.
pub trait DiagnosticSink: Send + Sync {
    /// Records one `stage | action | detail` line.
    fn record(&self, level: DiagnosticLevel, stage: &str, action: &str, detail: &str);
}

/// Forwards diagnostics to `tracing` with `stage` and `action` fields.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn record(&self, level: DiagnosticLevel, stage: &str, action: &str, detail: &str) {
        match level {
            DiagnosticLevel::Debug => tracing::debug!(stage, action, "{detail}"),
            DiagnosticLevel::Info => tracing::info!(stage, action, "{detail}"),
            DiagnosticLevel::Warn => tracing::warn!(stage, action, "{detail}"),
            DiagnosticLevel::Error => tracing::error!(stage, action, "{detail}"),
        }
    }
}

/// One captured diagnostic line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticRecord {
    /// Record severity.
    pub level: DiagnosticLevel,
    /// Subsystem stage (for example `capture` or `analysis`).
    pub stage: String,
    /// Action within the stage.
    pub action: String,
    /// Free-form detail.
    pub detail: String,
}

/// In-memory sink for tests and diagnostics panels.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<DiagnosticRecord>>,
}

impl MemorySink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of all records so far.
    pub fn records(&self) -> Vec<DiagnosticRecord> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }

    /// Returns `true` when a record with the given stage and action exists.
    pub fn contains(&self, stage: &str, action: &str) -> bool {
        self.records()
            .iter()
            .any(|record| record.stage == stage && record.action == action)
    }
}

impl DiagnosticSink for MemorySink {
    fn record(&self, level: DiagnosticLevel, stage: &str, action: &str, detail: &str) {
        if let Ok(mut records) = self.records.lock() {
            records.push(DiagnosticRecord {
                level,
                stage: stage.to_string(),
                action: action.to_string(),
                detail: detail.to_string(),
            });
        }
    }
}

/// Explicit configuration shared by the analysis client and capture controller.
#[derive(Clone)]
pub struct ServiceConfig {
    /// Backend origin every request is resolved against.
    pub base_url: Url,
    /// Upper bound for one analysis round trip.
    pub request_timeout: Duration,
    /// Diagnostic destination.
    pub logger: Arc<dyn DiagnosticSink>,
}

impl ServiceConfig {
    /// Creates configuration with the default timeout and a [`TracingSink`].
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            logger: Arc::new(TracingSink),
        }
    }

    /// Parses and validates a base address.
    ///
    /// # Errors
    /// Returns [`CoreError::InvalidBaseUrl`] when the URL does not parse, is
    /// not `http`/`https`, or has no host.
    pub fn parse(base_url: &str) -> Result<Self, CoreError> {
        let parsed = Url::parse(base_url)
            .map_err(|error| CoreError::InvalidBaseUrl(format!("{base_url}: {error}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(CoreError::InvalidBaseUrl(format!(
                "{base_url}: scheme must be http or https"
            )));
        }
        if parsed.host_str().is_none() {
            return Err(CoreError::InvalidBaseUrl(format!("{base_url}: missing host")));
        }

        Ok(Self::new(parsed))
    }

    /// Replaces the diagnostic sink.
    pub fn with_logger(mut self, logger: Arc<dyn DiagnosticSink>) -> Self {
        self.logger = logger;
        self
    }

    /// Replaces the request timeout.
    pub fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    /// Resolves a path against the base address.
    ///
    /// # Errors
    /// Returns [`CoreError::InvalidEndpoint`] when the joined URL is invalid.
    pub fn endpoint(&self, path: &str) -> Result<Url, CoreError> {
        resolve_endpoint(&self.base_url, path)
    }

    /// Records an info line.
    pub fn log_info(&self, stage: &str, action: &str, detail: &str) {
        self.logger
            .record(DiagnosticLevel::Info, stage, action, detail);
    }

    /// Records a warning line.
    pub fn log_warn(&self, stage: &str, action: &str, detail: &str) {
        self.logger
            .record(DiagnosticLevel::Warn, stage, action, detail);
    }

    /// Records an error line.
    pub fn log_error(&self, stage: &str, action: &str, detail: &str) {
        self.logger
            .record(DiagnosticLevel::Error, stage, action, detail);
    }
}

impl fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("base_url", &self.base_url.as_str())
            .field("request_timeout", &self.request_timeout)
            .finish_non_exhaustive()
    }
}

/// Error type for core validation and codec failures.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Image payload is empty.
    #[error("image payload is empty")]
    EmptyImage,
    /// MIME type is not an image type.
    #[error("invalid image mime type: {0}")]
    InvalidMimeType(String),
    /// Data URL is malformed.
    #[error("invalid data url: {0}")]
    InvalidDataUrl(String),
    /// Backend base address is unusable.
    #[error("invalid base url: {0}")]
    InvalidBaseUrl(String),
    /// Resolved endpoint is not a valid URL.
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),
    /// JSON encoding/decoding error.
    #[error("payload codec failure: {0}")]
    Codec(#[from] serde_json::Error),
    /// Base64 decoding error.
    #[error("base64 decode failure: {0}")]
    Base64(#[from] base64::DecodeError),
}

#[cfg(test)]
mod tests {
    //! Unit tests for image encoding and endpoint resolution.

    use super::*;

    #[test]
    fn data_url_round_trips_payload() {
        let image = EncodedImage::from_bytes("image/jpeg", &[0xff, 0xd8, 0xff]).unwrap();
        let parsed = EncodedImage::parse_data_url(image.as_data_url()).unwrap();
        assert_eq!(parsed.mime_type(), "image/jpeg");
        assert_eq!(parsed.decode_payload().unwrap(), vec![0xff, 0xd8, 0xff]);
    }

    #[test]
    fn rejects_non_image_mime() {
        assert!(matches!(
            EncodedImage::from_bytes("text/plain", b"hello"),
            Err(CoreError::InvalidMimeType(_))
        ));
    }

    #[test]
    fn endpoint_keeps_base_path_prefix() {
        let base = Url::parse("http://backend.test/api/").unwrap();
        let url = resolve_endpoint(&base, "/static/a.jpg").unwrap();
        assert_eq!(url.as_str(), "http://backend.test/api/static/a.jpg");
    }

    #[test]
    fn service_config_rejects_non_http_scheme() {
        assert!(ServiceConfig::parse("ftp://backend.test").is_err());
        assert!(ServiceConfig::parse("http://localhost:8000").is_ok());
    }
}
