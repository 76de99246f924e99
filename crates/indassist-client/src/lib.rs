#![warn(missing_docs)]
//! # indassist-client
//!
//! ## Purpose
//! Sends encoded images to the analysis service and returns validated records.
//!
//! ## Responsibilities
//! - Abstract HTTP through [`AnalysisTransport`] so tests run without a network.
//! - Enforce single flight: at most one analysis is pending per client.
//! - Apply a per-request timeout and honour cancellation tokens.
//! - Run analyses on a named worker thread polled by the caller.
//! - Check service status and fetch analyzed images.
//!
//! ## Data flow
//! [`indassist_core::EncodedImage`] -> [`indassist_core::AnalysisRequest`] ->
//! `POST /analyze/image` -> 2xx body -> [`indassist_analysis_contract`] ->
//! [`indassist_core::AnalysisRecord`].
//!
//! ## Ownership and lifetimes
//! The in-flight flag is shared between clones and guarded by an RAII permit;
//! the permit is released on every exit path including panics in the worker.
//!
//! ## Error model
//! All failures are [`ClientError`] values; [`classify_client_error`] groups
//! them into user-facing [`FailureKind`] categories.
//!
//! ## Security and privacy notes
//! Request bodies contain image payloads and are never logged; diagnostics
//! carry only the payload summary and the response status.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use indassist_analysis_contract::{AnalysisContractError, parse_analysis_record};
use indassist_core::{
    ANALYZE_PATH, AnalysisRecord, AnalysisRequest, CoreError, EncodedImage, STATUS_PATH,
    ServiceConfig, SystemStatus,
};
use reqwest::header::CONTENT_TYPE;
use thiserror::Error;
use url::Url;

/// Name of the background analysis thread.
pub const ANALYSIS_THREAD_NAME: &str = "indassist-analysis";

/// Raw response returned by a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body bytes.
    pub body: Vec<u8>,
}

impl TransportResponse {
    /// Returns `true` for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Transport-level failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// No response within the timeout.
    #[error("request timed out")]
    TimedOut,
    /// Connection or protocol failure.
    #[error("transport failure: {0}")]
    Failed(String),
}

/// HTTP abstraction used by the client.
pub trait AnalysisTransport: Send + Sync {
    /// Sends a JSON `POST`.
    ///
    /// # Errors
    /// Returns [`TransportError`] when no HTTP response is obtained.
    fn post_json(
        &self,
        url: &Url,
        body: &[u8],
        timeout: Duration,
    ) -> Result<TransportResponse, TransportError>;

    /// Sends a `GET`.
    ///
    /// # Errors
    /// Returns [`TransportError`] when no HTTP response is obtained.
    fn get(&self, url: &Url, timeout: Duration) -> Result<TransportResponse, TransportError>;
}

/// Blocking `reqwest` transport.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    /// Builds the underlying HTTP client.
    ///
    /// # Errors
    /// Returns [`ClientError::Transport`] when the client cannot be built.
    pub fn new() -> Result<Self, ClientError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("indassist/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|error| ClientError::Transport(format!("http client init failed: {error}")))?;
        Ok(Self { client })
    }

    fn finish(
        request: reqwest::blocking::RequestBuilder,
    ) -> Result<TransportResponse, TransportError> {
        let response = request.send().map_err(map_reqwest_error)?;
        let status = response.status().as_u16();
        let body = response.bytes().map_err(map_reqwest_error)?.to_vec();
        Ok(TransportResponse { status, body })
    }
}

impl AnalysisTransport for HttpTransport {
    fn post_json(
        &self,
        url: &Url,
        body: &[u8],
        timeout: Duration,
    ) -> Result<TransportResponse, TransportError> {
        Self::finish(
            self.client
                .post(url.clone())
                .header(CONTENT_TYPE, "application/json")
                .body(body.to_vec())
                .timeout(timeout),
        )
    }

    fn get(&self, url: &Url, timeout: Duration) -> Result<TransportResponse, TransportError> {
        Self::finish(self.client.get(url.clone()).timeout(timeout))
    }
}

fn map_reqwest_error(error: reqwest::Error) -> TransportError {
    if error.is_timeout() {
        TransportError::TimedOut
    } else {
        TransportError::Failed(error.to_string())
    }
}

/// Cooperative cancellation flag shared with a pending analysis.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Creates an uncancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Returns `true` once cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Holds the in-flight flag; clearing happens on drop.
#[derive(Debug)]
struct FlightPermit {
    flag: Arc<AtomicBool>,
}

impl FlightPermit {
    fn acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| Self {
                flag: Arc::clone(flag),
            })
    }
}

impl Drop for FlightPermit {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// Analysis running on the worker thread.
///
/// The worker owns the single-flight slot and frees it only when its request
/// returns, so dropping or cancelling this handle never lets a second request
/// start early. A result that arrives after the handle is gone is discarded.
#[derive(Debug)]
pub struct PendingAnalysis {
    receiver: Receiver<Result<AnalysisRecord, ClientError>>,
    token: CancellationToken,
    worker: Option<JoinHandle<()>>,
}

impl PendingAnalysis {
    /// Polls for the result without blocking.
    ///
    /// The single-flight slot is free once a result is returned.
    pub fn try_finish(&mut self) -> Option<Result<AnalysisRecord, ClientError>> {
        let outcome = match self.receiver.try_recv() {
            Ok(result) => result,
            Err(TryRecvError::Empty) => return None,
            Err(TryRecvError::Disconnected) => Err(ClientError::Transport(
                "analysis worker exited without a result".to_string(),
            )),
        };

        if let Some(worker) = self.worker.take() {
            // The worker has sent its result; joining waits for the slot release.
            let _ = worker.join();
        }
        Some(outcome)
    }

    /// Requests cancellation of the running analysis.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Token observed by the worker.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}

/// Analysis service client.
#[derive(Clone)]
pub struct AnalysisClient {
    config: ServiceConfig,
    transport: Arc<dyn AnalysisTransport>,
    in_flight: Arc<AtomicBool>,
}

impl AnalysisClient {
    /// Creates a client over an explicit transport.
    pub fn new(config: ServiceConfig, transport: Arc<dyn AnalysisTransport>) -> Self {
        Self {
            config,
            transport,
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Creates a client over [`HttpTransport`].
    ///
    /// # Errors
    /// Returns [`ClientError::Transport`] when the HTTP client cannot be built.
    pub fn with_http(config: ServiceConfig) -> Result<Self, ClientError> {
        Ok(Self::new(config, Arc::new(HttpTransport::new()?)))
    }

    /// Configuration used for every request.
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Returns `true` while an analysis holds the single-flight slot.
    pub fn is_analyzing(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Runs one analysis on the calling thread.
    ///
    /// # Errors
    /// Returns [`ClientError::AlreadyAnalyzing`] without sending anything when
    /// another analysis is pending, and the request failure otherwise.
    pub fn analyze(
        &self,
        image: &EncodedImage,
        token: &CancellationToken,
    ) -> Result<AnalysisRecord, ClientError> {
        let _permit = self.acquire()?;
        self.execute(image, token)
    }

    /// Starts one analysis on the worker thread.
    ///
    /// # Errors
    /// Returns [`ClientError::AlreadyAnalyzing`] when another analysis is
    /// pending and [`ClientError::Transport`] when the thread cannot start.
    pub fn spawn_analysis(&self, image: EncodedImage) -> Result<PendingAnalysis, ClientError> {
        let permit = self.acquire()?;
        let token = CancellationToken::new();
        let (sender, receiver) = mpsc::channel();

        let client = self.clone();
        let worker_token = token.clone();
        let worker = thread::Builder::new()
            .name(ANALYSIS_THREAD_NAME.to_string())
            .spawn(move || {
                let result = client.execute(&image, &worker_token);
                // The receiver is gone when the analysis was abandoned.
                let _ = sender.send(result);
                drop(permit);
            })
            .map_err(|error| {
                ClientError::Transport(format!("failed to spawn analysis worker: {error}"))
            })?;

        Ok(PendingAnalysis {
            receiver,
            token,
            worker: Some(worker),
        })
    }

    fn acquire(&self) -> Result<FlightPermit, ClientError> {
        FlightPermit::acquire(&self.in_flight).ok_or_else(|| {
            self.config.log_warn("analysis", "rejected", "analysis already in progress");
            ClientError::AlreadyAnalyzing
        })
    }

    fn execute(
        &self,
        image: &EncodedImage,
        token: &CancellationToken,
    ) -> Result<AnalysisRecord, ClientError> {
        if token.is_cancelled() {
            return Err(ClientError::Cancelled);
        }

        let url = self.config.endpoint(ANALYZE_PATH)?;
        let body = AnalysisRequest::comprehensive(image).to_json_bytes()?;
        self.config.log_info(
            "analysis",
            "request",
            &format!("POST {url} {}", image.summary()),
        );

        let response = self
            .transport
            .post_json(&url, &body, self.config.request_timeout);

        if token.is_cancelled() {
            self.config.log_info("analysis", "cancelled", "result discarded");
            return Err(ClientError::Cancelled);
        }

        let response = response.map_err(|error| {
            self.config.log_error("analysis", "transport_failed", &error.to_string());
            ClientError::from(error)
        })?;

        if !response.is_success() {
            self.config.log_error(
                "analysis",
                "server_error",
                &format!("status={}", response.status),
            );
            return Err(ClientError::Server(response.status));
        }

        let record = parse_analysis_record(&response.body).map_err(|error| {
            self.config.log_error("analysis", "parse_failed", &error.to_string());
            ClientError::Contract(error)
        })?;

        self.config.log_info(
            "analysis",
            "complete",
            &format!(
                "id={} objects={}",
                record.id,
                record.detected_objects.len()
            ),
        );
        Ok(record)
    }

    /// Queries `GET /`.
    ///
    /// # Returns
    /// `Ok(None)` when the service answered but the body was not a status
    /// document.
    ///
    /// # Errors
    /// Returns transport and non-2xx failures. Every outcome is logged.
    pub fn check_status(&self) -> Result<Option<SystemStatus>, ClientError> {
        let url = self.config.endpoint(STATUS_PATH)?;
        let response = self
            .transport
            .get(&url, self.config.request_timeout)
            .map_err(|error| {
                self.config.log_warn("status", "unreachable", &error.to_string());
                ClientError::from(error)
            })?;

        if !response.is_success() {
            self.config.log_warn(
                "status",
                "unhealthy",
                &format!("status={}", response.status),
            );
            return Err(ClientError::Server(response.status));
        }

        match serde_json::from_slice::<SystemStatus>(&response.body) {
            Ok(status) => {
                self.config.log_info("status", "reachable", &status.summary());
                Ok(Some(status))
            }
            Err(error) => {
                self.config.log_warn("status", "unparseable", &error.to_string());
                Ok(None)
            }
        }
    }

    /// Runs [`Self::check_status`] on a background thread.
    ///
    /// # Errors
    /// Returns [`ClientError::Transport`] when the thread cannot start.
    pub fn spawn_status_check(&self) -> Result<JoinHandle<Option<SystemStatus>>, ClientError> {
        let client = self.clone();
        thread::Builder::new()
            .name("indassist-status".to_string())
            .spawn(move || client.check_status().ok().flatten())
            .map_err(|error| {
                ClientError::Transport(format!("failed to spawn status check: {error}"))
            })
    }

    /// Downloads an analyzed image by its backend-relative path.
    ///
    /// # Errors
    /// Returns transport failures and [`ClientError::Server`] for non-2xx.
    pub fn fetch_image(&self, image_url: &str) -> Result<Vec<u8>, ClientError> {
        let url = self.config.endpoint(image_url)?;
        let response = self.transport.get(&url, self.config.request_timeout)?;
        if !response.is_success() {
            self.config.log_warn(
                "image",
                "fetch_failed",
                &format!("{url} status={}", response.status),
            );
            return Err(ClientError::Server(response.status));
        }
        Ok(response.body)
    }
}

/// User-facing grouping of client failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Another analysis is pending.
    Busy,
    /// Request exceeded its timeout.
    TimedOut,
    /// Request was cancelled by the user.
    Cancelled,
    /// Service unreachable, failing, or returning an unusable body.
    Unavailable,
}

/// Maps a client error onto its user-facing failure kind.
pub fn classify_client_error(error: &ClientError) -> FailureKind {
    match error {
        ClientError::AlreadyAnalyzing => FailureKind::Busy,
        ClientError::TimedOut => FailureKind::TimedOut,
        ClientError::Cancelled => FailureKind::Cancelled,
        ClientError::Transport(_)
        | ClientError::Server(_)
        | ClientError::Contract(_)
        | ClientError::Core(_) => FailureKind::Unavailable,
    }
}

/// Analysis client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Another analysis is pending; no request was sent.
    #[error("analysis already in progress")]
    AlreadyAnalyzing,
    /// Request exceeded its timeout.
    #[error("analysis request timed out")]
    TimedOut,
    /// Request was cancelled.
    #[error("analysis cancelled")]
    Cancelled,
    /// Connection or protocol failure.
    #[error("transport failure: {0}")]
    Transport(String),
    /// Service answered with a non-2xx status.
    #[error("server returned status {0}")]
    Server(u16),
    /// Body was not a valid analysis record.
    #[error("contract failure: {0}")]
    Contract(#[from] AnalysisContractError),
    /// Request construction failure.
    #[error("request construction failure: {0}")]
    Core(#[from] CoreError),
}

impl From<TransportError> for ClientError {
    fn from(error: TransportError) -> Self {
        match error {
            TransportError::TimedOut => Self::TimedOut,
            TransportError::Failed(detail) => Self::Transport(detail),
        }
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for the single-flight permit and failure classification.

    use super::*;

    #[test]
    fn permit_is_exclusive_and_released_on_drop() {
        let flag = Arc::new(AtomicBool::new(false));
        let permit = FlightPermit::acquire(&flag).expect("first permit");
        assert!(FlightPermit::acquire(&flag).is_none());
        drop(permit);
        assert!(FlightPermit::acquire(&flag).is_some());
    }

    #[test]
    fn cancellation_is_shared_between_clones() {
        let token = CancellationToken::new();
        let observer = token.clone();
        token.cancel();
        assert!(observer.is_cancelled());
    }

    #[test]
    fn classifies_failure_kinds() {
        assert_eq!(
            classify_client_error(&ClientError::AlreadyAnalyzing),
            FailureKind::Busy
        );
        assert_eq!(
            classify_client_error(&ClientError::from(TransportError::TimedOut)),
            FailureKind::TimedOut
        );
        assert_eq!(
            classify_client_error(&ClientError::Cancelled),
            FailureKind::Cancelled
        );
        assert_eq!(
            classify_client_error(&ClientError::Server(500)),
            FailureKind::Unavailable
        );
    }
}
