//! User-facing notification and error texts.

/// Camera settled and capture is possible.
pub const CAMERA_READY: &str = "Camera ready";
/// Stream acquisition failed.
pub const CAMERA_ACCESS_FAILED: &str = "Camera access failed - Try uploading instead";
/// Error panel text when no stream could be acquired.
pub const CAMERA_UNAVAILABLE: &str = "Camera access denied or not available";
/// Error panel text when playback failed.
pub const STREAM_FAILED: &str = "Failed to start video stream";
/// Capture requested before readiness.
pub const CAMERA_NOT_READY: &str = "Camera not ready";
/// Countdown started.
pub const COUNTDOWN_STARTED: &str = "Photo in 3 seconds...";
/// Frame captured and handed to analysis.
pub const CAPTURE_SUCCEEDED: &str = "Image captured successfully";
/// Encoded frame too small to be real.
pub const CAPTURE_FAILED: &str = "Image capture failed - Try again";
/// Frame could not be obtained or encoded.
pub const CAPTURE_ERROR: &str = "Capture error - Try uploading instead";
/// Upload file unreadable or not an image.
pub const FILE_READ_FAILED: &str = "Failed to read file";
/// Analysis request sent.
pub const ANALYSIS_STARTING: &str = "Analysis starting...";
/// Analysis record received.
pub const ANALYSIS_COMPLETE: &str = "Analysis complete";
/// Transport or response failure.
pub const ANALYSIS_FAILED: &str = "Analysis failed: Server error";
/// Request exceeded its timeout.
pub const ANALYSIS_TIMED_OUT: &str = "Analysis failed: Request timed out";
/// User cancelled the pending analysis.
pub const ANALYSIS_CANCELLED: &str = "Analysis cancelled";
/// Another analysis is pending.
pub const ANALYSIS_BUSY: &str = "Analysis already in progress";

/// Progress text shown before an upload is decoded.
pub fn processing(file_name: &str) -> String {
    format!("Processing: {file_name}")
}
