#![warn(missing_docs)]
//! # indassist-analysis-contract
//!
//! ## Purpose
//! Defines how analysis service responses are accepted and how accepted
//! records are turned into display values.
//!
//! ## Responsibilities
//! - Parse and validate analysis records.
//! - Convert confidence scores into whole percentages.
//! - Produce phase labels, short ids, object previews and display timestamps.
//!
//! ## Data flow
//! Raw 2xx body -> [`parse_analysis_record`] -> UI state -> presentation
//! helpers in this crate -> rendered panels.
//!
//! ## Ownership and lifetimes
//! Parsing yields owned [`AnalysisRecord`] values; helpers borrow records and
//! return owned display strings.
//!
//! ## Error model
//! Invalid JSON or broken record invariants return [`AnalysisContractError`].
//!
//! ## Security and privacy notes
//! Records carry model output only. Error messages never echo the body.

use indassist_core::AnalysisRecord;
use thiserror::Error;
use time::format_description::well_known::{Iso8601, Rfc3339};
use time::{OffsetDateTime, PrimitiveDateTime, UtcOffset};

/// Phase label shown in the results panel when the record has none.
pub const UNKNOWN_PHASE: &str = "Unknown Phase";

/// Phase label shown on history cards when the record has none.
pub const UNKNOWN_PHASE_SHORT: &str = "Unknown";

/// Number of object labels shown on a history card.
pub const HISTORY_OBJECT_PREVIEW: usize = 3;

/// Number of id characters shown in the results panel.
pub const SHORT_ID_LEN: usize = 8;

/// Parses a 2xx response body into a validated record.
///
/// # Errors
/// Returns [`AnalysisContractError::Decode`] for invalid JSON and
/// [`AnalysisContractError::InvalidContract`] when the id is blank or labels
/// and scores are not index-aligned.
pub fn parse_analysis_record(raw: &[u8]) -> Result<AnalysisRecord, AnalysisContractError> {
    let record: AnalysisRecord = serde_json::from_slice(raw)?;
    validate_record(&record)?;
    Ok(record)
}

/// Checks record invariants.
///
/// # Errors
/// Returns [`AnalysisContractError::InvalidContract`] on the first violation.
pub fn validate_record(record: &AnalysisRecord) -> Result<(), AnalysisContractError> {
    if record.id.trim().is_empty() {
        return Err(AnalysisContractError::InvalidContract(
            "id is empty".to_string(),
        ));
    }

    if !record.is_aligned() {
        return Err(AnalysisContractError::InvalidContract(format!(
            "{} detected objects but {} confidence scores",
            record.detected_objects.len(),
            record.confidence_scores.len()
        )));
    }

    if record.confidence_scores.iter().any(|score| !score.is_finite()) {
        return Err(AnalysisContractError::InvalidContract(
            "confidence score is not finite".to_string(),
        ));
    }

    Ok(())
}

/// Converts a score in [0, 1] into a whole percentage clamped to [0, 100].
pub fn confidence_percent(score: f64) -> u8 {
    if !score.is_finite() {
        return 0;
    }
    (score * 100.0).round().clamp(0.0, 100.0) as u8
}

/// One detected object with its display percentage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectionBadge {
    /// Object label.
    pub label: String,
    /// Confidence as a whole percentage.
    pub percent: u8,
}

impl DetectionBadge {
    /// Badge text, for example `wrench (87%)`.
    pub fn text(&self) -> String {
        format!("{} ({}%)", self.label, self.percent)
    }
}

/// Builds badges in detection order.
///
/// When `min_percent` is set, badges below it are omitted.
pub fn detection_badges(record: &AnalysisRecord, min_percent: Option<u8>) -> Vec<DetectionBadge> {
    record
        .detections()
        .map(|(label, score)| DetectionBadge {
            label: label.to_string(),
            percent: confidence_percent(score),
        })
        .filter(|badge| min_percent.is_none_or(|floor| badge.percent >= floor))
        .collect()
}

/// Replaces underscores with spaces, or returns `fallback` for a blank phase.
pub fn phase_label(task_phase: Option<&str>, fallback: &str) -> String {
    match task_phase.map(str::trim) {
        Some(phase) if !phase.is_empty() => phase.replace('_', " "),
        _ => fallback.to_string(),
    }
}

/// First [`SHORT_ID_LEN`] characters of an id.
pub fn short_id(id: &str) -> &str {
    match id.char_indices().nth(SHORT_ID_LEN) {
        Some((end, _)) => &id[..end],
        None => id,
    }
}

/// Leading object labels plus the count of those left out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectPreview {
    /// Labels shown.
    pub shown: Vec<String>,
    /// Labels omitted.
    pub hidden: usize,
}

impl ObjectPreview {
    /// `+N more` when labels were omitted.
    pub fn more_label(&self) -> Option<String> {
        (self.hidden > 0).then(|| format!("+{} more", self.hidden))
    }
}

/// Takes the first `limit` labels.
pub fn object_preview(objects: &[String], limit: usize) -> ObjectPreview {
    ObjectPreview {
        shown: objects.iter().take(limit).cloned().collect(),
        hidden: objects.len().saturating_sub(limit),
    }
}

/// `N objects` summary for history cards.
pub fn object_count_label(count: usize) -> String {
    format!("{count} objects")
}

/// Formats a backend timestamp as `YYYY-MM-DD HH:MM:SS`.
///
/// Timestamps with an offset are shown in that offset followed by the offset
/// itself, or `UTC` for zero. Unparseable input is returned unchanged.
pub fn display_timestamp(raw: &str) -> String {
    if let Ok(moment) = OffsetDateTime::parse(raw, &Rfc3339) {
        return format!(
            "{} {}",
            wall_clock(moment.date(), moment.time()),
            offset_label(moment.offset())
        );
    }

    match PrimitiveDateTime::parse(raw, &Iso8601::DEFAULT) {
        Ok(moment) => wall_clock(moment.date(), moment.time()),
        Err(_) => raw.to_string(),
    }
}

fn wall_clock(date: time::Date, clock: time::Time) -> String {
    format!(
        "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
        date.year(),
        u8::from(date.month()),
        date.day(),
        clock.hour(),
        clock.minute(),
        clock.second()
    )
}

fn offset_label(offset: UtcOffset) -> String {
    if offset.is_utc() {
        return "UTC".to_string();
    }
    let (hours, minutes, _) = offset.as_hms();
    let sign = if offset.is_negative() { '-' } else { '+' };
    format!("{sign}{:02}:{:02}", hours.unsigned_abs(), minutes.unsigned_abs())
}

/// Analysis contract errors.
#[derive(Debug, Error)]
pub enum AnalysisContractError {
    /// JSON decode failure.
    #[error("analysis decode failure: {0}")]
    Decode(#[from] serde_json::Error),
    /// Parsed payload violates contract invariants.
    #[error("analysis contract violation: {0}")]
    InvalidContract(String),
}

#[cfg(test)]
mod tests {
    //! Unit tests for display projections.

    use super::*;

    #[test]
    fn percent_rounds_and_clamps() {
        assert_eq!(confidence_percent(0.874), 87);
        assert_eq!(confidence_percent(0.875), 88);
        assert_eq!(confidence_percent(1.3), 100);
        assert_eq!(confidence_percent(-0.2), 0);
        assert_eq!(confidence_percent(f64::NAN), 0);
    }

    #[test]
    fn phase_label_replaces_underscores() {
        assert_eq!(phase_label(Some("tool_preparation"), UNKNOWN_PHASE), "tool preparation");
        assert_eq!(phase_label(None, UNKNOWN_PHASE), "Unknown Phase");
        assert_eq!(phase_label(Some("  "), UNKNOWN_PHASE_SHORT), "Unknown");
    }

    #[test]
    fn short_id_handles_short_and_multibyte_ids() {
        assert_eq!(short_id("3f2a9c1d-77aa"), "3f2a9c1d");
        assert_eq!(short_id("abc"), "abc");
        assert_eq!(short_id("ééééééééé"), "éééééééé");
    }

    #[test]
    fn preview_counts_hidden_labels() {
        let objects: Vec<String> = ["a", "b", "c", "d", "e"].iter().map(|s| s.to_string()).collect();
        let preview = object_preview(&objects, HISTORY_OBJECT_PREVIEW);
        assert_eq!(preview.shown, vec!["a", "b", "c"]);
        assert_eq!(preview.more_label().as_deref(), Some("+2 more"));
        assert_eq!(object_preview(&objects[..2], 3).more_label(), None);
    }
}
