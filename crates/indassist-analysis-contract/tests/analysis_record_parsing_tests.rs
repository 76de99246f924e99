//! Integration tests for analysis record acceptance and display values.

use indassist_analysis_contract::{
    AnalysisContractError, detection_badges, display_timestamp, parse_analysis_record,
};

const RECORD: &str = r#"{
    "id": "9b1f3c2e-5d4a-4f7e-9a1b-2c3d4e5f6a7b",
    "timestamp": "2024-05-01T10:20:30.123456",
    "detected_objects": ["wrench", "safety goggles", "bolt"],
    "confidence_scores": [0.874, 0.5, 0.05],
    "task_phase": "tool_preparation",
    "expert_analysis": "Tools are staged.",
    "safety_assessment": "Goggles present.",
    "next_steps": "Tighten bolt.",
    "image_url": "/static/9b1f3c2e.jpg"
}"#;

#[test]
fn analysis_record_parsing_tests_accepts_backend_record() {
    let record = parse_analysis_record(RECORD.as_bytes()).expect("record should parse");
    assert_eq!(record.detected_objects.len(), 3);
    assert_eq!(record.task_phase.as_deref(), Some("tool_preparation"));

    let badges: Vec<String> = detection_badges(&record, None)
        .iter()
        .map(|badge| badge.text())
        .collect();
    assert_eq!(badges, vec!["wrench (87%)", "safety goggles (50%)", "bolt (5%)"]);
}

#[test]
fn analysis_record_parsing_tests_threshold_hides_low_confidence_badges() {
    let record = parse_analysis_record(RECORD.as_bytes()).expect("record should parse");
    let badges = detection_badges(&record, Some(40));
    assert_eq!(badges.len(), 2);
    assert_eq!(badges[1].label, "safety goggles");
}

#[test]
fn analysis_record_parsing_tests_rejects_misaligned_scores() {
    let raw = r#"{"id":"a","timestamp":"t","detected_objects":["x","y"],
        "confidence_scores":[0.9],"image_url":"/static/a.jpg"}"#;
    assert!(matches!(
        parse_analysis_record(raw.as_bytes()),
        Err(AnalysisContractError::InvalidContract(_))
    ));
}

#[test]
fn analysis_record_parsing_tests_rejects_blank_id() {
    let raw = r#"{"id":" ","timestamp":"t","image_url":"/static/a.jpg"}"#;
    assert!(matches!(
        parse_analysis_record(raw.as_bytes()),
        Err(AnalysisContractError::InvalidContract(_))
    ));
}

#[test]
fn analysis_record_parsing_tests_rejects_non_json_body() {
    assert!(matches!(
        parse_analysis_record(b"<html>Internal Server Error</html>"),
        Err(AnalysisContractError::Decode(_))
    ));
}

#[test]
fn analysis_record_parsing_tests_minimal_record_defaults_optional_fields() {
    let raw = r#"{"id":"abc","timestamp":"t","image_url":"/static/a.jpg"}"#;
    let record = parse_analysis_record(raw.as_bytes()).expect("minimal record should parse");
    assert!(record.detected_objects.is_empty());
    assert!(record.task_phase.is_none());
    assert!(record.next_steps.is_empty());
}

#[test]
fn analysis_record_parsing_tests_formats_timestamps() {
    assert_eq!(
        display_timestamp("2024-05-01T10:20:30.123456"),
        "2024-05-01 10:20:30"
    );
    assert_eq!(
        display_timestamp("2024-05-01T10:20:30Z"),
        "2024-05-01 10:20:30 UTC"
    );
    assert_eq!(
        display_timestamp("2024-05-01T10:20:30+02:00"),
        "2024-05-01 10:20:30 +02:00"
    );
    assert_eq!(display_timestamp("yesterday"), "yesterday");
}
