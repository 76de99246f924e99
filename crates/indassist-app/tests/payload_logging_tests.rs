//! Integration tests for image payloads in session diagnostics.

mod common;

use common::{SETTLE_MS, ScriptedTransport, ready_harness, record_body, wait_for_analysis};

#[test]
fn payload_logging_tests_records_carry_summary_not_data_url() {
    let transport = ScriptedTransport::answering(200, record_body("logged"));
    let mut harness = ready_harness(transport.clone());

    harness.session.capture_now(SETTLE_MS);
    wait_for_analysis(&mut harness.session, SETTLE_MS);

    let records = harness.sink.records();
    let started = records
        .iter()
        .find(|record| record.stage == "analysis" && record.action == "started")
        .expect("analysis start should be logged");
    assert!(started.detail.starts_with("mime=image/jpeg chars="));
    assert!(
        records
            .iter()
            .all(|record| !record.detail.contains(";base64,"))
    );
    assert_eq!(transport.posts().len(), 1);
}
