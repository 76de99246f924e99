//! Integration tests for unreadable uploads.

mod common;

use std::path::Path;

use common::{ScriptedTransport, harness, temp_file};
use indassist_app::messages;
use indassist_ui::View;

#[test]
fn upload_failure_flow_tests_undecodable_file_sends_nothing() {
    let transport = ScriptedTransport::with(Vec::new());
    let mut harness = harness(transport.clone());
    harness.session.switch_view(View::Upload, 0);
    let path = temp_file("undecodable", "notes.png", b"definitely not an image");

    harness.session.upload_file(&path, 0);

    let notices = harness.session.notifications().messages();
    assert!(notices.contains(&"Processing: notes.png"));
    assert!(notices.contains(&messages::FILE_READ_FAILED));
    assert!(!harness.session.state().analyzing);
    assert!(transport.posts().is_empty());
    assert!(harness.sink.contains("upload", "read_failed"));
}

#[test]
fn upload_failure_flow_tests_missing_file_reports_read_failure() {
    let transport = ScriptedTransport::with(Vec::new());
    let mut harness = harness(transport.clone());

    harness
        .session
        .upload_file(Path::new("/definitely/missing/photo.jpg"), 0);

    assert!(
        harness
            .session
            .notifications()
            .messages()
            .contains(&messages::FILE_READ_FAILED)
    );
    assert!(transport.posts().is_empty());
}
