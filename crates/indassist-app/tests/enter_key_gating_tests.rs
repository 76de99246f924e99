//! Integration tests for Enter-key capture gating.

mod common;

use common::{SETTLE_MS, ScriptedTransport, harness};
use indassist_app::messages;
use indassist_ui::View;

#[test]
fn enter_key_gating_tests_ignored_until_camera_ready() {
    let mut harness = harness(ScriptedTransport::with(Vec::new()));

    assert!(!harness.session.on_enter_key(10));
    assert_eq!(harness.session.state().camera.countdown, None);
    assert!(harness.session.notifications().messages().is_empty());

    harness.session.tick(SETTLE_MS);
    assert!(harness.session.on_enter_key(SETTLE_MS));
    assert_eq!(harness.session.state().camera.countdown, Some(3));
}

#[test]
fn enter_key_gating_tests_repeated_presses_keep_one_countdown() {
    let mut harness = harness(ScriptedTransport::with(Vec::new()));
    harness.session.tick(SETTLE_MS);

    assert!(harness.session.on_enter_key(SETTLE_MS));
    harness.session.tick(SETTLE_MS + 1_000);
    assert!(harness.session.on_enter_key(SETTLE_MS + 1_000));

    assert_eq!(harness.session.state().camera.countdown, Some(2));
    let started = harness
        .session
        .notifications()
        .messages()
        .into_iter()
        .filter(|message| *message == messages::COUNTDOWN_STARTED)
        .count();
    assert_eq!(started, 1);
}

#[test]
fn enter_key_gating_tests_ignored_outside_camera_view() {
    let mut harness = harness(ScriptedTransport::with(Vec::new()));
    harness.session.tick(SETTLE_MS);
    harness.session.switch_view(View::Upload, SETTLE_MS);

    assert!(!harness.session.on_enter_key(SETTLE_MS));
}

#[test]
fn enter_key_gating_tests_capture_button_before_ready_notifies() {
    let mut harness = harness(ScriptedTransport::with(Vec::new()));

    assert!(!harness.session.press_capture(10));
    assert!(
        harness
            .session
            .notifications()
            .messages()
            .contains(&messages::CAMERA_NOT_READY)
    );
}
