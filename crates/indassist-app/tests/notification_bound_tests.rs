//! Integration tests for notification bounds and expiry in a session.

mod common;

use common::{SETTLE_MS, ScriptedTransport, harness};
use indassist_notify::{MAX_VISIBLE, NOTIFICATION_TTL_MS};

#[test]
fn notification_bound_tests_burst_keeps_newest_five() {
    let mut harness = harness(ScriptedTransport::with(Vec::new()));

    for step in 0..8 {
        harness.session.press_capture(step);
    }

    assert_eq!(harness.session.notifications().len(), MAX_VISIBLE);
}

#[test]
fn notification_bound_tests_messages_expire_after_ttl() {
    let mut harness = harness(ScriptedTransport::with(Vec::new()));
    harness.session.tick(SETTLE_MS);
    assert_eq!(harness.session.notifications().len(), 1);

    harness.session.tick(SETTLE_MS + NOTIFICATION_TTL_MS - 1);
    assert_eq!(harness.session.notifications().len(), 1);
    harness.session.tick(SETTLE_MS + NOTIFICATION_TTL_MS);
    assert!(harness.session.notifications().is_empty());
}

#[test]
fn notification_bound_tests_dismiss_removes_early() {
    let mut harness = harness(ScriptedTransport::with(Vec::new()));
    harness.session.tick(SETTLE_MS);
    let id = harness.session.notifications().visible()[0].id;

    assert!(harness.session.dismiss_notification(id));
    assert!(!harness.session.dismiss_notification(id));
    assert!(harness.session.notifications().is_empty());
}
