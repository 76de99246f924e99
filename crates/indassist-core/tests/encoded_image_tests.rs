//! Tests the capture plausibility guard on encoded images.

use indassist_core::{EncodedImage, MIN_PLAUSIBLE_CAPTURE_LEN};

#[test]
fn encoded_image_tests_short_payload_is_not_plausible() {
    let image = EncodedImage::from_bytes("image/jpeg", &[0; 16]).expect("image should encode");
    assert!(image.len() <= MIN_PLAUSIBLE_CAPTURE_LEN);
    assert!(!image.is_plausible_capture());
}

#[test]
fn encoded_image_tests_large_payload_is_plausible() {
    let image = EncodedImage::from_bytes("image/jpeg", &[7; 2_000]).expect("image should encode");
    assert!(image.is_plausible_capture());
    assert!(!image.summary().contains("base64"));
}

#[test]
fn encoded_image_tests_boundary_length_is_rejected() {
    // 23-char prefix + 976 base64 chars (732 bytes) = exactly 1000 chars.
    let image = EncodedImage::from_bytes("image/jpeg", &[1; 732]).expect("image should encode");
    assert_eq!(image.len(), MIN_PLAUSIBLE_CAPTURE_LEN);
    assert!(!image.is_plausible_capture());
}
