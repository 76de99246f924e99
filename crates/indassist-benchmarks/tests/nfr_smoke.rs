//! Benchmark smoke test for capture encoding and notification churn.

use std::time::Instant;

use image::RgbImage;
use indassist_capture::{check_payload, encode_jpeg, normalize_frame};
use indassist_core::{AnalysisRequest, MIN_PLAUSIBLE_CAPTURE_LEN};
use indassist_notify::{MAX_VISIBLE, NotificationQueue};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

fn noise_frame(width: u32, height: u32, seed: u64) -> RgbImage {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut pixels = vec![0_u8; (width as usize) * (height as usize) * 3];
    rng.fill_bytes(&mut pixels);
    RgbImage::from_raw(width, height, pixels).expect("frame shape should match")
}

#[test]
fn benchmark_capture_encode_smoke_prints_latency() {
    let frames: Vec<RgbImage> = (0..5).map(|seed| noise_frame(1280, 720, seed)).collect();

    let start = Instant::now();
    let mut body_len = 0usize;
    for frame in frames {
        let frame = normalize_frame(frame, (640, 480));
        let image = encode_jpeg(&frame, 85).expect("frame should encode");
        check_payload(&image, MIN_PLAUSIBLE_CAPTURE_LEN).expect("payload should be plausible");
        body_len += AnalysisRequest::comprehensive(&image)
            .to_json_bytes()
            .expect("request should serialize")
            .len();
    }

    let elapsed_ms = start.elapsed().as_millis();
    println!("benchmark_capture_encode_elapsed_ms={elapsed_ms}");
    println!("benchmark_request_body_total_len={body_len}");

    // Lightweight guardrail; strict NFR checks are environment-specific.
    assert!(
        elapsed_ms < 10_000,
        "capture encode smoke benchmark should stay bounded"
    );
}

#[test]
fn benchmark_notification_burst_stays_bounded() {
    let mut queue = NotificationQueue::new();
    let start = Instant::now();

    for step in 0..10_000_u64 {
        queue.push(format!("notice {step}"), step);
        queue.expire(step);
        assert!(queue.len() <= MAX_VISIBLE);
    }

    let elapsed_ms = start.elapsed().as_millis();
    println!("benchmark_notification_burst_elapsed_ms={elapsed_ms}");
    assert_eq!(queue.messages().first().copied(), Some("notice 9999"));
    assert!(elapsed_ms < 5_000, "notification churn should stay bounded");
}
