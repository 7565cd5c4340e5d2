//! Notification classifier benchmarks.
//!
//! Measures the per-notification cost on the dispatch worker for the
//! message shapes Moonraker sends most often.
//!
//! Run with: cargo bench --bench classifier
//! Results saved to: target/criterion/

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use moonraker_bridge::{Notification, classify};
use serde_json::json;

// ============================================================================
// Fixtures
// ============================================================================

fn fixtures() -> Vec<(&'static str, Notification)> {
    vec![
        (
            "progress_only",
            Notification::new(
                "notify_status_update",
                json!([{ "virtual_sdcard": { "progress": 0.42, "file_position": 123_456 } }, 5012.3]),
            ),
        ),
        (
            "resume_with_progress",
            Notification::new(
                "notify_status_update",
                json!([{
                    "print_stats": { "state": "printing", "print_duration": 812.4 },
                    "virtual_sdcard": { "progress": 0.5 }
                }, 5013.1]),
            ),
        ),
        (
            "history_added",
            Notification::new(
                "notify_history_changed",
                json!([{ "action": "added", "job": { "filename": "benchy.gcode", "status": "in_progress" } }]),
            ),
        ),
        (
            "unrelated",
            Notification::new("notify_proc_stat_update", json!([{ "cpu_temp": 48.2 }])),
        ),
    ]
}

// ============================================================================
// Benchmark: Classification
// ============================================================================

fn bench_classify(c: &mut Criterion) {
    let mut group = c.benchmark_group("classify");

    for (name, notification) in fixtures() {
        group.bench_with_input(BenchmarkId::from_parameter(name), &notification, |b, n| {
            b.iter(|| classify(black_box(n)));
        });
    }

    group.finish();
}

// ============================================================================
// Benchmark: Frame Decode + Classification
// ============================================================================

fn bench_decode_and_classify(c: &mut Criterion) {
    let frame = json!({
        "jsonrpc": "2.0",
        "method": "notify_status_update",
        "params": [{
            "print_stats": { "state": "paused" },
            "virtual_sdcard": { "progress": 0.73 }
        }, 6001.9]
    })
    .to_string();

    c.bench_function("decode_and_classify", |b| {
        b.iter(|| {
            let notification: Notification = serde_json::from_str(black_box(&frame)).ok()?;
            classify(&notification).ok()
        });
    });
}

criterion_group!(benches, bench_classify, bench_decode_and_classify);
criterion_main!(benches);
