//! Performance benchmarks for the SDR gateway
//!
//! Run with: cargo bench
//! Or for specific benchmarks: cargo bench -- <filter>

use bytes::Bytes;
use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use std::time::Duration;

use sdr_gateway::handlers::relay::messages::InboundFrame;
use sdr_gateway::session::IntentDetector;
use sdr_gateway::session::audio::rechunk;

/// Benchmark inbound frame parsing
fn bench_frame_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame_parsing");
    group.measurement_time(Duration::from_secs(5));

    let setup = r#"{"type":"setup","callSid":"CA1234567890","from":"+15551234567"}"#;
    let prompt = format!(
        r#"{{"type":"prompt","voicePrompt":"{}"}}"#,
        "Tell me more about how this works for a mid-sized team. ".repeat(8)
    );

    group.throughput(Throughput::Bytes(setup.len() as u64));
    group.bench_with_input(BenchmarkId::new("setup", setup.len()), &setup, |b, msg| {
        b.iter(|| {
            let _ = InboundFrame::parse(black_box(msg));
        });
    });

    group.throughput(Throughput::Bytes(prompt.len() as u64));
    group.bench_with_input(
        BenchmarkId::new("prompt", prompt.len()),
        &prompt,
        |b, msg| {
            b.iter(|| {
                let _ = InboundFrame::parse(black_box(msg));
            });
        },
    );

    group.finish();
}

/// Benchmark intent detection over realistic utterances
fn bench_intent_detection(c: &mut Criterion) {
    let keywords: Vec<String> = ["schedule", "book", "meeting", "demo", "calendar"]
        .iter()
        .map(|k| k.to_string())
        .collect();
    let detector = IntentDetector::new(&keywords).expect("keywords compile");

    let miss = "I'm mostly curious what the pricing looks like for our call volume.";
    let hit = "That sounds good, can we schedule a demo with someone next week?";

    let mut group = c.benchmark_group("intent_detection");
    group.bench_function("miss", |b| {
        b.iter(|| detector.detect(black_box(miss)));
    });
    group.bench_function("hit", |b| {
        b.iter(|| detector.detect(black_box(hit)));
    });
    group.finish();
}

/// Benchmark playback re-chunking across clip sizes
fn bench_rechunk(c: &mut Criterion) {
    let mut group = c.benchmark_group("rechunk");

    for size in [16_000usize, 160_000, 1_600_000] {
        let clip = Bytes::from(vec![0u8; size]);
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &clip, |b, clip| {
            b.iter(|| rechunk(black_box(clip), 3200));
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_frame_parsing,
    bench_intent_detection,
    bench_rechunk
);
criterion_main!(benches);
