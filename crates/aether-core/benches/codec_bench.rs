//! Criterion benchmarks for the Aether wire codecs.
//!
//! Measures frame encode/decode and OSC packet encoding for batch sizes seen
//! in practice: one message (a single fader), a few (both hands), and a full
//! 16-mapping setup.
//!
//! Run with:
//! ```bash
//! cargo bench --package aether-core --bench codec_bench
//! ```

use aether_core::{decode_frame, encode_frame, ControlMessage, OscPacket};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

// ── Fixtures ──────────────────────────────────────────────────────────────────

fn make_batch(n: usize) -> Vec<ControlMessage> {
    (0..n)
        .map(|i| {
            let hand = if i % 2 == 0 { "left" } else { "right" };
            ControlMessage::new(format!("/{hand}/{}/fader", i % 7), i as f32 / n as f32)
        })
        .collect()
}

const SIZES: [usize; 3] = [1, 4, 16];

// ── Benchmarks ────────────────────────────────────────────────────────────────

fn bench_encode_frame(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode_frame");
    for n in SIZES {
        let batch = make_batch(n);
        group.bench_with_input(BenchmarkId::new("messages", n), &batch, |b, batch| {
            b.iter(|| encode_frame(black_box(batch)).expect("encode must succeed"))
        });
    }
    group.finish();
}

fn bench_decode_frame(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_frame");
    for n in SIZES {
        let bytes = encode_frame(&make_batch(n)).expect("encode must succeed for benchmark setup");
        group.bench_with_input(BenchmarkId::new("messages", n), &bytes, |b, bytes| {
            b.iter(|| decode_frame(black_box(bytes)).expect("decode must succeed"))
        });
    }
    group.finish();
}

/// The bridge hot path: decode a frame and re-encode it as one OSC datagram.
fn bench_frame_to_osc(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame_to_osc");
    for n in SIZES {
        let bytes = encode_frame(&make_batch(n)).expect("encode must succeed for benchmark setup");
        group.bench_with_input(BenchmarkId::new("messages", n), &bytes, |b, bytes| {
            b.iter(|| {
                let messages = decode_frame(black_box(bytes)).unwrap();
                OscPacket::for_batch(messages).map(|p| p.encode().unwrap())
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_encode_frame, bench_decode_frame, bench_frame_to_osc);
criterion_main!(benches);
