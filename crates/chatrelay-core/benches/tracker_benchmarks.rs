//! Latency benchmarks for the delta tracker hot path
//!
//! The tracker sits on every streamed token, so write_delta must stay in
//! the tens-of-nanoseconds range for a single open block.
//!
//! Run with: cargo bench -p chatrelay-core

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use chatrelay_core::{BlockKind, DeltaTracker};

/// Benchmark write_delta across block-count shapes
fn benchmark_write_delta(c: &mut Criterion) {
    let shapes = vec![("single_block", 1usize), ("four_blocks", 4), ("many_blocks", 16)];

    let mut group = c.benchmark_group("DeltaTracker_write_delta");
    group.significance_level(0.05);
    group.sample_size(100);

    for (name, block_count) in shapes {
        group.bench_with_input(
            BenchmarkId::new("write", name),
            &block_count,
            |b, &block_count| {
                b.iter(|| {
                    let mut tracker = DeltaTracker::new(BlockKind::Text);
                    for round in 0..64 {
                        let id = format!("b{}", round % block_count);
                        black_box(tracker.write_delta(&id, "token "));
                    }
                    tracker.finish_all()
                });
            },
        );
    }

    group.finish();
}

/// Benchmark finish_all with a large set of open blocks
fn benchmark_finish_all(c: &mut Criterion) {
    c.bench_function("DeltaTracker_finish_all_64_open", |b| {
        b.iter(|| {
            let mut tracker = DeltaTracker::new(BlockKind::Text);
            for i in 0..64 {
                tracker.write_delta(&format!("b{i}"), "x");
            }
            black_box(tracker.finish_all())
        });
    });
}

criterion_group!(benches, benchmark_write_delta, benchmark_finish_all);
criterion_main!(benches);
