//! Code-object benchmarks (Criterion).
//!
//! Two suites, mirroring the two costs the harness isolates:
//!   - `codeobject/acquire` : bring a code object to life (direct compile
//!     with disassembly vs. compile-to-blob + unmarshal vs. unmarshal alone)
//!   - `codeobject/execute` : the `measure` loop itself, per runtime kind
//!
//! Environment knobs:
//!   CRIT_SAMPLES    (def=50)
//!   CRIT_WARMUP_MS  (def=300)
//!   CRIT_MEASURE_MS (def=1200)

use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use givre_harness::prelude::*;
use givre_vm::Vm;

// -------------------------------------------------------------------------------------
// Env helpers
// -------------------------------------------------------------------------------------
fn env_usize(k: &str, d: usize) -> usize {
    std::env::var(k).ok().and_then(|s| s.parse().ok()).unwrap_or(d)
}
fn env_u64(k: &str, d: u64) -> u64 {
    std::env::var(k).ok().and_then(|s| s.parse().ok()).unwrap_or(d)
}

fn tune(group: &mut criterion::BenchmarkGroup<'_, criterion::measurement::WallTime>) {
    group.sample_size(env_usize("CRIT_SAMPLES", 50));
    group.warm_up_time(Duration::from_millis(env_u64("CRIT_WARMUP_MS", 300)));
    group.measurement_time(Duration::from_millis(env_u64("CRIT_MEASURE_MS", 1200)));
}

// -------------------------------------------------------------------------------------
// Acquire: compile / compile-to-blob + unmarshal / unmarshal alone
// -------------------------------------------------------------------------------------
fn bench_acquire(c: &mut Criterion) {
    let mut group = c.benchmark_group("codeobject/acquire");
    tune(&mut group);

    group.bench_function("reference_compile", |b| {
        b.iter(|| {
            let mut listing = std::io::sink();
            let harness = Harness::acquire_with(
                RuntimeKind::Reference,
                SAMPLE_NAME,
                black_box(SAMPLE_SOURCE),
                &MarshalCompiler,
                &mut listing,
            )
            .expect("acquire (reference)");
            black_box(harness.label().len())
        });
    });

    group.bench_function("alternative_blob_roundtrip", |b| {
        b.iter(|| {
            let mut listing = std::io::sink();
            let harness = Harness::acquire_with(
                RuntimeKind::Alternative,
                SAMPLE_NAME,
                black_box(SAMPLE_SOURCE),
                &MarshalCompiler,
                &mut listing,
            )
            .expect("acquire (alternative)");
            black_box(harness.label().len())
        });
    });

    // Unmarshal in isolation: the blob is built once, outside the timer.
    let blob = MarshalCompiler
        .compile_blob(SAMPLE_NAME, SAMPLE_SOURCE)
        .expect("blob for unmarshal suite");
    group.bench_function("unmarshal_only", |b| {
        b.iter(|| {
            let code = UnmarshalledCode::from_blob(black_box(&blob)).expect("unmarshal");
            black_box(code.label().len())
        });
    });

    group.finish();
}

// -------------------------------------------------------------------------------------
// Execute: the measure loop, per runtime kind
// -------------------------------------------------------------------------------------
fn bench_execute(c: &mut Criterion) {
    let mut group = c.benchmark_group("codeobject/execute");
    tune(&mut group);

    for kind in [RuntimeKind::Reference, RuntimeKind::Alternative] {
        let mut harness = Harness::acquire_with(
            kind,
            SAMPLE_NAME,
            SAMPLE_SOURCE,
            &MarshalCompiler,
            &mut std::io::sink(),
        )
        .expect("acquire for execute suite")
        .with_vm(Vm::new().with_output(std::io::sink()));

        group.bench_with_input(BenchmarkId::new("measure_default", kind), &kind, |b, _| {
            b.iter(|| harness.run_benchmark().expect("measure"));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_acquire, bench_execute);
criterion_main!(benches);
