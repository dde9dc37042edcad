//! Comparator dispatch benchmarks.

#![allow(unsafe_code)]

use criterion::{
    black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput,
};
use lmbridge_bench::random_keys;
use lmbridge_engine::{Engine, MdbVal};
use lmbridge_ffi::{
    baseline_compare, install_comparator, put, ComparatorRegistry, ContextId, DispatchMode,
};
use lmbridge_testkit::{init_tracing, TestEnv};

/// The three dispatch modes, all ordering bytewise.
fn modes() -> [(&'static str, DispatchMode); 3] {
    let registry = ComparatorRegistry::global();
    if !registry.has_single() {
        registry
            .register_single(baseline_compare)
            .expect("Failed to register single comparator");
    }
    let id = ContextId::new(0xbe7c_0001);
    if !registry.is_registered(id) {
        let _ = registry
            .register_context(id, baseline_compare)
            .expect("Failed to register context comparator")
            .into_id();
    }
    [
        ("baseline", DispatchMode::Baseline),
        ("single", DispatchMode::Single),
        ("context", DispatchMode::Context(id)),
    ]
}

/// Benchmark one call through each native entry point.
fn bench_native_call(c: &mut Criterion) {
    let mut group = c.benchmark_group("native_call");
    let a = MdbVal::from_slice(b"comparator-benchmark-key-0001");
    let b = MdbVal::from_slice(b"comparator-benchmark-key-0002");

    for (name, mode) in modes() {
        let func = ComparatorRegistry::global()
            .native_fn(mode)
            .expect("Mode not registered");
        group.bench_function(name, |bench| {
            bench.iter(|| {
                // SAFETY: both descriptors point at static bytes.
                black_box(unsafe { func(black_box(&a), black_box(&b)) })
            });
        });
    }

    group.finish();
}

/// Benchmark inserting random keys into a database ordered by each mode.
fn bench_insert(c: &mut Criterion) {
    init_tracing();
    let mut group = c.benchmark_group("insert");

    for count in [256usize, 4096] {
        let keys = random_keys(count, 16);
        group.throughput(Throughput::Elements(count as u64));

        for (name, mode) in modes() {
            group.bench_with_input(BenchmarkId::new(name, count), &keys, |b, keys| {
                b.iter_batched(
                    || {
                        let env = TestEnv::new();
                        let scratch = env.scratch("bench", 0);
                        install_comparator(&*env, scratch.txn, scratch.dbi, mode)
                            .expect("Failed to install comparator");
                        (env, scratch)
                    },
                    |(env, scratch)| {
                        for key in keys {
                            put(&*env, scratch.txn, scratch.dbi, key, b"v", 0)
                                .expect("Put failed");
                        }
                        ComparatorRegistry::global().forget_environment(env.env_id());
                        env
                    },
                    BatchSize::SmallInput,
                );
            });
        }
    }

    group.finish();
}

criterion_group!(benches, bench_native_call, bench_insert);
criterion_main!(benches);
