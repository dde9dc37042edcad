//! Multi-value put benchmarks.

use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput};
use lmbridge_bench::random_page;
use lmbridge_engine::sys::{MDB_DUPFIXED, MDB_DUPSORT};
use lmbridge_ffi::{cursor_put, cursor_put_multi};
use lmbridge_testkit::{init_tracing, Scratch, TestEnv};

const STRIDE: usize = 8;

fn setup() -> (TestEnv, Scratch) {
    let env = TestEnv::new();
    let scratch = env.scratch("dups", MDB_DUPSORT | MDB_DUPFIXED);
    (env, scratch)
}

/// Compare one `MDB_MULTIPLE` put against a put per record.
fn bench_multi_vs_single(c: &mut Criterion) {
    init_tracing();
    let mut group = c.benchmark_group("dupfixed_put");

    for count in [64usize, 1024] {
        let page = random_page(count, STRIDE);
        group.throughput(Throughput::Elements(count as u64));

        group.bench_with_input(BenchmarkId::new("multiple", count), &page, |b, page| {
            b.iter_batched(
                setup,
                |(env, scratch)| {
                    cursor_put_multi(&*env, scratch.cursor, b"key", page, STRIDE, 0)
                        .expect("Multi put failed");
                    env
                },
                BatchSize::SmallInput,
            );
        });

        group.bench_with_input(BenchmarkId::new("per_record", count), &page, |b, page| {
            b.iter_batched(
                setup,
                |(env, scratch)| {
                    for record in page.chunks_exact(STRIDE) {
                        cursor_put(&*env, scratch.cursor, b"key", record, 0)
                            .expect("Put failed");
                    }
                    env
                },
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

criterion_group!(benches, bench_multi_vs_single);
criterion_main!(benches);
