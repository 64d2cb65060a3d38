//! B+Tree index benchmarks.
//!
//! - Sequential and shuffled inserts
//! - Range scans of increasing width

use attrindex::relation::MemRelation;
use attrindex::{BTreeIndex, IndexConfig, Operator, RecordId};
use criterion::{
    black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput,
};
use tempfile::{tempdir, TempDir};

/// `0..count` visited in a fixed scrambled order.
fn shuffled_keys(count: i32) -> Vec<i32> {
    (0..count).map(|i| ((i as i64 * 7919) % count as i64) as i32).collect()
}

fn empty_index(dir: &TempDir) -> BTreeIndex<i32> {
    let rel = MemRelation::new("bench");
    let config = IndexConfig::default().with_pool_size(256);
    BTreeIndex::<i32>::open_or_build(dir.path(), &rel, 0, config).unwrap()
}

fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("btree/insert");

    for size in [1_000, 10_000, 50_000] {
        let sequential: Vec<i32> = (0..size).collect();
        let shuffled = shuffled_keys(size);

        group.throughput(Throughput::Elements(size as u64));
        for (name, keys) in [("sequential", &sequential), ("shuffled", &shuffled)] {
            group.bench_with_input(BenchmarkId::new(name, size), keys, |b, keys| {
                b.iter_batched(
                    || tempdir().unwrap(),
                    |dir| {
                        let mut index = empty_index(&dir);
                        for &k in keys {
                            index.insert_entry(k, RecordId::new(k as u32, 0)).unwrap();
                        }
                        black_box(index.height())
                    },
                    BatchSize::PerIteration,
                );
            });
        }
    }

    group.finish();
}

fn bench_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("btree/scan");

    let dir = tempdir().unwrap();
    let mut index = empty_index(&dir);
    for k in shuffled_keys(100_000) {
        index.insert_entry(k, RecordId::new(k as u32, 0)).unwrap();
    }

    for width in [10, 1_000, 50_000] {
        group.throughput(Throughput::Elements(width as u64));
        group.bench_with_input(BenchmarkId::from_parameter(width), &width, |b, &width| {
            b.iter(|| {
                let rids = index
                    .scan_range(25_000, Operator::Gte, 25_000 + width, Operator::Lt)
                    .unwrap();
                black_box(rids.len())
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_insert, bench_scan);
criterion_main!(benches);
