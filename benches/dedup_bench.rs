use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::collections::HashSet;
use std::io;
use tree_uploader::cache::{ExistenceCache, PathKey};
use tree_uploader::tree::decompose::TreeDecomposer;
use tree_uploader::tree::encode::{RowEncoder, TableVariant};
use tree_uploader::tree::reader::VecSource;

fn sample_paths(count: usize) -> Vec<Vec<u8>> {
    (0..count)
        .map(|i| format!("servers.host{}.cpu{}.user", i % 64, i).into_bytes())
        .collect()
}

fn bench_path_key(c: &mut Criterion) {
    let path = b"servers.host12.cpu1234.user";
    c.bench_function("path_key_digest", |b| {
        b.iter(|| PathKey::of(black_box(path)))
    });
}

fn bench_cache_ops(c: &mut Criterion) {
    let mut group = c.benchmark_group("cache");

    let keys: Vec<PathKey> = sample_paths(10_000)
        .iter()
        .map(|p| PathKey::of(p))
        .collect();

    group.bench_function("set_10k", |b| {
        b.iter(|| {
            let cache = ExistenceCache::new();
            for key in &keys {
                cache.set(*key, 0, 1);
            }
            black_box(cache.count())
        })
    });

    let warm = ExistenceCache::new();
    for key in &keys {
        warm.set(*key, 0, 1);
    }
    group.bench_function("exists_hit", |b| {
        b.iter(|| {
            let mut hits = 0usize;
            for key in &keys {
                if warm.exists(black_box(key), 0) {
                    hits += 1;
                }
            }
            black_box(hits)
        })
    });

    let misses: Vec<PathKey> = sample_paths(10_000)
        .iter()
        .map(|p| PathKey::of(&[p.as_slice(), b".miss"].concat()))
        .collect();
    group.bench_function("exists_miss", |b| {
        b.iter(|| {
            let mut hits = 0usize;
            for key in &misses {
                if warm.exists(black_box(key), 0) {
                    hits += 1;
                }
            }
            black_box(hits)
        })
    });

    group.bench_function("merge_1k", |b| {
        let batch: HashSet<PathKey> = keys.iter().take(1_000).copied().collect();
        b.iter(|| {
            let cache = ExistenceCache::new();
            cache.merge(0, black_box(&batch), 1);
            black_box(cache.count())
        })
    });

    group.finish();
}

fn bench_decompose(c: &mut Criterion) {
    let mut group = c.benchmark_group("decompose");

    for &count in &[1_000usize, 10_000] {
        let paths = sample_paths(count);

        // Cold cache: every leaf and ancestor survives.
        group.bench_with_input(BenchmarkId::new("cold", count), &paths, |b, paths| {
            b.iter(|| {
                let cache = ExistenceCache::new();
                let mut source = VecSource::new(paths.iter().cloned());
                let mut encoder = RowEncoder::new(io::sink(), TableVariant::Tree, 1);
                let decomposition = TreeDecomposer::new(&cache, 0)
                    .decompose(&mut source, &mut encoder)
                    .unwrap();
                black_box(decomposition.rows_emitted)
            })
        });

        // Warm cache: every leaf is already known, records are skipped
        // after one digest and one shard lookup.
        let warm = ExistenceCache::new();
        for path in &paths {
            warm.set(PathKey::of(path), 0, 1);
        }
        group.bench_with_input(BenchmarkId::new("warm", count), &paths, |b, paths| {
            b.iter(|| {
                let mut source = VecSource::new(paths.iter().cloned());
                let mut encoder = RowEncoder::new(io::sink(), TableVariant::Tree, 1);
                let decomposition = TreeDecomposer::new(&warm, 0)
                    .decompose(&mut source, &mut encoder)
                    .unwrap();
                black_box(decomposition.records_skipped)
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_path_key, bench_cache_ops, bench_decompose);
criterion_main!(benches);
