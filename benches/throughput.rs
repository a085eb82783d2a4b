//! Throughput Benchmark for geokv
//!
//! Measures the storage engines directly, without the network layer.

use bytes::Bytes;
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use geokv::geo::{geohash, GeoEngine};
use geokv::protocol::CommandParser;
use geokv::storage::{Expiry, KeyValueStore};
use std::sync::Arc;
use std::time::Duration;

/// Benchmark SET operations
fn bench_set(c: &mut Criterion) {
    let store = Arc::new(KeyValueStore::new());

    let mut group = c.benchmark_group("set");
    group.throughput(Throughput::Elements(1));

    group.bench_function("set_no_expiry", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let key = Bytes::from(format!("key:{}", i));
            store.set(key, Bytes::from("small_value"), Expiry::Never);
            i += 1;
        });
    });

    group.bench_function("set_with_expiry", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let key = Bytes::from(format!("ttl:{}", i));
            store.set(key, Bytes::from("small_value"), Expiry::from_seconds(3600));
            i += 1;
        });
    });

    group.finish();
}

/// Benchmark GET operations
fn bench_get(c: &mut Criterion) {
    let store = Arc::new(KeyValueStore::new());

    for i in 0..100_000 {
        store.set(
            Bytes::from(format!("key:{}", i)),
            Bytes::from(format!("value:{}", i)),
            Expiry::Never,
        );
    }

    let mut group = c.benchmark_group("get");
    group.throughput(Throughput::Elements(1));

    group.bench_function("get_existing", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let key = format!("key:{}", i % 100_000);
            black_box(store.get(key.as_bytes()).ok());
            i += 1;
        });
    });

    group.bench_function("get_missing", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let key = format!("missing:{}", i);
            black_box(store.get(key.as_bytes()).ok());
            i += 1;
        });
    });

    group.finish();
}

/// Benchmark concurrent access on disjoint keys
fn bench_concurrent(c: &mut Criterion) {
    use std::thread;

    let mut group = c.benchmark_group("concurrent");
    group.measurement_time(Duration::from_secs(10));

    group.bench_function("4_threads_set_get", |b| {
        b.iter(|| {
            let store = Arc::new(KeyValueStore::new());
            let handles: Vec<_> = (0..4)
                .map(|t| {
                    let store = Arc::clone(&store);
                    thread::spawn(move || {
                        for i in 0..10_000 {
                            let key = Bytes::from(format!("key:{}:{}", t, i));
                            store.set(key.clone(), Bytes::from("value"), Expiry::Never);
                            let _ = store.get(&key);
                        }
                    })
                })
                .collect();

            for handle in handles {
                handle.join().unwrap();
            }

            black_box(store.len());
        });
    });

    group.finish();
}

/// Benchmark geohash encoding
fn bench_geohash(c: &mut Criterion) {
    let mut group = c.benchmark_group("geohash");
    group.throughput(Throughput::Elements(1));

    group.bench_function("encode", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let lat = (i % 180) as f64 - 90.0;
            let lon = (i % 360) as f64 - 180.0;
            black_box(geohash::encode(lat, lon));
            i += 1;
        });
    });

    group.finish();
}

/// Benchmark GEOADD and GEODIST against a populated namespace
fn bench_geo(c: &mut Criterion) {
    let geo = Arc::new(GeoEngine::new());
    let ns = Bytes::from("fleet");

    for i in 0..100_000u64 {
        let lat = (i % 170) as f64 - 85.0 + (i as f64 * 1e-6);
        let lon = (i % 350) as f64 - 175.0;
        geo.add(ns.clone(), lat, lon, Bytes::from(format!("car:{}", i)));
    }

    let mut group = c.benchmark_group("geo");
    group.throughput(Throughput::Elements(1));

    group.bench_function("geoadd_move", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let member = Bytes::from(format!("car:{}", i % 100_000));
            geo.add(ns.clone(), (i % 90) as f64, (i % 180) as f64, member);
            i += 1;
        });
    });

    group.bench_function("geodist", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let a = format!("car:{}", i % 100_000);
            let z = format!("car:{}", (i * 7919) % 100_000);
            black_box(geo.dist(b"fleet", a.as_bytes(), z.as_bytes()).ok());
            i += 1;
        });
    });

    group.finish();
}

/// Benchmark request parsing
fn bench_parse(c: &mut Criterion) {
    let parser = CommandParser::new();
    let request = b"*5\r\n$6\r\nGEOADD\r\n$5\r\nfleet\r\n$7\r\n52.5200\r\n$6\r\n13.405\r\n$4\r\ncar1\r\n";

    let mut group = c.benchmark_group("parse");
    group.throughput(Throughput::Bytes(request.len() as u64));

    group.bench_function("geoadd_multibulk", |b| {
        b.iter(|| black_box(parser.parse(black_box(request)).ok()));
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_set,
    bench_get,
    bench_concurrent,
    bench_geohash,
    bench_geo,
    bench_parse,
);

criterion_main!(benches);
