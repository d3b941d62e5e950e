//! Zero-suppression codec benchmarks (criterion).
//!
//! Compares the fixed byte-aligned forms against SIMD-BP128 on encode,
//! bulk decode, and random access.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use stoa::zs::{ZsType, ZsVector};

fn input(len: usize, max: u32) -> Vec<u32> {
    (0..len as u32)
        .map(|i| i.wrapping_mul(2654435761) % (max + 1))
        .collect()
}

fn bench_encode(c: &mut Criterion) {
    let values = input(1 << 16, 60_000);
    let mut group = c.benchmark_group("encode");
    for (name, zs_type) in [
        ("fixed2", ZsType::Fixed2),
        ("fixed4", ZsType::Fixed4),
        ("bp128", ZsType::SimdBp128),
    ] {
        group.bench_function(name, |b| {
            b.iter(|| ZsVector::encode(black_box(&values), zs_type))
        });
    }
    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let values = input(1 << 16, 60_000);
    let mut group = c.benchmark_group("decode");
    for (name, zs_type) in [("fixed2", ZsType::Fixed2), ("bp128", ZsType::SimdBp128)] {
        let encoded = ZsVector::encode(&values, zs_type);
        group.bench_function(name, |b| b.iter(|| black_box(&encoded).decode()));
    }
    group.finish();
}

fn bench_random_access(c: &mut Criterion) {
    let values = input(1 << 16, 60_000);
    let mut group = c.benchmark_group("get");
    for (name, zs_type) in [("fixed2", ZsType::Fixed2), ("bp128", ZsType::SimdBp128)] {
        let encoded = ZsVector::encode(&values, zs_type);
        group.bench_function(name, |b| {
            b.iter(|| {
                let mut sum = 0u64;
                for i in (0..values.len()).step_by(97) {
                    sum += encoded.get(i) as u64;
                }
                sum
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_encode, bench_decode, bench_random_access);
criterion_main!(benches);
