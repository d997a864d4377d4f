//! Performance benchmarks for stream trees
//!
//! This benchmark suite evaluates:
//! - Byte reads through leaves and composites of different fan-out
//! - Glue-byte reads across unaligned child boundaries
//! - Composite slicing
//! - Pattern search with `index_of`
//! - Replication with `grow_to`

use bitweave_core::prelude::*;
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;

/// Standard data sizes for benchmarking
mod data_sizes {
    pub const SMALL: usize = 256; // 256 B
    pub const MEDIUM: usize = 4 * 1024; // 4 KB
    pub const LARGE: usize = 64 * 1024; // 64 KB
}

/// Text-like data
fn text_like(size: usize) -> Vec<u8> {
    let text = b"The quick brown fox jumps over the lazy dog. ";
    let mut data = Vec::with_capacity(size);
    while data.len() < size {
        let remaining = size - data.len();
        let chunk_size = remaining.min(text.len());
        data.extend_from_slice(&text[..chunk_size]);
    }
    data
}

/// Split `data` into a composite of `chunk` byte leaves.
fn aligned_list(data: &[u8], chunk: usize) -> BitStreamList {
    let mut list = BitStreamList::new();
    for part in data.chunks(chunk) {
        list.push(Box::new(BitBuffer::from_bytes(part.to_vec())))
            .expect("push");
    }
    list
}

/// Composite whose children all end off a byte boundary.
fn unaligned_list(data: &[u8], chunk: usize) -> BitStreamList {
    let mut list = BitStreamList::new();
    for part in data.chunks(chunk) {
        let bits = part.len() as u64 * 8 - 3;
        list.push(Box::new(
            BitBuffer::from_bits(part.to_vec(), bits).expect("bits"),
        ))
        .expect("push");
    }
    list
}

/// Benchmark reading a single leaf versus composites of growing fan-out
fn bench_read(c: &mut Criterion) {
    let mut group = c.benchmark_group("read");
    let data = text_like(data_sizes::LARGE);
    group.throughput(Throughput::Bytes(data.len() as u64));

    group.bench_function("leaf", |b| {
        let mut leaf = BitBuffer::from_bytes(data.clone());
        b.iter(|| {
            leaf.set_position_bits(0).expect("seek");
            black_box(leaf.read_to_vec().expect("read"));
        });
    });

    for chunk in [data_sizes::MEDIUM, data_sizes::SMALL, 16] {
        let mut list = aligned_list(&data, chunk);
        group.bench_with_input(BenchmarkId::new("aligned_list", chunk), &chunk, |b, _| {
            b.iter(|| {
                list.set_position_bits(0).expect("seek");
                black_box(list.read_to_vec().expect("read"));
            });
        });

        let mut list = unaligned_list(&data, chunk);
        group.bench_with_input(BenchmarkId::new("unaligned_list", chunk), &chunk, |b, _| {
            b.iter(|| {
                list.set_position_bits(0).expect("seek");
                black_box(list.read_to_vec().expect("read"));
            });
        });
    }

    group.finish();
}

/// Benchmark slicing the middle half of a composite
fn bench_slice(c: &mut Criterion) {
    let mut group = c.benchmark_group("slice");
    let data = text_like(data_sizes::LARGE);

    for chunk in [data_sizes::MEDIUM, data_sizes::SMALL] {
        let mut list = unaligned_list(&data, chunk);
        let total = list.length_bits().expect("length");
        group.throughput(Throughput::Bytes(total / 16));
        group.bench_with_input(BenchmarkId::from_parameter(chunk), &chunk, |b, _| {
            b.iter(|| {
                list.set_position_bits(total / 4).expect("seek");
                black_box(list.slice_bits(total / 2).expect("slice"));
            });
        });
    }

    group.finish();
}

/// Benchmark searching for a pattern at the end of the data
fn bench_index_of(c: &mut Criterion) {
    let mut group = c.benchmark_group("index_of");

    for size in [data_sizes::SMALL, data_sizes::MEDIUM] {
        let mut data = text_like(size);
        data.extend_from_slice(b"NEEDLE");
        let mut list = aligned_list(&data, 64);
        let mut needle = BitBuffer::from_bytes(b"NEEDLE".to_vec());

        group.throughput(Throughput::Bytes(data.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| {
                let found = list.index_of(&mut needle, 0).expect("search");
                black_box(found);
            });
        });
    }

    group.finish();
}

/// Benchmark growing a short seed to larger targets
fn bench_grow(c: &mut Criterion) {
    let mut group = c.benchmark_group("grow_to");
    let mut seed = BitBuffer::from_bytes(b"seed".to_vec());

    for target in [data_sizes::SMALL, data_sizes::MEDIUM, data_sizes::LARGE] {
        group.throughput(Throughput::Bytes(target as u64));
        group.bench_with_input(BenchmarkId::from_parameter(target), &target, |b, &target| {
            b.iter(|| {
                let grown = grow_to(&mut seed, target as u64).expect("grow");
                black_box(grown);
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_read, bench_slice, bench_index_of, bench_grow);

criterion_main!(benches);
