//! Array append/qube throughput benchmark.
//!
//! Measures `Array::append` cost for plain (qube) and ragged rank-2
//! arrays of varying row length.
//!
//! Run: cargo bench --bench array_append

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use das::array::{Array, ArrayFlags};
use das::units::UnitsTable;
use das::value::ValueType;

fn append_qube_rows(rows: usize, row_len: u32) {
    let units = UnitsTable::new();
    let arr = Array::new(ValueType::F64, units.dimensionless(), 2, vec![row_len], ArrayFlags::PLAIN).unwrap();
    let row: Vec<u8> = vec![0u8; row_len as usize * 8];
    for _ in 0..rows {
        arr.append(&row, row_len as usize).unwrap();
    }
}

fn append_ragged_rows(rows: usize, row_len: u32) {
    let units = UnitsTable::new();
    let arr = Array::new(ValueType::F64, units.dimensionless(), 2, vec![0], ArrayFlags::PLAIN).unwrap();
    let row: Vec<u8> = vec![0u8; row_len as usize * 8];
    for _ in 0..rows {
        arr.append(&row, row_len as usize).unwrap();
        arr.mark_end(1).unwrap();
    }
}

fn bench_append(c: &mut Criterion) {
    let mut group = c.benchmark_group("array_append");
    for row_len in [8u32, 64, 256] {
        group.bench_with_input(BenchmarkId::new("qube", row_len), &row_len, |b, &row_len| {
            b.iter(|| append_qube_rows(black_box(1000), row_len));
        });
        group.bench_with_input(BenchmarkId::new("ragged", row_len), &row_len, |b, &row_len| {
            b.iter(|| append_ragged_rows(black_box(1000), row_len));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_append);
criterion_main!(benches);
