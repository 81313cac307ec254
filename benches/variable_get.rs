//! Variable graph `get` throughput benchmark.
//!
//! Compares a plain `ArrayVar` read against a `BinaryOp` composing two
//! such variables, across a qube rank-1 array.
//!
//! Run: cargo bench --bench variable_get

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use das::array::{Array, ArrayFlags};
use das::units::UnitsTable;
use das::value::ValueType;
use das::variable::{BinaryOperator, Variable};

const N: usize = 10_000;

fn make_array_var(units: &UnitsTable) -> std::rc::Rc<Variable> {
    let arr = Array::new(ValueType::F64, units.dimensionless(), 1, vec![], ArrayFlags::PLAIN).unwrap();
    let row: Vec<u8> = (0..N).flat_map(|i| (i as f64).to_le_bytes()).collect();
    arr.append(&row, N).unwrap();
    Variable::from_array(std::rc::Rc::new(arr), vec![0], None)
}

fn bench_get(c: &mut Criterion) {
    let mut units = UnitsTable::new();
    let a = make_array_var(&units);
    let b = make_array_var(&units);
    let sum = Variable::binary(&mut units, BinaryOperator::Add, a.clone(), b.clone()).unwrap();

    c.bench_function("array_var_get", |bencher| {
        bencher.iter(|| {
            for i in 0..N as i64 {
                black_box(a.get(&[black_box(i)]).unwrap());
            }
        });
    });

    c.bench_function("binary_op_get", |bencher| {
        bencher.iter(|| {
            for i in 0..N as i64 {
                black_box(sum.get(&[black_box(i)]).unwrap());
            }
        });
    });
}

criterion_group!(benches, bench_get);
criterion_main!(benches);
