//! Microbenchmarks for the pure, process-free pieces of the core: the value
//! comparator and the entry-point resolver.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use raptor_exec::{entry_point_from_signature, values_equal, Value};

fn deep_value(depth: usize) -> Value {
    let mut value = Value::List(vec![Value::Int(1), Value::Float(2.5), Value::Unit]);
    for i in 0..depth {
        value = Value::map_from([
            (format!("level{i}"), value),
            ("tag".to_string(), Value::Str("node".to_string())),
        ]);
    }
    value
}

fn bench_compare(c: &mut Criterion) {
    let flat = Value::List((0..256i64).map(Value::Int).collect());
    c.bench_function("compare_flat_list_256", |b| {
        b.iter(|| values_equal(black_box(&flat), black_box(&flat)))
    });

    let deep = deep_value(32);
    c.bench_function("compare_nested_map_32", |b| {
        b.iter(|| values_equal(black_box(&deep), black_box(&deep)))
    });
}

fn bench_entry_point(c: &mut Criterion) {
    let signature = "def two_sum(nums: List[int], target: int) -> List[int]:";
    c.bench_function("entry_point_from_signature", |b| {
        b.iter(|| entry_point_from_signature(black_box(signature)))
    });
}

criterion_group!(benches, bench_compare, bench_entry_point);
criterion_main!(benches);
