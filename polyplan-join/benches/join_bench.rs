//! Benchmarks for join compilation and the reference join executors.
//!
//! The executors are row-at-a-time interpreters, so absolute numbers are only useful
//! for comparing the two strategies on the same plan shape:
//! - nested loop is O(N×M) matcher evaluations,
//! - hash only evaluates the matcher within hash buckets.

use arrow::array::{ArrayRef, Int64Array, StringArray};
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use polyplan_compute::FunctionRegistry;
use polyplan_expr::{Filter, Op};
use polyplan_join::{
    JoinAlgorithm, JoinDescriptor, JoinOptions, compile_join, hash_join, nested_loop_join,
};
use polyplan_plan::CompileContext;
use polyplan_test_utils::{batch_of, schema_with_key};
use polyplan_types::BatchSchema;
use std::hint::black_box;
use std::sync::Arc;

/// Schema: key (Int64), `{prefix}.id` (Int64), `{prefix}.value` (Utf8)
fn create_side(prefix: &str, num_rows: usize, id_offset: i64) -> (BatchSchema, RecordBatch) {
    let id = format!("{prefix}.id");
    let value = format!("{prefix}.value");
    let schema = schema_with_key(&[
        (id.as_str(), DataType::Int64),
        (value.as_str(), DataType::Utf8),
    ]);

    let keys: Vec<i64> = (0..num_rows as i64).collect();
    let ids: Vec<i64> = (0..num_rows as i64).map(|i| i + id_offset).collect();
    let values: Vec<String> = (0..num_rows).map(|i| format!("value_{i}")).collect();
    let batch = batch_of(
        &schema,
        vec![
            Arc::new(Int64Array::from(keys)) as ArrayRef,
            Arc::new(Int64Array::from(ids)),
            Arc::new(StringArray::from(values)),
        ],
    )
    .unwrap();
    (schema, batch)
}

fn descriptor(algorithm: JoinAlgorithm) -> JoinDescriptor {
    JoinDescriptor::new(JoinOptions::inner().with_algorithm(algorithm))
        .with_prefixes("l", "r")
        .with_join_columns(["id"])
}

fn bench_compile_join(c: &mut Criterion) {
    let registry = FunctionRegistry::new();
    let (left, _) = create_side("l", 1, 0);
    let (right, _) = create_side("r", 1, 0);
    let filter = Filter::any_of(vec![
        Filter::value("l.value", Op::Like, "value_1.*"),
        Filter::paths("l.id", Op::Lt, "r.id"),
    ]);
    let descriptor = descriptor(JoinAlgorithm::Hash);

    c.bench_function("compile_join", |b| {
        b.iter(|| {
            let mut ctx = CompileContext::new(&registry);
            black_box(compile_join(&mut ctx, &left, &right, &descriptor, Some(&filter)).unwrap())
        });
    });
}

fn bench_executors(c: &mut Criterion) {
    let mut group = c.benchmark_group("join_executor");
    group.sample_size(10);
    let registry = FunctionRegistry::new();

    for &size in &[100usize, 1_000] {
        let (left, left_batch) = create_side("l", size, 0);
        // Half the probe ids overlap the build side.
        let (right, right_batch) = create_side("r", size, (size / 2) as i64);
        let left_batches = [left_batch];
        let right_batches = [right_batch];
        group.throughput(Throughput::Elements((size * size) as u64));

        let mut ctx = CompileContext::new(&registry);
        let nested_plan = compile_join(
            &mut ctx,
            &left,
            &right,
            &descriptor(JoinAlgorithm::NestedLoop),
            None,
        )
        .unwrap();
        let hash_plan =
            compile_join(&mut ctx, &left, &right, &descriptor(JoinAlgorithm::Hash), None).unwrap();

        group.bench_with_input(BenchmarkId::new("nested_loop", size), &size, |b, _| {
            b.iter(|| {
                black_box(nested_loop_join(&nested_plan, &left_batches, &right_batches).unwrap())
            });
        });
        group.bench_with_input(BenchmarkId::new("hash", size), &size, |b, _| {
            b.iter(|| black_box(hash_join(&hash_plan, &left_batches, &right_batches).unwrap()));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_compile_join, bench_executors);
criterion_main!(benches);
