// Compiler and field conversion benchmarks.
//
// Run with: cargo bench
//
// Performance Targets:
// | Operation              | Target    | Description                          |
// |------------------------|-----------|--------------------------------------|
// | Parse filter           | < 20us    | Nested JSON filter to expression     |
// | Compile (100 terms)    | < 200us   | OR chain over document fields        |
// | Select with joins      | < 50us    | Full statement, three joins          |
// | Convert item (20 flds) | < 50us    | Write conversion for one work item   |
// | Create item            | < 1ms     | Insert through SQLite                |

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::sync::Once;
use tempfile::TempDir;
use tracing::info;
use uuid::Uuid;
use wit_core::criteria::filter::parse_filter;
use wit_core::criteria::{Expression, equals, field, literal, or};
use wit_core::model::{FieldDefinition, FieldType, FieldValue, Kind, WorkItemType};
use wit_core::query::{Compiler, Page, select_work_items};
use wit_core::storage::SqliteStorage;

static INIT: Once = Once::new();

fn init_logging() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("warn")
            .with_writer(std::io::stderr)
            .try_init();
    });
}

fn sample_filter() -> Value {
    json!({"$AND": [
        {"state": {"$IN": ["new", "open", "in progress"]}},
        {"$OR": [
            {"iteration.name": "sprint 12"},
            {"area": {"$CHILD": "a-1"}}
        ]},
        {"title": {"$SUBSTR": "crash"}},
        {"number": {"$NE": 7}}
    ]})
}

/// `f0 = 0 OR f1 = 1 OR ...` with `terms` leaves.
fn or_chain(terms: usize) -> Expression {
    (1..terms).fold(
        equals(field("f0"), literal(0)),
        |acc, i| or(acc, equals(field(format!("f{i}")), literal(i))),
    )
}

fn wide_type(fields: usize) -> WorkItemType {
    (0..fields).fold(WorkItemType::with_system_fields("bench"), |t, i| {
        let kind = match i % 3 {
            0 => Kind::Integer,
            1 => Kind::Float,
            _ => Kind::String,
        };
        t.with_field(
            format!("custom_{i}"),
            FieldDefinition::new(FieldType::simple(kind), false),
        )
    })
}

fn wide_values(fields: usize) -> BTreeMap<String, FieldValue> {
    let mut values = BTreeMap::new();
    values.insert("system_title".to_string(), FieldValue::from("Benchmark item"));
    values.insert("system_state".to_string(), FieldValue::from("open"));
    for i in 0..fields {
        let value = match i % 3 {
            0 => FieldValue::from(i.to_string()),
            1 => FieldValue::Integer(i64::try_from(i).unwrap_or_default()),
            _ => FieldValue::from(format!("value {i}")),
        };
        values.insert(format!("custom_{i}"), value);
    }
    values
}

fn bench_parse_filter(c: &mut Criterion) {
    init_logging();
    let filter = sample_filter();
    c.bench_function("parse_filter", |b| {
        b.iter(|| parse_filter(black_box(&filter)));
    });
}

fn bench_compile_or_chain(c: &mut Criterion) {
    init_logging();
    let mut group = c.benchmark_group("compile_or_chain");
    for terms in [10_usize, 100, 1000] {
        let expr = or_chain(terms);
        group.throughput(Throughput::Elements(terms as u64));
        group.bench_with_input(BenchmarkId::from_parameter(terms), &expr, |b, expr| {
            b.iter(|| Compiler::new().compile(black_box(expr)));
        });
    }
    group.finish();
}

fn bench_select_with_joins(c: &mut Criterion) {
    init_logging();
    let expr = parse_filter(&json!({
        "iteration.name": "sprint 12",
        "area.name": "core",
        "creator.username": {"$SUBSTR": "ann"}
    }))
    .unwrap_or_else(|e| panic!("bench filter: {e}"));
    c.bench_function("select_with_joins", |b| {
        b.iter(|| {
            select_work_items(
                black_box(&expr),
                Page {
                    limit: Some(50),
                    offset: None,
                },
            )
        });
    });
}

fn bench_convert_item(c: &mut Criterion) {
    init_logging();
    let mut group = c.benchmark_group("convert_item");
    for fields in [5_usize, 20, 100] {
        let work_item_type = wide_type(fields);
        let values = wide_values(fields);
        group.bench_with_input(BenchmarkId::from_parameter(fields), &values, |b, values| {
            b.iter(|| work_item_type.convert_to_model(black_box(values)));
        });
    }
    group.finish();
}

fn bench_create_item(c: &mut Criterion) {
    init_logging();
    let temp_dir = TempDir::new().unwrap_or_else(|e| panic!("temp dir: {e}"));
    let mut storage = SqliteStorage::open(&temp_dir.path().join("bench.db"))
        .unwrap_or_else(|e| panic!("open storage: {e}"));
    let work_item_type = storage
        .create_type(wide_type(20))
        .unwrap_or_else(|e| panic!("create type: {e}"));
    let values = wide_values(20);
    let space = Uuid::new_v4();

    c.bench_function("create_item", |b| {
        b.iter(|| storage.create_item(&work_item_type.id, &space, black_box(&values)));
    });

    let count = storage.list_items(Some(&space)).map_or(0, |items| items.len());
    info!(count, "items created");
}

criterion_group!(
    compile_benches,
    bench_parse_filter,
    bench_compile_or_chain,
    bench_select_with_joins,
);

criterion_group!(storage_benches, bench_convert_item, bench_create_item);

criterion_main!(compile_benches, storage_benches);
