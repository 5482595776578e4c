use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use objectstore::*;

fn populated(size: usize) -> (SharedRealm, TableRef) {
    let realm = Realm::open(Config::new("bench"));
    let table = realm
        .add_table(
            "Item",
            Schema::new(vec![
                ("id".to_string(), ColumnType::Int, false),
                ("score".to_string(), ColumnType::Double, false),
            ]),
        )
        .unwrap();
    {
        let mut t = table.borrow_mut();
        for i in 0..size {
            let score = ((i * 7919) % 1000) as f64;
            t.append_row(vec![ColumnValue::Int(i as i64), ColumnValue::Double(score)]).unwrap();
        }
    }
    (realm, table)
}

fn bench_materialize_query(c: &mut Criterion) {
    let mut group = c.benchmark_group("materialize_query");

    for size in [100, 1000, 10000].iter() {
        let (realm, table) = populated(*size);
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                let results = Results::from_query(
                    realm.clone(),
                    Query::new(table.clone()).greater(1, 500.0f64),
                    SortOrder::default(),
                );
                black_box(results.size().unwrap())
            });
        });
    }
    group.finish();
}

fn bench_sorted_materialize(c: &mut Criterion) {
    let mut group = c.benchmark_group("sorted_materialize");

    for size in [100, 1000, 10000].iter() {
        let (realm, table) = populated(*size);
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                let results = Results::from_table(realm.clone(), table.clone())
                    .sort(SortOrder::by(1, true).then(0, false))
                    .unwrap();
                black_box(results.get(0).unwrap())
            });
        });
    }
    group.finish();
}

fn bench_cached_get(c: &mut Criterion) {
    let mut group = c.benchmark_group("cached_get");

    for size in [100, 1000, 10000].iter() {
        let (realm, table) = populated(*size);
        let results = Results::from_table(realm, table).sort(SortOrder::by(1, false)).unwrap();
        results.size().unwrap();

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            b.iter(|| results.get(black_box(size / 2)).unwrap());
        });
    }
    group.finish();
}

fn bench_aggregate(c: &mut Criterion) {
    let mut group = c.benchmark_group("aggregate");

    for size in [100, 1000, 10000].iter() {
        let (realm, table) = populated(*size);
        let results = Results::from_table(realm, table);

        group.bench_with_input(BenchmarkId::new("sum", size), size, |b, _| {
            b.iter(|| results.sum(black_box(0)).unwrap());
        });
        group.bench_with_input(BenchmarkId::new("average", size), size, |b, _| {
            b.iter(|| results.average(black_box(1)).unwrap());
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_materialize_query,
    bench_sorted_materialize,
    bench_cached_get,
    bench_aggregate
);

criterion_main!(benches);
