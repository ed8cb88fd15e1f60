use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use flatdb::{ColumnHeader, Database, QuerySet, Schema, StorageType, StoreConfig};
use std::hint::black_box;
use tempfile::TempDir;

fn setup_populated_db(dir: &TempDir, n: usize) -> Database {
    let mut db = Database::with_config(StoreConfig::new(dir.path()).with_sync_writes(false));
    db.create_table(
        "users",
        Schema::new(vec![
            ColumnHeader::new("name", StorageType::String),
            ColumnHeader::new("age", StorageType::Integer),
            ColumnHeader::new("score", StorageType::Decimal),
        ]),
    )
    .unwrap();

    if n > 0 {
        let text = (0..n)
            .map(|i| format!("ADD [user{i}, {}, {}.5] IN users", i % 100, i % 7))
            .collect::<Vec<_>>()
            .join("\n");
        db.query(&QuerySet::parse(&text).unwrap()).unwrap();
    }
    db
}

fn bench_add(c: &mut Criterion) {
    let mut group = c.benchmark_group("Add_Pipeline");
    group.bench_function("add_single_entry", |b| {
        let dir = TempDir::new().unwrap();
        let db = setup_populated_db(&dir, 0);
        b.iter(|| {
            db.execute(black_box("ADD [Foo Bar, 46, 1.5] IN users"))
                .unwrap();
        });
    });
    group.finish();
}

fn bench_get_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("Get_Where_Performance");

    for n in [1000, 10000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(n), n, |b, &n| {
            let dir = TempDir::new().unwrap();
            let db = setup_populated_db(&dir, n);
            b.iter(|| {
                let res = db.execute("GET WHERE age IS 42 IN users").unwrap();
                black_box(res);
            });
        });
    }
    group.finish();
}

fn bench_set_performance(c: &mut Criterion) {
    let mut group = c.benchmark_group("Set_Performance");

    for n in [1000, 10000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(n), n, |b, &n| {
            let dir = TempDir::new().unwrap();
            let db = setup_populated_db(&dir, n);
            b.iter(|| {
                let res = db
                    .execute("SET WHERE age IS 42 TO [*, 42, 9.5] IN users")
                    .unwrap();
                black_box(res);
            });
        });
    }
    group.finish();
}

fn bench_remove_performance(c: &mut Criterion) {
    let mut group = c.benchmark_group("Remove_Performance");

    for n in [1000, 10000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(n), n, |b, &n| {
            b.iter_with_setup(
                || {
                    let dir = TempDir::new().unwrap();
                    let db = setup_populated_db(&dir, n);
                    (dir, db)
                },
                |(dir, db)| {
                    db.execute("REMOVE WHERE age INCLUDES 9 IN users").unwrap();
                    black_box((dir, db));
                },
            );
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_add,
    bench_get_scaling,
    bench_set_performance,
    bench_remove_performance
);
criterion_main!(benches);
