//! Search throughput over a populated record array.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use filedex::store::{ops, search::search, RecordArray};

fn populated_array(files: usize) -> RecordArray {
    let mut db = RecordArray::new();
    for i in 0..files {
        let full = format!("/project/module{:02}/source_file_{i:05}.rs", i % 24);
        ops::insert(&mut db, &full, "01/01/2020 10:00").unwrap();
    }
    db
}

fn bench_search(c: &mut Criterion) {
    let mut db = populated_array(2_000);
    let include = vec!["source".to_string(), "9".to_string()];
    let exclude = vec!["module13".to_string()];

    c.bench_function("search_2k_match_all", |b| {
        b.iter(|| {
            let mut pending = RecordArray::new();
            let results = search(black_box(&mut db), &mut pending, &[], &[], false);
            black_box(results.count())
        });
    });

    c.bench_function("search_2k_two_tokens_full_path", |b| {
        b.iter(|| {
            let mut pending = RecordArray::new();
            let results = search(black_box(&mut db), &mut pending, &include, &exclude, true);
            black_box(results.count())
        });
    });
}

fn bench_merge(c: &mut Criterion) {
    let base = populated_array(1_000);
    let incoming = {
        let mut db = RecordArray::new();
        for i in 0..200 {
            let full = format!("/elsewhere/extra_{i:04}.rs");
            ops::insert(&mut db, &full, "01/01/2020 10:00").unwrap();
        }
        db
    };

    c.bench_function("merge_200_into_1k", |b| {
        b.iter(|| {
            let mut db = base.clone();
            ops::merge(&mut db, black_box(&incoming));
            black_box(db.count())
        });
    });
}

criterion_group!(benches, bench_search, bench_merge);
criterion_main!(benches);
