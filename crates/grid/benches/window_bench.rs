//! Benchmarks for stagehand-grid windowed access.
//!
//! Target: sequential scan of 10k rows < 10ms

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use stagehand_core::schema::TableBuilder;
use stagehand_core::{DataType, Error, QueryHandle, Record, RecordQuery, RecordState, Result};
use stagehand_grid::WindowedCache;
use stagehand_proxy::ProxyFactory;
use stagehand_reactive::Observable;
use std::rc::Rc;

struct Numbers(Vec<Record>);

impl RecordQuery for Numbers {
    fn count(&self) -> Result<usize> {
        Ok(self.0.len())
    }

    fn slice(&self, start: usize, stop: usize) -> Result<Vec<Record>> {
        let stop = stop.min(self.0.len());
        Ok(self.0[start.min(stop)..stop].to_vec())
    }

    fn filter_like(&self, _attribute: &str, _pattern: &str) -> Result<QueryHandle> {
        Err(Error::invalid_operation("not filterable"))
    }
}

fn make_query(size: usize) -> Rc<Observable<QueryHandle>> {
    let schema = Rc::new(
        TableBuilder::new("lap")
            .unwrap()
            .add_column("number", DataType::Int32)
            .unwrap()
            .build()
            .unwrap(),
    );
    let records = (0..size)
        .map(|i| {
            let r = Record::new(schema.clone());
            r.set("number", i as i32).unwrap();
            r.set_state(RecordState::Persistent);
            r.clear_changes();
            r
        })
        .collect();
    Rc::new(Observable::new(Rc::new(Numbers(records)) as QueryHandle))
}

fn bench_sequential_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("window_scan");

    for size in [1_000, 10_000] {
        let query = make_query(size);
        group.bench_with_input(BenchmarkId::new("sequential", size), &size, |b, &size| {
            b.iter(|| {
                let cache =
                    WindowedCache::new(query.clone(), Rc::new(ProxyFactory::detached()), 50)
                        .unwrap();
                for i in 0..size {
                    black_box(cache.get_row(i).unwrap());
                }
            })
        });
    }

    group.finish();
}

fn bench_random_access(c: &mut Criterion) {
    let query = make_query(10_000);
    let cache = WindowedCache::new(query, Rc::new(ProxyFactory::detached()), 50).unwrap();
    // Warm the whole range so only lookups are measured.
    for i in 0..10_000 {
        cache.get_row(i).unwrap();
    }

    c.bench_function("window_cached_lookup", |b| {
        let mut i = 0usize;
        b.iter(|| {
            i = (i * 7919 + 13) % 10_000;
            black_box(cache.get_row(i).unwrap())
        })
    });
}

criterion_group!(benches, bench_sequential_scan, bench_random_access);
criterion_main!(benches);
