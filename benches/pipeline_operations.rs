use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use fluent_collections::*;
use futures_util::stream::StreamExt;
use tokio::runtime::Runtime;

fn bench_lazy_operations(c: &mut Criterion) {
    let mut group = c.benchmark_group("lazy_operations");

    for size in [1_000u64, 10_000, 100_000].iter() {
        let source: Vec<u64> = (0..*size).collect();

        group.bench_with_input(BenchmarkId::new("map_filter", size), &source, |b, source| {
            let pipeline = lazy(source.clone())
                .map(|x| black_box(x * 2))
                .filter(|x| black_box(x % 4 == 0));
            b.iter(|| black_box(pipeline.collect_vec().unwrap()));
        });

        group.bench_with_input(BenchmarkId::new("eager_map_filter", size), &source, |b, source| {
            let collection = Collection::new(source.clone());
            b.iter(|| black_box(collection.map(|x| x * 2).filter(|x| x % 4 == 0)));
        });

        group.bench_with_input(BenchmarkId::new("take_100", size), &source, |b, source| {
            let pipeline = lazy(source.clone()).map(|x| x + 1).take(100);
            b.iter(|| black_box(pipeline.collect_vec().unwrap()));
        });

        group.bench_with_input(BenchmarkId::new("chunk_100", size), &source, |b, source| {
            let pipeline = lazy(source.clone()).chunk(100).map(|chunk| chunk.len());
            b.iter(|| black_box(pipeline.collect_vec().unwrap()));
        });
    }

    group.finish();
}

fn bench_async_consumers(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("async_consumers");

    for size in [10_000u64, 100_000].iter() {
        let pipeline = lazy((0..*size).collect::<Vec<u64>>()).map(|x| x * 3);

        group.bench_with_input(BenchmarkId::new("cursor_256", size), &pipeline, |b, pipeline| {
            b.to_async(&rt).iter(|| async {
                let chunks = pipeline.cursor(256).count().await;
                black_box(chunks)
            });
        });

        group.bench_with_input(BenchmarkId::new("parallel", size), &pipeline, |b, pipeline| {
            let config = ParallelConfig::new().chunks(8).max_concurrency(4);
            b.to_async(&rt).iter(|| async {
                let outcome = pipeline
                    .parallel(
                        |part| async move {
                            tokio::task::yield_now().await;
                            Ok::<_, std::convert::Infallible>(part.into_iter().map(|x| x / 2).collect::<Vec<u64>>())
                        },
                        &config,
                    )
                    .await
                    .unwrap();
                black_box(outcome.flatten().unwrap())
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_lazy_operations, bench_async_consumers);
criterion_main!(benches);
