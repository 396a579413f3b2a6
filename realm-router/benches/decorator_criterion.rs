use criterion::{black_box, criterion_group, criterion_main, Criterion};
use realm_router::benchmark_support::{DecoratedCallFixture, DecoratorMatchFixture};
use tokio::runtime::Builder;

const MATCH_BUCKETS_SMALL: usize = 16;
const MATCH_BUCKETS_LARGE: usize = 1024;
const CALL_DECORATORS: usize = 3;

fn decorator_criterion(c: &mut Criterion) {
    let small_fixture = DecoratorMatchFixture::new(MATCH_BUCKETS_SMALL);
    let large_fixture = DecoratorMatchFixture::new(MATCH_BUCKETS_LARGE);

    let mut match_group = c.benchmark_group("decorator_match");
    match_group.bench_function("buckets_16", |b| {
        b.iter(|| black_box(small_fixture.match_count()));
    });
    match_group.bench_function("buckets_1024", |b| {
        b.iter(|| black_box(large_fixture.match_count()));
    });
    match_group.finish();

    let runtime = Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .expect("benchmark runtime should build");
    let plain_fixture = runtime
        .block_on(DecoratedCallFixture::new(0))
        .expect("undecorated call fixture should build");
    let decorated_fixture = runtime
        .block_on(DecoratedCallFixture::new(CALL_DECORATORS))
        .expect("decorated call fixture should build");

    let mut call_group = c.benchmark_group("call_round_trip");
    call_group.bench_function("undecorated", |b| {
        let fixture = &plain_fixture;
        b.to_async(&runtime).iter(|| async move {
            let count = fixture.call_once().await.expect("call should succeed");
            black_box(count);
        });
    });
    call_group.bench_function("three_sync_precall", |b| {
        let fixture = &decorated_fixture;
        b.to_async(&runtime).iter(|| async move {
            let count = fixture.call_once().await.expect("call should succeed");
            black_box(count);
        });
    });
    call_group.finish();
}

criterion_group!(benches, decorator_criterion);
criterion_main!(benches);
