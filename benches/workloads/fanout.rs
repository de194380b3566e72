//! Fan-out width benchmarks (1 → N sub-operations, gathered in order)

use criterion::{BenchmarkId, Criterion};
use futures::future::BoxFuture;
use futures::FutureExt;
use stagefan::{CollectError, FanOut};

pub fn bench_fanout_width(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let spawned = FanOut::new(|fut: BoxFuture<'static, ()>| tokio::spawn(fut).map(|_| ()));
    let local = FanOut::local();

    let mut group = c.benchmark_group("fanout_width");
    for width in [10usize, 100, 1_000, 10_000] {
        group.bench_with_input(BenchmarkId::new("tokio_spawn", width), &width, |b, &width| {
            b.iter(|| {
                rt.block_on(async {
                    spawned
                        .collect(0..width, |i| async move { Ok::<_, CollectError>(i * 2) })
                        .await
                        .unwrap()
                })
            });
        });

        group.bench_with_input(BenchmarkId::new("local", width), &width, |b, &width| {
            b.iter(|| {
                rt.block_on(async {
                    local
                        .collect(0..width, |i| async move { Ok::<_, CollectError>(i * 2) })
                        .await
                        .unwrap()
                })
            });
        });
    }
    group.finish();
}

#[derive(Debug)]
enum BenchError {
    Failed,
    Collect,
}

impl From<CollectError> for BenchError {
    fn from(_: CollectError) -> Self {
        BenchError::Collect
    }
}

pub fn bench_fanout_failure(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    // One early failure among 1000 sub-operations that would otherwise yield a few times.
    for cancel in [true, false] {
        let fan_out = FanOut::new(|fut: BoxFuture<'static, ()>| tokio::spawn(fut).map(|_| ()))
            .cancel_on_failure(cancel);
        let name = if cancel {
            "fanout_failure_cancel"
        } else {
            "fanout_failure_no_cancel"
        };

        c.bench_function(name, |b| {
            b.iter(|| {
                rt.block_on(async {
                    let result = fan_out
                        .collect(0..1_000usize, |i| async move {
                            if i == 0 {
                                return Err(BenchError::Failed);
                            }
                            for _ in 0..4 {
                                tokio::task::yield_now().await;
                            }
                            Ok(i)
                        })
                        .await;
                    assert!(matches!(result, Err(BenchError::Failed)));
                })
            });
        });
    }
}
