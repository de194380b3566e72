//! Largest-file chain over an in-memory directory

use std::sync::Arc;

use criterion::{BenchmarkId, Criterion};
use futures::future::BoxFuture;
use futures::FutureExt;
use stagefan::{largest_file_stages, EntryMetadata, FanOut};
use stagefan_test::MemoryProvider;

pub fn bench_largest_file(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    let mut group = c.benchmark_group("largest_file");
    for entries in [10usize, 1_000] {
        let names: Vec<String> = (0..entries).map(|i| format!("entry-{i:05}")).collect();
        let provider = MemoryProvider::new().with_dir(
            "/bench",
            names.iter().enumerate().map(|(i, name)| {
                let metadata = if i % 4 == 0 {
                    EntryMetadata::dir(1 << 20)
                } else {
                    EntryMetadata::file((i as u64 * 7_919) % 10_007)
                };
                (name.as_str(), metadata)
            }),
        );
        let runner = largest_file_stages(
            Arc::new(provider),
            FanOut::new(|fut: BoxFuture<'static, ()>| tokio::spawn(fut).map(|_| ())),
        );

        group.bench_with_input(BenchmarkId::from_parameter(entries), &entries, |b, _| {
            b.iter(|| rt.block_on(runner.run("/bench".into())).unwrap());
        });
    }
    group.finish();
}
