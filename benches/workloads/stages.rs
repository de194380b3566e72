//! Stage-chain overhead benchmarks

use criterion::{BenchmarkId, Criterion};
use stagefan::{stage_fn, StageRunner};

fn chain(depth: usize) -> StageRunner<u64, u64, ()> {
    (0..depth).fold(StageRunner::new(), |runner, i| {
        runner.then(stage_fn(format!("add-{i}"), |x: u64| async move { Ok(x + 1) }))
    })
}

pub fn bench_chain_depth(c: &mut Criterion) {
    let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();

    let mut group = c.benchmark_group("chain_depth");
    for depth in [1usize, 10, 100] {
        let runner = chain(depth);
        group.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |b, &depth| {
            b.iter(|| {
                let out = rt.block_on(runner.run(0)).unwrap();
                assert_eq!(out, depth as u64);
            });
        });
    }
    group.finish();
}
