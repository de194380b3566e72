//! Chains that fan out inside a stage, and chains nested in chains.

use std::sync::Arc;

use parking_lot::Mutex;
use stagefan::{stage_fn, FanOut, Stage, StageRunner};

use crate::common::{tokio_fan_out, TestError};

#[tokio::test]
async fn test_fan_out_stage_between_sequential_stages() {
    let fan_out = tokio_fan_out();

    let runner = StageRunner::<usize, usize, TestError>::new()
        .then(stage_fn("expand", |n: usize| async move { Ok((0..n).collect::<Vec<_>>()) }))
        .then(stage_fn("cube", move |items: Vec<usize>| {
            let fan_out = fan_out.clone();
            async move { fan_out.collect(items, |i| async move { Ok(i * i * i) }).await }
        }))
        .then(stage_fn("last", |cubes: Vec<usize>| async move {
            Ok(cubes.last().copied().unwrap_or_default())
        }));

    assert_eq!(runner.run(5).await, Ok(64));
    assert_eq!(runner.run(0).await, Ok(0));
    assert_eq!(runner.stage_names(), ["expand", "cube", "last"]);
}

#[test]
fn test_fan_out_failure_skips_reduce_stage() {
    let reduced = Arc::new(Mutex::new(false));
    let flag = Arc::clone(&reduced);

    let runner = StageRunner::<Vec<usize>, Vec<usize>, TestError>::new()
        .then(stage_fn("check", |items: Vec<usize>| async move {
            FanOut::local()
                .collect(items, |i| async move {
                    if i % 2 == 0 {
                        Ok(i)
                    } else {
                        Err(TestError::Op(i))
                    }
                })
                .await
        }))
        .then(stage_fn("reduce", move |evens: Vec<usize>| {
            let flag = Arc::clone(&flag);
            async move {
                *flag.lock() = true;
                Ok(evens.into_iter().sum::<usize>())
            }
        }));

    let result = futures::executor::block_on(runner.run(vec![2, 4, 7, 8]));

    assert_eq!(result, Err(TestError::Op(7)));
    assert!(!*reduced.lock());
}

#[test]
fn test_nested_chain_runs_as_one_stage() {
    let inner = StageRunner::<i64, i64, TestError>::new()
        .then(stage_fn("double", |n: i64| async move { Ok(n * 2) }))
        .then(stage_fn("inc", |n: i64| async move { Ok(n + 1) }));
    assert_eq!(inner.name(), "chain");

    let outer = StageRunner::<i64, i64, TestError>::new()
        .then(inner.clone())
        .then(inner)
        .then(stage_fn("show", |n: i64| async move { Ok(n.to_string()) }));

    // (3 * 2 + 1) * 2 + 1
    assert_eq!(futures::executor::block_on(outer.run(3)), Ok("15".to_string()));
    assert_eq!(outer.stage_names(), ["chain", "chain", "show"]);
}

struct Offset(i64);

impl Stage<i64> for Offset {
    type Output = i64;
    type Error = TestError;

    fn run(&self, input: i64) -> impl std::future::Future<Output = Result<i64, TestError>> + Send {
        let offset = self.0;
        async move { Ok(input + offset) }
    }

    fn name(&self) -> &str {
        "offset"
    }
}

#[test]
fn test_hand_written_stage() {
    let runner = StageRunner::<i64, i64, TestError>::new()
        .then(Offset(10))
        .then(Offset(-3));

    assert_eq!(futures::executor::block_on(runner.run(0)), Ok(7));
    assert_eq!(runner.stage_names(), ["offset", "offset"]);
}
