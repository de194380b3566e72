// Common test utilities and helpers for the test suite

#![allow(dead_code)]

use std::time::Duration;

use futures::future::{BoxFuture, FutureExt};
use stagefan::{CollectError, FanOut};

/// Error type for fan-out tests: either a scripted failure at an index or a collector failure.
#[derive(Debug, Clone, PartialEq)]
pub enum TestError {
    Op(usize),
    Collect(CollectError),
}

impl From<CollectError> for TestError {
    fn from(err: CollectError) -> Self {
        TestError::Collect(err)
    }
}

/// Order in which fanned-out sub-operations should complete.
#[derive(Debug, Clone, Copy)]
pub enum Order {
    Forward,
    Reversed,
    Shuffled,
}

impl Order {
    /// Delay for each of `n` sub-operations so that they finish in this order, 10ms apart.
    pub fn delays(self, n: usize) -> Vec<Duration> {
        let mut delays = vec![Duration::ZERO; n];
        for (rank, index) in self.completion_sequence(n).into_iter().enumerate() {
            delays[index] = Duration::from_millis(10 * (rank as u64 + 1));
        }
        delays
    }

    /// Indices of `n` sub-operations in the order they complete.
    pub fn completion_sequence(self, n: usize) -> Vec<usize> {
        let mut indices: Vec<usize> = (0..n).collect();
        match self {
            Order::Forward => {}
            Order::Reversed => indices.reverse(),
            // Fixed scramble: deterministic, but neither forward nor reversed.
            Order::Shuffled => indices.sort_by_key(|&i| ((i as u64 * 2_654_435_761) % 1_009, i)),
        }
        indices
    }
}

/// Spawner handing sub-operations to the ambient Tokio runtime.
pub fn tokio_spawner(fut: BoxFuture<'static, ()>) -> BoxFuture<'static, ()> {
    tokio::spawn(fut).map(|_| ()).boxed()
}

pub type TokioFanOut = FanOut<fn(BoxFuture<'static, ()>) -> BoxFuture<'static, ()>>;

pub fn tokio_fan_out() -> TokioFanOut {
    FanOut::new(tokio_spawner as fn(BoxFuture<'static, ()>) -> BoxFuture<'static, ()>)
}

/// Current-thread runtime with a paused clock: sleeps complete instantly, in deadline order.
pub fn paused_runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .start_paused(true)
        .build()
        .unwrap()
}

/// Yield to the executor once, waking immediately. Works on any runtime.
pub async fn yield_now() {
    let mut yielded = false;
    futures::future::poll_fn(|cx| {
        if yielded {
            std::task::Poll::Ready(())
        } else {
            yielded = true;
            cx.waker().wake_by_ref();
            std::task::Poll::Pending
        }
    })
    .await
}
