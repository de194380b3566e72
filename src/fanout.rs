//! Ordered, short-circuiting fan-out over a runtime-agnostic spawner.
//!
//! [`FanOut::collect`] turns every input into a sub-operation, hands all of them to the spawner
//! before awaiting anything, and resolves with the values in input order or with the first
//! failure. The bookkeeping lives in [`Batch`](crate::batch); this module only wires
//! sub-operations to it and waits for the single delivery.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::future::{self, AbortHandle, AbortRegistration, Abortable, BoxFuture, Either};
use futures::stream::FuturesUnordered;
use futures::{pin_mut, FutureExt, StreamExt};

#[cfg(feature = "tracing")]
use tracing::{debug, error, warn};

use crate::batch::Batch;
use crate::error::CollectError;

/// Spawner used by [`FanOut::local`]: the future is driven in place by the collector itself.
pub type LocalSpawner = fn(BoxFuture<'static, ()>) -> BoxFuture<'static, ()>;

fn run_in_place(fut: BoxFuture<'static, ()>) -> BoxFuture<'static, ()> {
    fut
}

/// Runs one homogeneous async operation over every element of an input sequence.
///
/// The spawner decides where sub-operations run. It receives each sub-operation as a boxed
/// future and returns a future that resolves once the sub-operation is done:
///
/// - Tokio: `|fut| tokio::spawn(fut).map(|_| ())`
/// - Smol: `|fut| smol::spawn(fut)`
/// - futures-executor: `move |fut| pool.spawn_with_handle(fut).unwrap()`
/// - No runtime at all: [`FanOut::local`]
///
/// Sub-operations never report back through the returned future; they record their outcome in
/// shared batch state. A spawner that detaches the work and returns `future::ready(())` is
/// therefore just as valid.
///
/// # Examples
///
/// ```
/// use stagefan::{CollectError, FanOut};
///
/// # futures::executor::block_on(async {
/// let fan_out = FanOut::local();
///
/// let doubled = fan_out
///     .collect(vec![1, 2, 3], |n| async move { Ok::<_, CollectError>(n * 2) })
///     .await
///     .unwrap();
///
/// assert_eq!(doubled, vec![2, 4, 6]);
/// # });
/// ```
#[derive(Clone)]
pub struct FanOut<S> {
    spawner: S,
    cancel_on_failure: bool,
}

impl FanOut<LocalSpawner> {
    /// Drive every sub-operation concurrently inside the calling task.
    ///
    /// No runtime is needed. Sub-operations still overlap at their await points, but none of them
    /// runs in parallel on another thread. Outstanding siblings are dropped as soon as the batch
    /// is decided.
    pub fn local() -> Self {
        Self::new(run_in_place as LocalSpawner)
    }
}

impl Default for FanOut<LocalSpawner> {
    fn default() -> Self {
        Self::local()
    }
}

impl<S> FanOut<S> {
    /// Create a collector that hands sub-operations to `spawner`.
    pub fn new(spawner: S) -> Self {
        Self {
            spawner,
            cancel_on_failure: true,
        }
    }

    /// Whether the first failure aborts the siblings that are still running (default `true`).
    ///
    /// Aborted sub-operations stop at their next poll. With cancellation off they run to
    /// completion and whatever they produce is discarded.
    pub fn cancel_on_failure(mut self, cancel: bool) -> Self {
        self.cancel_on_failure = cancel;
        self
    }

    /// Apply `op` to every input concurrently and collect the results in input order.
    ///
    /// - Every sub-operation is handed to the spawner before any of them is awaited.
    /// - `output[i]` is the value produced for `inputs[i]`, whatever order they finish in.
    /// - The first failure resolves the call; later results are ignored.
    /// - An empty input resolves immediately with an empty vector.
    ///
    /// # Errors
    ///
    /// Returns the first error produced by a sub-operation, or a [`CollectError`] converted into
    /// `E` when a sub-operation panics or every sub-operation is dropped unfinished.
    pub async fn collect<I, F, Fut, T, E, SF>(&self, inputs: I, op: F) -> Result<Vec<T>, E>
    where
        I: IntoIterator,
        F: FnMut(I::Item) -> Fut,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: From<CollectError> + Send + 'static,
        S: Fn(BoxFuture<'static, ()>) -> SF,
        SF: Future<Output = ()>,
    {
        let operations: Vec<Fut> = inputs.into_iter().map(op).collect();
        let len = operations.len();

        if len == 0 {
            #[cfg(feature = "tracing")]
            debug!("empty fan-out, nothing to spawn");
            return Ok(Vec::new());
        }

        #[cfg(feature = "tracing")]
        debug!(
            count = len,
            cancel_on_failure = self.cancel_on_failure,
            "fanning out"
        );

        let (aborts, registrations): (Vec<AbortHandle>, Vec<Option<AbortRegistration>>) =
            if self.cancel_on_failure {
                (0..len)
                    .map(|_| {
                        let (handle, registration) = AbortHandle::new_pair();
                        (handle, Some(registration))
                    })
                    .unzip()
            } else {
                (Vec::new(), (0..len).map(|_| None).collect())
            };

        let (batch, delivery) = Batch::new(len, aborts);
        let batch = Arc::new(batch);

        let mut joins: FuturesUnordered<SF> = operations
            .into_iter()
            .zip(registrations)
            .enumerate()
            .map(|(index, (operation, registration))| {
                (self.spawner)(sub_operation(
                    index,
                    operation,
                    registration,
                    Arc::clone(&batch),
                ))
            })
            .collect();

        // Only sub-operations hold the batch from here on, so the delivery is cancelled once the
        // last of them is dropped without reporting.
        drop(batch);

        let drive = async move { while joins.next().await.is_some() {} };
        pin_mut!(drive);

        let delivered = match future::select(delivery, drive).await {
            Either::Left((delivered, _)) => delivered,
            Either::Right(((), delivery)) => delivery.await,
        };

        delivered.unwrap_or_else(|_| {
            #[cfg(feature = "tracing")]
            warn!(count = len, "every sub-operation was dropped before completing");
            Err(CollectError::Abandoned.into())
        })
    }
}

/// Wrap one operation so it records its outcome at `index`, converting a panic into a failure.
fn sub_operation<Fut, T, E>(
    index: usize,
    operation: Fut,
    registration: Option<AbortRegistration>,
    batch: Arc<Batch<T, E>>,
) -> BoxFuture<'static, ()>
where
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: From<CollectError> + Send + 'static,
{
    let run = async move {
        let outcome = AssertUnwindSafe(operation)
            .catch_unwind()
            .await
            .unwrap_or_else(|payload| {
                let panic_message = panic_message(payload.as_ref());

                #[cfg(feature = "tracing")]
                error!(index, panic_message = %panic_message, "sub-operation panicked");

                Err(E::from(CollectError::TaskPanicked {
                    index,
                    panic_message,
                }))
            });
        batch.complete(index, outcome);
    };

    match registration {
        Some(registration) => Abortable::new(run, registration).map(|_| ()).boxed(),
        None => run.boxed(),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
