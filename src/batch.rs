//! Shared completion state for one fan-out call.
//!
//! A [`Batch`] owns one [`Slot`] per sub-operation, the count of slots still pending, the
//! write-once failure flag and the single sender that delivers the final outcome. Every
//! sub-operation reports through [`Batch::complete`], from whatever thread its runtime polls it
//! on; the mutex serializes those reports so the slot transitions below stay atomic.
//!
//! ```text
//! Pending ──Ok(v)──▶ Filled(v)
//!    │
//!    └──first Err / sibling failed──▶ Irrelevant
//! ```
//!
//! No slot ever leaves `Filled` or `Irrelevant`.

use futures::channel::oneshot;
use futures::future::AbortHandle;
use parking_lot::Mutex;

#[cfg(feature = "tracing")]
use tracing::{debug, trace};

/// Position-addressed holder for one sub-operation's eventual result.
#[derive(Debug, PartialEq)]
pub(crate) enum Slot<T> {
    Pending,
    Filled(T),
    Irrelevant,
}

impl<T> Slot<T> {
    fn into_value(self) -> Option<T> {
        match self {
            Slot::Filled(value) => Some(value),
            Slot::Pending | Slot::Irrelevant => None,
        }
    }
}

/// What a single call to [`Batch::complete`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Completion {
    /// The value was stored; other slots are still pending.
    Recorded,
    /// This completion decided the batch and the outcome was sent.
    Delivered,
    /// The batch was already decided (or the slot was not pending); nothing changed.
    Ignored,
}

/// Receiving half of a batch's single delivery.
pub(crate) type Delivery<T, E> = oneshot::Receiver<Result<Vec<T>, E>>;

struct BatchInner<T, E> {
    slots: Vec<Slot<T>>,
    remaining: usize,
    failed: bool,
    deliver: Option<oneshot::Sender<Result<Vec<T>, E>>>,
    aborts: Vec<AbortHandle>,
}

pub(crate) struct Batch<T, E> {
    inner: Mutex<BatchInner<T, E>>,
}

impl<T, E> Batch<T, E> {
    /// Create the state for `len` sub-operations.
    ///
    /// `aborts` are triggered on the first failure; pass an empty vector to let siblings run to
    /// completion instead.
    pub(crate) fn new(len: usize, aborts: Vec<AbortHandle>) -> (Self, Delivery<T, E>) {
        let (tx, rx) = oneshot::channel();
        let batch = Self {
            inner: Mutex::new(BatchInner {
                slots: (0..len).map(|_| Slot::Pending).collect(),
                remaining: len,
                failed: false,
                deliver: Some(tx),
                aborts,
            }),
        };
        (batch, rx)
    }

    /// Record the outcome of the sub-operation at `index`.
    ///
    /// The first failure wins: it marks every pending slot irrelevant, aborts the siblings and is
    /// delivered immediately. Anything reported after that is ignored. A success fills its slot,
    /// and the success that fills the last one delivers the values in slot order.
    pub(crate) fn complete(&self, index: usize, outcome: Result<T, E>) -> Completion {
        let mut inner = self.inner.lock();

        if inner.failed || inner.deliver.is_none() {
            #[cfg(feature = "tracing")]
            trace!(index, "ignoring completion of an already decided batch");
            return Completion::Ignored;
        }

        match outcome {
            Err(err) => {
                inner.failed = true;
                for slot in inner.slots.iter_mut() {
                    if matches!(slot, Slot::Pending) {
                        *slot = Slot::Irrelevant;
                    }
                }
                let deliver = inner.deliver.take();
                let aborts = std::mem::take(&mut inner.aborts);
                drop(inner);

                #[cfg(feature = "tracing")]
                debug!(
                    index,
                    aborted = aborts.len(),
                    "first failure recorded, delivering error"
                );

                for handle in aborts {
                    handle.abort();
                }
                // The caller may have stopped waiting; nothing to do in that case.
                if let Some(tx) = deliver {
                    let _ = tx.send(Err(err));
                }
                Completion::Delivered
            }
            Ok(value) => {
                match inner.slots.get_mut(index) {
                    Some(slot) if matches!(slot, Slot::Pending) => *slot = Slot::Filled(value),
                    _ => return Completion::Ignored,
                }
                inner.remaining -= 1;

                #[cfg(feature = "tracing")]
                trace!(index, remaining = inner.remaining, "slot filled");

                if inner.remaining > 0 {
                    return Completion::Recorded;
                }

                let values: Vec<T> = std::mem::take(&mut inner.slots)
                    .into_iter()
                    .filter_map(Slot::into_value)
                    .collect();
                let deliver = inner.deliver.take();
                drop(inner);

                #[cfg(feature = "tracing")]
                debug!(count = values.len(), "all slots filled, delivering values");

                if let Some(tx) = deliver {
                    let _ = tx.send(Ok(values));
                }
                Completion::Delivered
            }
        }
    }
}

#[cfg(test)]
impl<T: Clone, E> Batch<T, E> {
    pub(crate) fn slots(&self) -> Vec<Slot<T>> {
        self.inner
            .lock()
            .slots
            .iter()
            .map(|slot| match slot {
                Slot::Pending => Slot::Pending,
                Slot::Filled(value) => Slot::Filled(value.clone()),
                Slot::Irrelevant => Slot::Irrelevant,
            })
            .collect()
    }

    pub(crate) fn remaining(&self) -> usize {
        self.inner.lock().remaining
    }
}
