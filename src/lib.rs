//! Async Stage Chains with Ordered Fan-Out
//!
//! A small, runtime-agnostic toolkit for the most common shape of async orchestration: a chain
//! of dependent steps where one step fans out into many independent operations whose results
//! must be gathered, in order, before the chain continues.
//!
//! # Features
//!
//! - **Dependent stages**: [`StageRunner`] threads each stage's output into the next stage and
//!   stops at the first failure. Stages are composed with type-state, so wiring a stage whose
//!   input does not match the previous output fails to compile.
//! - **Ordered fan-out**: [`FanOut::collect`] starts every sub-operation before awaiting any of
//!   them and returns the results in *input* order, whatever order they complete in.
//! - **Short-circuit on first error**: the first failing sub-operation decides the batch. Later
//!   results are ignored and, by default, running siblings are aborted.
//! - **Exactly-once delivery**: a batch outcome travels through a single oneshot channel, so a
//!   fan-out resolves once with either the full ordered vector or the first error.
//! - **Runtime-agnostic**: bring your own spawner (Tokio, smol, futures-executor, ...) or run the
//!   fan-out inside the current task with [`FanOut::local`].
//! - **Panics become errors**: a panicking sub-operation is reported as
//!   [`CollectError::TaskPanicked`] instead of leaving the batch waiting forever.
//!
//! # Quick Start
//!
//! ```
//! use stagefan::{stage_fn, CollectError, FanOut, StageRunner};
//!
//! # futures::executor::block_on(async {
//! let fan_out = FanOut::local();
//!
//! let runner = StageRunner::<u64, u64, CollectError>::new()
//!     // Stage 0: produce some work
//!     .then(stage_fn("range", |n: u64| async move { Ok((1..=n).collect::<Vec<_>>()) }))
//!     // Stage 1: fan out over it, results come back in input order
//!     .then(stage_fn("square", move |items: Vec<u64>| {
//!         let fan_out = fan_out.clone();
//!         async move { fan_out.collect(items, |i| async move { Ok(i * i) }).await }
//!     }))
//!     // Stage 2: reduce
//!     .then(stage_fn("sum", |squares: Vec<u64>| async move { Ok(squares.iter().sum::<u64>()) }));
//!
//! assert_eq!(runner.run(3).await, Ok(14));
//! # });
//! ```
//!
//! # Core Concepts
//!
//! ## Stages
//!
//! A [`Stage`] consumes one value and produces the next, or fails. [`stage_fn`] turns a named
//! async closure into a stage. Stage `i + 1` never starts before stage `i` has resolved, and an
//! error from any stage is returned to the caller unchanged. An empty [`StageRunner`] returns its
//! input.
//!
//! ## Fan-out
//!
//! [`FanOut::collect`] maps every input to a sub-operation. Each sub-operation carries its input
//! index and reports into a shared batch: one slot per index, a count of slots still pending and
//! a write-once failure flag. The success that fills the last slot delivers the ordered values;
//! the first failure delivers itself and every later report is ignored. An empty input resolves
//! immediately with an empty vector.
//!
//! ## Spawners
//!
//! The spawner is a closure that receives each sub-operation as a
//! `BoxFuture<'static, ()>` and returns a future that completes when it is done:
//!
//! ```ignore
//! // Tokio
//! FanOut::new(|fut: BoxFuture<'static, ()>| tokio::spawn(fut).map(|_| ()));
//!
//! // smol (dropping a smol task cancels it, so aborted batches stop right away)
//! FanOut::new(|fut: BoxFuture<'static, ()>| smol::spawn(fut));
//!
//! // No runtime: everything is polled by the collecting task itself
//! FanOut::local();
//! ```
//!
//! # Cancellation
//!
//! With [`FanOut::cancel_on_failure`] enabled (the default) every sub-operation is wrapped in
//! [`futures::future::Abortable`] and the first failure aborts the rest; they stop at their next
//! poll. With it disabled, siblings run to completion and their results are discarded. Either
//! way the caller sees only the first error. Timeouts are deliberately not built in: wrap
//! [`StageRunner::run`] in your runtime's timeout if you need one.
//!
//! # Error Handling
//!
//! Stages and sub-operations fail with the caller's own error type. The collector adds only the
//! two failures it can cause itself, [`CollectError::TaskPanicked`] and
//! [`CollectError::Abandoned`], and converts them with `From<CollectError>`, so one error type
//! flows through a whole chain.
//!
//! # Largest File
//!
//! The [`largest`] module is the worked example the primitives were built for: list a directory,
//! fetch every entry's metadata concurrently, and return the name of the largest plain file.
//! It runs against any [`EntryProvider`]; [`TokioFs`] (feature `tokio`) uses `tokio::fs`.
//!
//! # Optional Tracing Support
//!
//! Instrumentation goes through the `tracing` crate and is compiled out entirely unless the
//! `tracing` feature is enabled:
//!
//! ```toml
//! [dependencies]
//! stagefan = { version = "0.1", features = ["tracing"] }
//! tracing-subscriber = "0.3"
//! ```
//!
//! ## Log Levels
//!
//! - **INFO**: chain start and completion
//! - **DEBUG**: stage boundaries, fan-out size, batch delivery
//! - **TRACE**: individual slot completions and ignored late completions
//! - **WARN/ERROR**: stage failures, caught panics, abandoned batches
//!
//! ```bash
//! RUST_LOG=stagefan=debug cargo run --features cli --bin largest -- /var/log
//! ```

mod batch;
mod error;
mod fanout;
pub mod largest;
mod provider;
mod stage;

// Public re-exports
pub use error::CollectError;
pub use fanout::{FanOut, LocalSpawner};
pub use largest::{largest_file, largest_file_stages, LargestError};
pub use provider::{EntryMetadata, EntryProvider};
pub use stage::{stage_fn, Stage, StageFn, StageRunner};

#[cfg(feature = "tokio")]
pub use provider::TokioFs;
