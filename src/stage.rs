//! Dependent stage chains.
//!
//! A [`StageRunner`] threads a value through an ordered list of async stages. Stages are composed
//! with [`StageRunner::then`], which changes the runner's output type to the new stage's output,
//! so a stage whose input does not match the previous output is a compile error rather than a
//! runtime one.
//!
//! ```text
//! input ─▶ stage 0 ─▶ stage 1 ─▶ … ─▶ stage n-1 ─▶ Ok(output)
//!             │           │                │
//!             └───────────┴──── Err(e) ────┴──▶ Err(e)   (no later stage runs)
//! ```

use std::future::Future;
use std::sync::Arc;

use futures::future::{self, BoxFuture};
use futures::FutureExt;

#[cfg(feature = "tracing")]
use tracing::{debug, info, warn};

/// One step of a chain: consumes the previous step's output and produces the next input.
///
/// Most stages are closures wrapped with [`stage_fn`]. Implement the trait directly when a stage
/// carries state or wants a computed name.
///
/// # Examples
///
/// ```
/// use std::future::Future;
/// use stagefan::Stage;
///
/// struct Scale(u64);
///
/// impl Stage<u64> for Scale {
///     type Output = u64;
///     type Error = String;
///
///     fn run(&self, input: u64) -> impl Future<Output = Result<u64, String>> + Send {
///         let factor = self.0;
///         async move { input.checked_mul(factor).ok_or_else(|| "overflow".to_string()) }
///     }
///
///     fn name(&self) -> &str {
///         "scale"
///     }
/// }
/// ```
pub trait Stage<In>: Send + Sync {
    type Output: Send + 'static;
    type Error: Send + 'static;

    fn run(&self, input: In) -> impl Future<Output = Result<Self::Output, Self::Error>> + Send;

    /// Human-readable name used in logs and [`StageRunner::stage_names`].
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// A [`Stage`] built from a named async closure. See [`stage_fn`].
pub struct StageFn<F> {
    name: String,
    f: F,
}

impl<In, F, Fut, O, E> Stage<In> for StageFn<F>
where
    F: Fn(In) -> Fut + Send + Sync,
    Fut: Future<Output = Result<O, E>> + Send,
    O: Send + 'static,
    E: Send + 'static,
{
    type Output = O;
    type Error = E;

    fn run(&self, input: In) -> impl Future<Output = Result<O, E>> + Send {
        (self.f)(input)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Create a stage from a closure returning a future.
///
/// ```
/// use stagefan::{stage_fn, StageRunner};
///
/// # futures::executor::block_on(async {
/// let runner = StageRunner::<&'static str, _, std::num::ParseIntError>::new()
///     .then(stage_fn("parse", |s: &'static str| async move { s.trim().parse::<i64>() }))
///     .then(stage_fn("negate", |n: i64| async move { Ok(-n) }));
///
/// assert_eq!(runner.run(" 42 ").await, Ok(-42));
/// assert!(runner.run("forty-two").await.is_err());
/// # });
/// ```
pub fn stage_fn<F>(name: impl Into<String>, f: F) -> StageFn<F> {
    StageFn {
        name: name.into(),
        f,
    }
}

type ChainFn<In, Out, E> = Arc<dyn Fn(In) -> BoxFuture<'static, Result<Out, E>> + Send + Sync>;

/// Runs stages in strict dependency order, stopping at the first failure.
///
/// Stage `i + 1` is invoked only after stage `i` has resolved successfully, and receives its
/// value. The first error is returned unchanged and no further stage is invoked. A runner with no
/// stages returns its input.
///
/// A runner holds no per-run state: [`StageRunner::run`] can be called any number of times,
/// concurrently if needed. Cloning is cheap.
pub struct StageRunner<In, Out, E> {
    chain: ChainFn<In, Out, E>,
    names: Vec<String>,
}

impl<In, Out, E> Clone for StageRunner<In, Out, E> {
    fn clone(&self) -> Self {
        Self {
            chain: Arc::clone(&self.chain),
            names: self.names.clone(),
        }
    }
}

impl<In, E> StageRunner<In, In, E>
where
    In: Send + 'static,
    E: Send + 'static,
{
    /// Create an empty chain, which returns its input unchanged.
    pub fn new() -> Self {
        let chain: ChainFn<In, In, E> = Arc::new(|input: In| future::ready(Ok(input)).boxed());
        Self {
            chain,
            names: Vec::new(),
        }
    }
}

impl<In, E> Default for StageRunner<In, In, E>
where
    In: Send + 'static,
    E: Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<In, Out, E> StageRunner<In, Out, E>
where
    In: Send + 'static,
    Out: Send + 'static,
    E: Send + 'static,
{
    /// Append a stage that consumes this chain's current output.
    pub fn then<S>(self, stage: S) -> StageRunner<In, S::Output, E>
    where
        S: Stage<Out, Error = E> + 'static,
    {
        let index = self.names.len();
        let mut names = self.names;
        names.push(stage.name().to_string());

        #[cfg(feature = "tracing")]
        debug!(stage = index, name = stage.name(), "stage appended to chain");

        let previous = self.chain;
        let stage = Arc::new(stage);
        let chain: ChainFn<In, S::Output, E> = Arc::new(move |input: In| {
            let previous = Arc::clone(&previous);
            let stage = Arc::clone(&stage);
            async move {
                let intermediate = previous(input).await?;
                run_stage(index, stage.as_ref(), intermediate).await
            }
            .boxed()
        });

        StageRunner { chain, names }
    }

    /// Run every stage in order, starting from `input`.
    ///
    /// # Errors
    ///
    /// Returns the error of the first stage that fails.
    pub async fn run(&self, input: In) -> Result<Out, E> {
        #[cfg(feature = "tracing")]
        info!(stages = self.names.len(), "starting stage chain");

        let result = (self.chain)(input).await;

        #[cfg(feature = "tracing")]
        match &result {
            Ok(_) => info!("stage chain completed successfully"),
            Err(_) => warn!("stage chain failed"),
        }

        result
    }

    /// Number of stages in the chain.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Stage names in execution order.
    pub fn stage_names(&self) -> &[String] {
        &self.names
    }
}

/// A whole chain can be nested as one stage of another chain.
impl<In, Out, E> Stage<In> for StageRunner<In, Out, E>
where
    In: Send + 'static,
    Out: Send + 'static,
    E: Send + 'static,
{
    type Output = Out;
    type Error = E;

    fn run(&self, input: In) -> impl Future<Output = Result<Out, E>> + Send {
        (self.chain)(input)
    }

    fn name(&self) -> &str {
        "chain"
    }
}

#[cfg_attr(not(feature = "tracing"), allow(unused_variables))]
async fn run_stage<S, In>(index: usize, stage: &S, input: In) -> Result<S::Output, S::Error>
where
    S: Stage<In>,
{
    #[cfg(feature = "tracing")]
    debug!(stage = index, name = stage.name(), "stage started");

    let result = stage.run(input).await;

    #[cfg(feature = "tracing")]
    match &result {
        Ok(_) => debug!(stage = index, name = stage.name(), "stage finished"),
        Err(_) => warn!(
            stage = index,
            name = stage.name(),
            "stage failed, skipping the rest of the chain"
        ),
    }

    result
}
