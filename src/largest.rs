//! Find the largest plain file in a directory.
//!
//! The chain built by [`largest_file_stages`] has three stages:
//!
//! 1. `list_entries`: list the directory through the [`EntryProvider`]
//! 2. `fetch_metadata`: fan out one metadata request per entry with [`FanOut::collect`]
//! 3. `pick_largest`: keep plain files and pick the strictly largest, first one on ties
//!
//! Every stage is an ordinary function of the previous stage's output; no stage nests another
//! asynchronous call inside a completion handler.

use std::ffi::OsString;
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::future::BoxFuture;
use thiserror::Error;

#[cfg(feature = "tracing")]
use tracing::debug;

use crate::error::CollectError;
use crate::fanout::FanOut;
use crate::provider::{EntryMetadata, EntryProvider};
use crate::stage::{stage_fn, StageRunner};

/// Errors surfaced by the largest-file pipeline.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LargestError {
    /// The I/O provider failed; the error is passed through as-is.
    #[error(transparent)]
    Provider(#[from] io::Error),

    /// The directory holds no plain files, so there is no largest one.
    #[error("no plain files found in {}", dir.display())]
    NoFiles { dir: PathBuf },

    /// The metadata fan-out failed on its own (panic or abandoned batch).
    #[error(transparent)]
    Collect(#[from] CollectError),
}

/// Output of the listing stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listing {
    pub dir: PathBuf,
    pub names: Vec<OsString>,
}

/// One directory entry with its metadata, in listing order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub name: OsString,
    pub metadata: EntryMetadata,
}

/// Output of the metadata stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Survey {
    pub dir: PathBuf,
    pub entries: Vec<Entry>,
}

/// Left fold keeping the kept item with the strictly greatest size.
///
/// Ties keep the item seen first. `Iterator::max_by_key` returns the *last* maximum, which is why
/// this is a fold.
pub fn largest_by<'a, T, K, S>(items: &'a [T], keep: K, size: S) -> Option<&'a T>
where
    K: Fn(&T) -> bool,
    S: Fn(&T) -> u64,
{
    items
        .iter()
        .filter(|item| keep(item))
        .fold(None, |best, item| match best {
            Some(best) if size(item) <= size(best) => Some(best),
            _ => Some(item),
        })
}

/// The reduction stage: the largest plain file among `entries`.
///
/// # Errors
///
/// [`LargestError::NoFiles`] when no entry is a plain file.
pub fn pick_largest<'a>(dir: &Path, entries: &'a [Entry]) -> Result<&'a Entry, LargestError> {
    largest_by(entries, |entry| entry.metadata.is_file, |entry| entry.metadata.size).ok_or_else(
        || LargestError::NoFiles {
            dir: dir.to_path_buf(),
        },
    )
}

/// Build the list → fan-out → reduce chain over `provider`.
///
/// The returned runner takes a directory path and resolves with the name (not the full path) of
/// its largest plain file. Entries are looked up by their raw names; only the returned name is
/// converted to UTF-8, lossily.
pub fn largest_file_stages<P, S, SF>(
    provider: Arc<P>,
    fan_out: FanOut<S>,
) -> StageRunner<PathBuf, String, LargestError>
where
    P: EntryProvider,
    S: Fn(BoxFuture<'static, ()>) -> SF + Send + Sync + 'static,
    SF: Future<Output = ()> + Send + 'static,
{
    let lister = Arc::clone(&provider);
    let fan_out = Arc::new(fan_out);

    StageRunner::new()
        .then(stage_fn("list_entries", move |dir: PathBuf| {
            let provider = Arc::clone(&lister);
            async move {
                let names = provider.list_entries(&dir).await?;

                #[cfg(feature = "tracing")]
                debug!(dir = %dir.display(), count = names.len(), "listed directory");

                Ok::<_, LargestError>(Listing { dir, names })
            }
        }))
        .then(stage_fn("fetch_metadata", move |listing: Listing| {
            let provider = Arc::clone(&provider);
            let fan_out = Arc::clone(&fan_out);
            async move {
                let Listing { dir, names } = listing;
                let paths: Vec<PathBuf> = names.iter().map(|name| dir.join(name)).collect();
                let metadata = fan_out
                    .collect(paths, |path| {
                        let provider = Arc::clone(&provider);
                        async move {
                            provider
                                .fetch_metadata(&path)
                                .await
                                .map_err(LargestError::from)
                        }
                    })
                    .await?;

                let entries = names
                    .into_iter()
                    .zip(metadata)
                    .map(|(name, metadata)| Entry { name, metadata })
                    .collect();
                Ok::<_, LargestError>(Survey { dir, entries })
            }
        }))
        .then(stage_fn("pick_largest", |survey: Survey| async move {
            let largest = pick_largest(&survey.dir, &survey.entries)?;
            Ok::<_, LargestError>(largest.name.to_string_lossy().into_owned())
        }))
}

/// Name of the largest plain file directly inside `dir`.
///
/// # Examples
///
/// ```no_run
/// # #[cfg(feature = "tokio")]
/// # async fn example() -> Result<(), stagefan::LargestError> {
/// use std::sync::Arc;
/// use futures::future::BoxFuture;
/// use futures::FutureExt;
/// use stagefan::{largest_file, FanOut, TokioFs};
///
/// let fan_out = FanOut::new(|fut: BoxFuture<'static, ()>| tokio::spawn(fut).map(|_| ()));
/// let name = largest_file(Arc::new(TokioFs), fan_out, "/var/log").await?;
/// println!("{name}");
/// # Ok(())
/// # }
/// ```
///
/// # Errors
///
/// The provider's [`io::Error`] for a failed listing or stat, [`LargestError::NoFiles`] when the
/// directory has no plain files, or [`LargestError::Collect`] when the fan-out itself fails.
pub async fn largest_file<P, S, SF>(
    provider: Arc<P>,
    fan_out: FanOut<S>,
    dir: impl Into<PathBuf>,
) -> Result<String, LargestError>
where
    P: EntryProvider,
    S: Fn(BoxFuture<'static, ()>) -> SF + Send + Sync + 'static,
    SF: Future<Output = ()> + Send + 'static,
{
    largest_file_stages(provider, fan_out)
        .run(dir.into())
        .await
}
