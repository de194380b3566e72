//! The asynchronous I/O collaborator the largest-file pipeline runs against.
//!
//! [`EntryProvider`] is the only seam between the orchestration code and the outside world. The
//! crate ships [`TokioFs`] (behind the `tokio` feature) for real directories; tests substitute an
//! in-memory provider.

use std::ffi::OsString;
use std::future::Future;
use std::io;
use std::path::Path;

/// Per-entry metadata the reduction stage needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EntryMetadata {
    /// `true` for a plain file, `false` for directories and anything else.
    pub is_file: bool,
    /// Size in bytes.
    pub size: u64,
}

impl EntryMetadata {
    pub fn file(size: u64) -> Self {
        Self {
            is_file: true,
            size,
        }
    }

    pub fn dir(size: u64) -> Self {
        Self {
            is_file: false,
            size,
        }
    }
}

impl From<std::fs::Metadata> for EntryMetadata {
    fn from(metadata: std::fs::Metadata) -> Self {
        Self {
            is_file: metadata.is_file(),
            size: metadata.len(),
        }
    }
}

/// Lists directories and fetches entry metadata asynchronously.
///
/// Failures are plain [`io::Error`]s and reach the caller unchanged.
pub trait EntryProvider: Send + Sync + 'static {
    /// Names of the entries directly inside `dir`, without the directory prefix.
    ///
    /// Names are returned as the platform gives them, so joining one onto `dir` always addresses
    /// the listed entry, whether or not it is valid UTF-8.
    fn list_entries(&self, dir: &Path) -> impl Future<Output = io::Result<Vec<OsString>>> + Send;

    /// Metadata for the entry at `path`.
    fn fetch_metadata(&self, path: &Path) -> impl Future<Output = io::Result<EntryMetadata>> + Send;
}

/// [`EntryProvider`] backed by `tokio::fs`.
///
/// Listing keeps the order `read_dir` yields and the raw [`OsString`] names. Metadata follows
/// symlinks, so a link to a file counts as a file.
#[cfg(feature = "tokio")]
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioFs;

#[cfg(feature = "tokio")]
impl EntryProvider for TokioFs {
    fn list_entries(&self, dir: &Path) -> impl Future<Output = io::Result<Vec<OsString>>> + Send {
        let dir = dir.to_path_buf();
        async move {
            let mut read_dir = tokio::fs::read_dir(&dir).await?;
            let mut names = Vec::new();
            while let Some(entry) = read_dir.next_entry().await? {
                names.push(entry.file_name());
            }
            Ok(names)
        }
    }

    fn fetch_metadata(&self, path: &Path) -> impl Future<Output = io::Result<EntryMetadata>> + Send {
        let path = path.to_path_buf();
        async move { tokio::fs::metadata(&path).await.map(EntryMetadata::from) }
    }
}
