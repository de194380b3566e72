//! Scripted providers for stagefan tests and benchmarks.
//!
//! This crate is not meant for public use and offers no stability guarantees.

use std::collections::HashMap;
use std::ffi::OsString;
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use parking_lot::Mutex;
use stagefan::{EntryMetadata, EntryProvider};

/// A provider call, recorded in the order it was made.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    List(PathBuf),
    Stat(PathBuf),
}

/// In-memory [`EntryProvider`] with per-path delays and injected failures.
///
/// Delays use `tokio::time::sleep`, so tests that depend on them should run on a Tokio runtime,
/// ideally with a paused clock.
#[derive(Debug, Default)]
pub struct MemoryProvider {
    dirs: HashMap<PathBuf, Vec<(String, EntryMetadata)>>,
    delays: HashMap<PathBuf, Duration>,
    failures: HashMap<PathBuf, io::ErrorKind>,
    calls: Mutex<Vec<Call>>,
    completed: Mutex<Vec<PathBuf>>,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a directory with its entries, listed in the given order.
    pub fn with_dir<'a>(
        mut self,
        dir: impl Into<PathBuf>,
        entries: impl IntoIterator<Item = (&'a str, EntryMetadata)>,
    ) -> Self {
        let entries = entries
            .into_iter()
            .map(|(name, metadata)| (name.to_string(), metadata))
            .collect();
        self.dirs.insert(dir.into(), entries);
        self
    }

    /// Delay every call for `path` (listing or stat) by `delay`.
    pub fn with_delay(mut self, path: impl Into<PathBuf>, delay: Duration) -> Self {
        self.delays.insert(path.into(), delay);
        self
    }

    /// Make every call for `path` fail with `kind` after its delay.
    pub fn with_failure(mut self, path: impl Into<PathBuf>, kind: io::ErrorKind) -> Self {
        self.failures.insert(path.into(), kind);
        self
    }

    /// Calls in the order they were made.
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    /// Number of stat calls made so far.
    pub fn stat_calls(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|call| matches!(call, Call::Stat(_)))
            .count()
    }

    /// Paths whose calls ran to completion (successfully or not), in completion order.
    pub fn completed(&self) -> Vec<PathBuf> {
        self.completed.lock().clone()
    }

    async fn settle(&self, path: &Path) -> io::Result<()> {
        if let Some(delay) = self.delays.get(path) {
            tokio::time::sleep(*delay).await;
        }
        self.completed.lock().push(path.to_path_buf());
        match self.failures.get(path) {
            Some(kind) => Err(io::Error::new(
                *kind,
                format!("injected failure for {}", path.display()),
            )),
            None => Ok(()),
        }
    }

    fn lookup(&self, path: &Path) -> Option<EntryMetadata> {
        let name = path.file_name()?.to_str()?;
        self.dirs
            .get(path.parent()?)?
            .iter()
            .find(|(entry, _)| entry == name)
            .map(|(_, metadata)| *metadata)
    }
}

impl EntryProvider for MemoryProvider {
    fn list_entries(&self, dir: &Path) -> impl Future<Output = io::Result<Vec<OsString>>> + Send {
        self.calls.lock().push(Call::List(dir.to_path_buf()));
        async move {
            self.settle(dir).await?;
            self.dirs
                .get(dir)
                .map(|entries| entries.iter().map(|(name, _)| OsString::from(name)).collect())
                .ok_or_else(|| {
                    io::Error::new(
                        io::ErrorKind::NotFound,
                        format!("no such directory: {}", dir.display()),
                    )
                })
        }
    }

    fn fetch_metadata(&self, path: &Path) -> impl Future<Output = io::Result<EntryMetadata>> + Send {
        self.calls.lock().push(Call::Stat(path.to_path_buf()));
        async move {
            self.settle(path).await?;
            self.lookup(path).ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("no such entry: {}", path.display()),
                )
            })
        }
    }
}
