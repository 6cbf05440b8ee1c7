//! Best-effort removal of ephemeral extraction artefacts.
//!
//! Ephemeral extractions register their files and directories here. The
//! registry removes them when [`CleanupRegistry::run`] is called during an
//! orderly shutdown, or when the registry itself is dropped. Entries are
//! removed in reverse registration order so files go before the directories
//! that contain them.

use crate::events::EventLog;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tempfile::TempDir;

#[derive(Debug)]
enum CleanupEntry {
    File(PathBuf),
    Directory(PathBuf),
    Owned(TempDir),
}

impl CleanupEntry {
    fn path(&self) -> &Path {
        match self {
            Self::File(path) | Self::Directory(path) => path,
            Self::Owned(dir) => dir.path(),
        }
    }

    fn remove(self) -> io::Result<()> {
        let outcome = match self {
            Self::File(path) => fs::remove_file(path),
            Self::Directory(path) => fs::remove_dir(path),
            Self::Owned(dir) => dir.close(),
        };
        match outcome {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }
}

/// Counts from a cleanup pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CleanupReport {
    /// Entries removed (or already absent).
    pub removed: usize,
    /// Entries that could not be removed.
    pub failed: usize,
}

/// Registry of paths to delete at shutdown.
#[derive(Debug)]
pub struct CleanupRegistry {
    entries: Mutex<Vec<CleanupEntry>>,
    events: EventLog,
}

impl CleanupRegistry {
    /// Create an empty registry reporting failures through `events`.
    #[must_use]
    pub fn new(events: &EventLog) -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            events: events.scoped("native_init::cleanup"),
        }
    }

    /// Delete `path` at shutdown.
    pub fn register_file(&self, path: &Path) {
        self.push(CleanupEntry::File(path.to_path_buf()));
    }

    /// Delete the directory at `path` at shutdown if it is empty by then.
    pub fn register_directory(&self, path: &Path) {
        self.push(CleanupEntry::Directory(path.to_path_buf()));
    }

    /// Take ownership of `dir`, deleting it recursively at shutdown.
    ///
    /// Returns the directory path.
    pub fn adopt(&self, dir: TempDir) -> PathBuf {
        let path = dir.path().to_path_buf();
        self.push(CleanupEntry::Owned(dir));
        path
    }

    /// Number of entries awaiting cleanup.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.lock().len()
    }

    /// Remove every registered entry now.
    ///
    /// Failures are logged and counted; they never abort the pass.
    pub fn run(&self) -> CleanupReport {
        let entries = std::mem::take(&mut *self.lock());
        let mut report = CleanupReport::default();
        for entry in entries.into_iter().rev() {
            let path = entry.path().to_path_buf();
            match entry.remove() {
                Ok(()) => report.removed += 1,
                Err(e) => {
                    report.failed += 1;
                    self.events.warn(format_args!(
                        "Could not remove '{}' during cleanup: {e}",
                        path.display()
                    ));
                }
            }
        }
        report
    }

    fn push(&self, entry: CleanupEntry) {
        let mut entries = self.lock();
        let duplicate = entries
            .iter()
            .any(|existing| existing.path() == entry.path());
        if !duplicate {
            entries.push(entry);
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<CleanupEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for CleanupRegistry {
    fn default() -> Self {
        Self::new(&EventLog::global())
    }
}

impl Drop for CleanupRegistry {
    fn drop(&mut self) {
        self.run();
    }
}
