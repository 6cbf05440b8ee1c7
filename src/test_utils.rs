//! Test doubles for the loader's external collaborators.
//!
//! Available to unit tests and, through the `test-support` feature, to
//! integration tests in other crates.

use crate::error::LinkError;
use crate::events::EventLog;
use crate::linker::{DynamicLinker, LibraryOrigin, LoadedLibrary};
use crate::resources::{ResourceReader, ResourceStore};
use log::{Level, Log, Metadata, Record};
use std::collections::{HashMap, HashSet};
use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A [`DynamicLinker`] that records every request and never touches the
/// operating system linker.
///
/// Requests succeed unless their target was marked with
/// [`reject`](Self::reject). Path targets are compared by their file name.
#[derive(Debug, Default)]
pub struct RecordingLinker {
    calls: Mutex<Vec<String>>,
    rejected: HashSet<String>,
    delay: Option<Duration>,
}

impl RecordingLinker {
    /// Creates a linker that accepts every request.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails requests for `target`, a library name or file name.
    #[must_use]
    pub fn reject(mut self, target: &str) -> Self {
        self.rejected.insert(target.to_owned());
        self
    }

    /// Sleeps for `delay` inside every request, widening race windows.
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Returns the targets requested so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        lock(&self.calls).clone()
    }

    /// Returns the number of requests so far.
    #[must_use]
    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }

    fn record(
        &self,
        target: String,
        key: &str,
        origin: LibraryOrigin,
    ) -> Result<LoadedLibrary, LinkError> {
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        lock(&self.calls).push(target.clone());
        if self.rejected.contains(key) {
            return Err(LinkError {
                target,
                reason: "rejected by recording linker".to_owned(),
            });
        }
        Ok(LoadedLibrary::new(origin))
    }
}

impl DynamicLinker for RecordingLinker {
    fn load_by_name(&self, name: &str) -> Result<LoadedLibrary, LinkError> {
        self.record(name.to_owned(), name, LibraryOrigin::Name(name.to_owned()))
    }

    fn load_by_path(&self, path: &Path) -> Result<LoadedLibrary, LinkError> {
        let key = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.record(
            path.display().to_string(),
            &key,
            LibraryOrigin::Path(path.to_path_buf()),
        )
    }
}

/// A [`ResourceStore`] serving static bytes and counting every open.
#[derive(Debug, Default)]
pub struct CountingStore {
    entries: HashMap<String, &'static [u8]>,
    opens: AtomicUsize,
}

impl CountingStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `bytes` under `name`.
    #[must_use]
    pub fn with(mut self, name: &str, bytes: &'static [u8]) -> Self {
        self.entries.insert(name.to_owned(), bytes);
        self
    }

    /// Returns how many times [`ResourceStore::open`] was called.
    #[must_use]
    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

impl ResourceStore for CountingStore {
    fn open(&self, name: &str) -> io::Result<Option<ResourceReader>> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .entries
            .get(name)
            .map(|bytes| Box::new(*bytes) as ResourceReader))
    }
}

/// One captured log record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggedEvent {
    /// Record level.
    pub level: Level,
    /// Record target.
    pub target: String,
    /// Formatted message.
    pub message: String,
}

/// A [`log::Log`] sink that keeps every record in memory.
#[derive(Debug, Default)]
pub struct RecordingLog {
    events: Mutex<Vec<LoggedEvent>>,
}

impl RecordingLog {
    /// Creates a shared sink.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Returns an [`EventLog`] writing into `sink`.
    #[must_use]
    pub fn event_log(sink: &Arc<Self>) -> EventLog {
        EventLog::new(Arc::clone(sink) as Arc<dyn Log>)
    }

    /// Returns the captured records.
    #[must_use]
    pub fn events(&self) -> Vec<LoggedEvent> {
        lock(&self.events).clone()
    }

    /// Whether any captured message contains `needle`.
    #[must_use]
    pub fn contains(&self, needle: &str) -> bool {
        lock(&self.events)
            .iter()
            .any(|event| event.message.contains(needle))
    }
}

impl Log for RecordingLog {
    fn enabled(&self, _metadata: &Metadata<'_>) -> bool {
        true
    }

    fn log(&self, record: &Record<'_>) {
        lock(&self.events).push(LoggedEvent {
            level: record.level(),
            target: record.target().to_owned(),
            message: record.args().to_string(),
        });
    }

    fn flush(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn rejected_file_names_fail_by_path() {
        let linker = RecordingLinker::new().reject("libthelib.so");

        assert!(linker.load_by_path(Path::new("/opt/libthelib.so")).is_err());
        assert!(linker.load_by_name("thelib").is_ok());
        assert_eq!(linker.calls(), vec!["/opt/libthelib.so", "thelib"]);
    }

    #[test]
    fn counting_store_counts_misses_too() {
        let store = CountingStore::new().with("a", b"abc");
        let mut buffer = Vec::new();
        store
            .open("a")
            .expect("open")
            .expect("present")
            .read_to_end(&mut buffer)
            .expect("read");

        assert!(store.open("b").expect("open").is_none());
        assert_eq!(buffer, b"abc");
        assert_eq!(store.opens(), 2);
    }

    #[test]
    fn recording_log_captures_all_levels() {
        let sink = RecordingLog::new();
        let events = RecordingLog::event_log(&sink);
        events.debug(format_args!("detail"));
        events.warn(format_args!("problem"));

        assert_eq!(sink.events().len(), 2);
        assert!(sink.contains("problem"));
    }
}
