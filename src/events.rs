//! Injected logging capability.
//!
//! Loaders report strategy selection, extraction decisions, and fallback
//! transitions through an [`EventLog`] handed to them at construction. The
//! default sink forwards to the process-wide `log` facade; tests and embedders
//! can supply their own [`log::Log`] implementation instead.

use log::{Level, Log, Metadata, Record};
use std::fmt;
use std::sync::Arc;

const DEFAULT_TARGET: &str = "native_init";

/// A cloneable handle to a [`log::Log`] sink.
#[derive(Clone)]
pub struct EventLog {
    sink: Arc<dyn Log>,
    target: &'static str,
}

impl EventLog {
    /// Log through the global `log` facade.
    #[must_use]
    pub fn global() -> Self {
        Self::new(Arc::new(GlobalLog))
    }

    /// Log through `sink`.
    #[must_use]
    pub fn new(sink: Arc<dyn Log>) -> Self {
        Self {
            sink,
            target: DEFAULT_TARGET,
        }
    }

    /// Return a handle that tags records with `target`.
    #[must_use]
    pub fn scoped(&self, target: &'static str) -> Self {
        Self {
            sink: Arc::clone(&self.sink),
            target,
        }
    }

    /// Emit an info-level record.
    pub fn info(&self, args: fmt::Arguments<'_>) {
        self.emit(Level::Info, args);
    }

    /// Emit a warn-level record.
    pub fn warn(&self, args: fmt::Arguments<'_>) {
        self.emit(Level::Warn, args);
    }

    /// Emit a debug-level record.
    pub fn debug(&self, args: fmt::Arguments<'_>) {
        self.emit(Level::Debug, args);
    }

    fn emit(&self, level: Level, args: fmt::Arguments<'_>) {
        let metadata = Metadata::builder()
            .level(level)
            .target(self.target)
            .build();
        if !self.sink.enabled(&metadata) {
            return;
        }
        self.sink.log(
            &Record::builder()
                .metadata(metadata)
                .args(args)
                .module_path_static(Some(module_path!()))
                .build(),
        );
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::global()
    }
}

impl fmt::Debug for EventLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventLog")
            .field("target", &self.target)
            .finish_non_exhaustive()
    }
}

/// Forwards to whatever logger the process installed with `log::set_logger`.
struct GlobalLog;

impl Log for GlobalLog {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= log::max_level() && log::logger().enabled(metadata)
    }

    fn log(&self, record: &Record<'_>) {
        log::logger().log(record);
    }

    fn flush(&self) {
        log::logger().flush();
    }
}
