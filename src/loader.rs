//! Collaborators shared by every strategy execution.
//!
//! [`NativeLoader`] bundles the dynamic linker, the resource extractor, the
//! cleanup registry, and the event log. It is cheap to clone and is handed
//! to [`NativeInitializer`](crate::initializer::NativeInitializer) alongside
//! the strategy to run.

use crate::cleanup::{CleanupRegistry, CleanupReport};
use crate::error::Result;
use crate::events::EventLog;
use crate::extraction::ResourceExtractor;
use crate::linker::{DynamicLinker, LoadedLibrary, SystemLinker};
use crate::resources::ResourceStore;
use crate::strategy::LoaderStrategy;
use std::fmt;
use std::sync::Arc;

/// Executes [`LoaderStrategy`] values against real or injected collaborators.
#[derive(Clone)]
pub struct NativeLoader {
    linker: Arc<dyn DynamicLinker>,
    extractor: ResourceExtractor,
    cleanup: Arc<CleanupRegistry>,
    events: EventLog,
}

impl NativeLoader {
    /// Create a loader from explicit collaborators.
    #[must_use]
    pub fn new(
        linker: Arc<dyn DynamicLinker>,
        store: Arc<dyn ResourceStore>,
        events: &EventLog,
    ) -> Self {
        let cleanup = Arc::new(CleanupRegistry::new(events));
        let extractor = ResourceExtractor::new(store, Arc::clone(&cleanup), events);
        Self {
            linker,
            extractor,
            cleanup,
            events: events.scoped("native_init::loader"),
        }
    }

    /// Create a loader using the operating system linker and the global
    /// `log` facade.
    #[must_use]
    pub fn system(store: Arc<dyn ResourceStore>) -> Self {
        Self::new(Arc::new(SystemLinker), store, &EventLog::global())
    }

    /// Run `strategy`.
    ///
    /// # Errors
    ///
    /// Returns the strategy's [`LoadError`](crate::error::LoadError).
    pub fn load(&self, strategy: &LoaderStrategy) -> Result<LoadedLibrary> {
        self.events
            .debug(format_args!("Selected loader strategy {strategy}"));
        strategy.load(self)
    }

    /// Return the registry holding ephemeral extraction artefacts.
    #[must_use]
    pub fn cleanup(&self) -> &CleanupRegistry {
        &self.cleanup
    }

    /// Remove ephemeral extraction artefacts now.
    ///
    /// Call this during orderly shutdown when the loader is held in a
    /// `static` and would otherwise never be dropped.
    #[must_use]
    pub fn shutdown(&self) -> CleanupReport {
        self.cleanup.run()
    }

    pub(crate) fn linker(&self) -> &dyn DynamicLinker {
        self.linker.as_ref()
    }

    pub(crate) const fn extractor(&self) -> &ResourceExtractor {
        &self.extractor
    }

    pub(crate) const fn events(&self) -> &EventLog {
        &self.events
    }
}

impl fmt::Debug for NativeLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeLoader")
            .field("extractor", &self.extractor)
            .field("events", &self.events)
            .finish_non_exhaustive()
    }
}
