//! Exactly-once initialisation of a value that depends on a native library.
//!
//! [`NativeInitializer`] loads the library through its strategy the first
//! time the value is requested, builds the value, and caches both. Later
//! calls read the cache without locking. A failed attempt leaves nothing
//! cached, so the next call tries again.

use crate::error::InitError;
use crate::linker::LoadedLibrary;
use crate::loader::NativeLoader;
use crate::strategy::LoaderStrategy;
use once_cell::sync::OnceCell;
use std::convert::Infallible;
use std::error::Error;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

type BoxError = Box<dyn Error + Send + Sync>;
type ValueFactory<T> = Box<dyn Fn(&LoadedLibrary) -> Result<T, BoxError> + Send + Sync>;

struct Pending<T> {
    strategy: LoaderStrategy,
    factory: ValueFactory<T>,
}

impl<T> Pending<T> {
    fn initialise(&self, loader: &NativeLoader) -> Result<(LoadedLibrary, T), InitError> {
        let library = loader.load(&self.strategy)?;
        let value = (self.factory)(&library).map_err(|source| InitError::Factory { source })?;
        Ok((library, value))
    }
}

/// Lazily loads a native library and derives a value from it.
///
/// # Examples
///
/// ```no_run
/// use native_init::initializer::NativeInitializer;
/// use native_init::loader::NativeLoader;
/// use native_init::resources::EmbeddedResources;
/// use native_init::strategy::LoaderStrategy;
/// use std::sync::Arc;
///
/// let loader = NativeLoader::system(Arc::new(EmbeddedResources::new()));
/// let codec = NativeInitializer::new(
///     loader,
///     LoaderStrategy::SystemSearchPath("z".to_owned()),
///     || "zlib ready",
/// );
/// assert_eq!(*codec.get()?, "zlib ready");
/// # Ok::<(), native_init::error::InitError>(())
/// ```
pub struct NativeInitializer<T> {
    loader: NativeLoader,
    pending: Mutex<Pending<T>>,
    value: OnceCell<(LoadedLibrary, T)>,
}

impl<T> NativeInitializer<T> {
    /// Create an initializer whose value does not need the library handle.
    #[must_use]
    pub fn new<F>(loader: NativeLoader, strategy: LoaderStrategy, factory: F) -> Self
    where
        T: 'static,
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self::with_library(loader, strategy, move |_| Ok::<T, Infallible>(factory()))
    }

    /// Create an initializer whose value is built from the loaded library.
    ///
    /// The factory may fail; its error is returned as
    /// [`InitError::Factory`] and the next [`get`](Self::get) retries.
    #[must_use]
    pub fn with_library<F, E>(loader: NativeLoader, strategy: LoaderStrategy, factory: F) -> Self
    where
        T: 'static,
        F: Fn(&LoadedLibrary) -> Result<T, E> + Send + Sync + 'static,
        E: Into<BoxError> + 'static,
    {
        let boxed: ValueFactory<T> =
            Box::new(move |library: &LoadedLibrary| factory(library).map_err(Into::into));
        Self {
            loader,
            pending: Mutex::new(Pending {
                strategy,
                factory: boxed,
            }),
            value: OnceCell::new(),
        }
    }

    /// Return the value, loading the library first if needed.
    ///
    /// Concurrent callers block until the first one finishes; the strategy
    /// and factory run at most once per successful initialisation.
    ///
    /// # Errors
    ///
    /// Returns [`InitError::Load`] when the strategy fails and
    /// [`InitError::Factory`] when the value cannot be built.
    pub fn get(&self) -> Result<&T, InitError> {
        if let Some((_, value)) = self.value.get() {
            return Ok(value);
        }
        let pending = self.lock();
        let (_, value) = self
            .value
            .get_or_try_init(|| pending.initialise(&self.loader))?;
        Ok(value)
    }

    /// Replace the strategy used by the first successful [`get`](Self::get).
    ///
    /// # Errors
    ///
    /// Returns [`InitError::AlreadyInitialized`] once the value exists.
    pub fn set_strategy(&self, strategy: LoaderStrategy) -> Result<(), InitError> {
        let mut pending = self.lock();
        if self.value.get().is_some() {
            return Err(InitError::AlreadyInitialized);
        }
        pending.strategy = strategy;
        Ok(())
    }

    /// Whether the value has been built.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.value.get().is_some()
    }

    /// The loaded library, once initialised.
    #[must_use]
    pub fn library(&self) -> Option<&LoadedLibrary> {
        self.value.get().map(|(library, _)| library)
    }

    /// The loader executing the strategy.
    #[must_use]
    pub const fn loader(&self) -> &NativeLoader {
        &self.loader
    }

    // A panicking factory poisons the mutex without writing the cell, so the
    // guarded state is still consistent.
    fn lock(&self) -> MutexGuard<'_, Pending<T>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T: fmt::Debug> fmt::Debug for NativeInitializer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeInitializer")
            .field("loader", &self.loader)
            .field("value", &self.value.get())
            .finish_non_exhaustive()
    }
}
