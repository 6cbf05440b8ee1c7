//! Convenience constructors for strategies derived from a naming scheme.

use crate::extraction::ExtractionTarget;
use crate::naming::NamingScheme;
use crate::strategy::LoaderStrategy;
use std::path::PathBuf;
use std::sync::Arc;

/// Builds [`LoaderStrategy`] values for one library.
///
/// # Examples
///
/// ```
/// use native_init::factory::LoaderFactory;
/// use native_init::naming::NamingScheme;
///
/// let factory = LoaderFactory::new(NamingScheme::new("thelib".try_into().expect("valid")));
/// let strategy = factory
///     .system_loader()
///     .fallback_to(factory.resource_loader_temp_directory());
/// assert!(strategy.to_string().starts_with("fallback(system(thelib)"));
/// ```
#[derive(Debug, Clone)]
pub struct LoaderFactory {
    scheme: Arc<NamingScheme>,
}

impl LoaderFactory {
    /// Create a factory for the library described by `scheme`.
    #[must_use]
    pub fn new(scheme: NamingScheme) -> Self {
        Self {
            scheme: Arc::new(scheme),
        }
    }

    /// Return the naming scheme.
    #[must_use]
    pub fn naming_scheme(&self) -> &NamingScheme {
        &self.scheme
    }

    /// Load the library by its logical name from the system search path.
    ///
    /// Adjust `LD_LIBRARY_PATH`, `DYLD_LIBRARY_PATH`, or `PATH` if the
    /// library lives outside the default locations.
    #[must_use]
    pub fn system_loader(&self) -> LoaderStrategy {
        self.system_loader_named(self.scheme.library_name().as_str())
    }

    /// Load a differently named library from the system search path.
    #[must_use]
    pub fn system_loader_named(&self, name: &str) -> LoaderStrategy {
        LoaderStrategy::SystemSearchPath(name.to_owned())
    }

    /// Load the library from an absolute file path.
    #[must_use]
    pub fn file_loader(&self, path: impl Into<PathBuf>) -> LoaderStrategy {
        LoaderStrategy::ExplicitFile(path.into())
    }

    /// Extract the bundled library into a fresh temporary directory on each
    /// load, removing it at shutdown.
    #[must_use]
    pub fn resource_loader_temp_directory(&self) -> LoaderStrategy {
        self.resource_loader(ExtractionTarget::Temporary)
    }

    /// Extract the bundled library into `directory`, reusing a previous
    /// extraction when present.
    #[must_use]
    pub fn resource_loader_fixed_directory(&self, directory: impl Into<PathBuf>) -> LoaderStrategy {
        self.resource_loader(ExtractionTarget::Fixed(directory.into()))
    }

    /// Extract the bundled library into `target`.
    #[must_use]
    pub fn resource_loader(&self, target: ExtractionTarget) -> LoaderStrategy {
        LoaderStrategy::ExtractedResource {
            scheme: Arc::clone(&self.scheme),
            target,
        }
    }
}
