//! Loader strategies and fallback composition.
//!
//! A [`LoaderStrategy`] describes one way of making a native library
//! available. Strategies are plain data; [`NativeLoader`] supplies the
//! linker, resource store, and logging they need when executed.

use crate::error::Result;
use crate::extraction::{ExtractionRequest, ExtractionTarget};
use crate::linker::LoadedLibrary;
use crate::loader::NativeLoader;
use crate::naming::NamingScheme;
use crate::platform::Platform;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// One way of loading a native library.
///
/// # Examples
///
/// ```
/// use native_init::strategy::LoaderStrategy;
///
/// let strategy = LoaderStrategy::SystemSearchPath("thelib".to_owned())
///     .fallback_to(LoaderStrategy::ExplicitFile("/opt/thelib/libthelib.so".into()));
/// assert_eq!(
///     strategy.to_string(),
///     "fallback(system(thelib) -> file(/opt/thelib/libthelib.so))"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoaderStrategy {
    /// Resolve a logical name on the process library search path.
    SystemSearchPath(String),
    /// Load an absolute file path.
    ExplicitFile(PathBuf),
    /// Extract a bundled resource, then load the extracted file.
    ExtractedResource {
        /// Naming scheme producing the resource and file names.
        scheme: Arc<NamingScheme>,
        /// Directory receiving the extracted file.
        target: ExtractionTarget,
    },
    /// Try the primary strategy, then the secondary one if it fails.
    Fallback(Box<Self>, Box<Self>),
}

impl LoaderStrategy {
    /// Try `self` first and `other` when `self` fails.
    #[must_use]
    pub fn fallback_to(self, other: Self) -> Self {
        Self::Fallback(Box::new(self), Box::new(other))
    }

    /// Build a fallback chain trying `strategies` in order.
    ///
    /// Returns `None` for an empty sequence.
    pub fn chain<I>(strategies: I) -> Option<Self>
    where
        I: IntoIterator<Item = Self>,
        I::IntoIter: DoubleEndedIterator,
    {
        let mut reversed = strategies.into_iter().rev();
        let last = reversed.next()?;
        Some(reversed.fold(last, |secondary, primary| primary.fallback_to(secondary)))
    }

    /// Execute the strategy with the collaborators held by `loader`.
    ///
    /// # Errors
    ///
    /// Returns the failure of the strategy; for a fallback, the failure of
    /// its secondary branch.
    pub fn load(&self, loader: &NativeLoader) -> Result<LoadedLibrary> {
        let events = loader.events();
        match self {
            Self::SystemSearchPath(name) => {
                events.info(format_args!("Loading system library '{name}'"));
                Ok(loader.linker().load_by_name(name)?)
            }
            Self::ExplicitFile(path) => {
                events.info(format_args!(
                    "Loading library from file '{}'",
                    path.display()
                ));
                Ok(loader.linker().load_by_path(path)?)
            }
            Self::ExtractedResource { scheme, target } => load_resource(loader, scheme, target),
            Self::Fallback(primary, secondary) => primary.load(loader).or_else(|err| {
                events.info(format_args!(
                    "{primary} failed, trying {secondary}: {err}"
                ));
                secondary.load(loader)
            }),
        }
    }
}

fn load_resource(
    loader: &NativeLoader,
    scheme: &NamingScheme,
    target: &ExtractionTarget,
) -> Result<LoadedLibrary> {
    let events = loader.events();
    events.info(format_args!(
        "Loading library '{}' from resource via directory {target} (ephemeral: {})",
        scheme.library_name(),
        target.is_ephemeral()
    ));

    let platform = Platform::detect();
    let resource_name = scheme.resolve_for(&platform, true, false)?;
    let file_name = scheme.resolve_for(&platform, false, true)?;
    let request = ExtractionRequest {
        resource_name: &resource_name,
        file_name: &file_name,
        force: false,
    };

    let extracted = loader.extractor().extract(&request, target)?;
    match loader.linker().load_by_path(&extracted.path) {
        Ok(library) => Ok(library),
        Err(err) if extracted.reused => {
            events.warn(format_args!(
                "Existing file '{}' could not be loaded ({err}); extracting it again",
                extracted.path.display()
            ));
            let forced = ExtractionRequest {
                force: true,
                ..request
            };
            let fresh = loader.extractor().extract(&forced, target)?;
            Ok(loader.linker().load_by_path(&fresh.path)?)
        }
        Err(err) => Err(err.into()),
    }
}

impl fmt::Display for LoaderStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SystemSearchPath(name) => write!(f, "system({name})"),
            Self::ExplicitFile(path) => write!(f, "file({})", path.display()),
            Self::ExtractedResource { scheme, target } => write!(
                f,
                "resource({}, {target}, ephemeral: {})",
                scheme.library_name(),
                target.is_ephemeral()
            ),
            Self::Fallback(primary, secondary) => write!(f, "fallback({primary} -> {secondary})"),
        }
    }
}
