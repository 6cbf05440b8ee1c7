//! Error types for naming, loading, and initialisation.
//!
//! Errors are grouped by the stage that produced them so callers can tell a
//! misconfigured naming scheme apart from a failed extraction or a library
//! the dynamic linker refused. Construction-time problems surface as
//! [`ConfigError`] and never reach the load path.

use crate::extraction::ExtractionError;
use crate::platform::Platform;
use camino::Utf8PathBuf;
use std::fmt;
use thiserror::Error;

/// Invalid values supplied while wiring loaders together.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The logical library name is empty.
    #[error("library name must not be empty")]
    EmptyLibraryName,

    /// A version was supplied but it is empty.
    #[error("library version must not be empty when supplied")]
    EmptyVersion,

    /// A platform architecture or OS name is empty.
    #[error("platform {field} must not be empty")]
    EmptyPlatformField {
        /// The field that was empty.
        field: &'static str,
    },

    /// A configuration file could not be read.
    #[error("failed to read loader configuration {path}")]
    Read {
        /// Path of the configuration file.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A configuration document could not be parsed.
    #[error("invalid loader configuration: {reason}")]
    Parse {
        /// Description of the parse failure.
        reason: String,
    },

    /// The configuration declared no loading strategies.
    #[error("loader configuration declares no strategies")]
    EmptyChain,

    /// A strategy that needs a path or directory was given an empty one.
    #[error("strategy '{kind}' requires a non-empty {field}")]
    MissingDirectory {
        /// The strategy kind as written in the configuration.
        kind: &'static str,
        /// The field that was empty.
        field: &'static str,
    },
}

/// Failures while turning a naming scheme into a concrete name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NamingError {
    /// The detected platform is not in the configured supported set.
    #[error("platform {platform} is not supported; expected one of: {expected}")]
    UnsupportedPlatform {
        /// The detected platform.
        platform: Platform,
        /// Comma-separated list of supported platforms.
        expected: String,
    },
}

/// The dynamic linker rejected a library name or file.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to load native library {target}: {reason}")]
pub struct LinkError {
    /// The name or path handed to the linker.
    pub target: String,
    /// The linker diagnostic.
    pub reason: String,
}

/// The stage of the loading pipeline that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStage {
    /// Computing the platform-specific name.
    Naming,
    /// Materialising a bundled resource on disk.
    Extraction,
    /// Handing the library to the dynamic linker.
    Link,
}

impl fmt::Display for LoadStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Naming => f.write_str("naming"),
            Self::Extraction => f.write_str("extraction"),
            Self::Link => f.write_str("link"),
        }
    }
}

/// Errors returned by a loader strategy.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The naming scheme could not produce a name for this platform.
    #[error(transparent)]
    Naming(#[from] NamingError),

    /// The bundled resource could not be extracted.
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    /// The dynamic linker rejected the library.
    #[error(transparent)]
    Link(#[from] LinkError),
}

impl LoadError {
    /// Return the pipeline stage that produced this error.
    #[must_use]
    pub const fn stage(&self) -> LoadStage {
        match self {
            Self::Naming(_) => LoadStage::Naming,
            Self::Extraction(_) => LoadStage::Extraction,
            Self::Link(_) => LoadStage::Link,
        }
    }
}

/// Errors returned by [`NativeInitializer`](crate::initializer::NativeInitializer).
#[derive(Debug, Error)]
pub enum InitError {
    /// The loader strategy failed; the value was not constructed.
    #[error("native library initialisation failed: {0}")]
    Load(#[from] LoadError),

    /// The value factory failed after the library was loaded.
    #[error("value construction failed: {source}")]
    Factory {
        /// The error returned by the factory.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The strategy cannot be replaced once the value exists.
    #[error("native loader already initialised; the strategy can no longer be replaced")]
    AlreadyInitialized,
}

/// Result type alias using [`LoadError`].
pub type Result<T> = std::result::Result<T, LoadError>;
