//! Loader configuration read from TOML.
//!
//! A configuration file names the library, describes how its bundled
//! resources are named, and lists the strategies to try in order:
//!
//! ```toml
//! library = "thelib"
//! version = "0.4.2"
//! relative_path = "lib"
//!
//! [[supported_platforms]]
//! architecture = "x86_64"
//! os = "linux"
//!
//! [[strategies]]
//! kind = "system"
//!
//! [[strategies]]
//! kind = "fixed-resource"
//! directory = "/var/cache/thelib"
//! ```

use crate::error::ConfigError;
use crate::extraction::ExtractionTarget;
use crate::factory::LoaderFactory;
use crate::naming::{LibraryName, LibraryVersion, NamingScheme};
use crate::platform::Platform;
use crate::strategy::LoaderStrategy;
use camino::Utf8Path;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Declarative description of a naming scheme and its strategy chain.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct LoaderConfig {
    /// Logical library name.
    pub library: String,
    /// Optional version appended to extracted file names.
    #[serde(default)]
    pub version: Option<String>,
    /// Optional directory prefix for bundled resource names.
    #[serde(default)]
    pub relative_path: Option<String>,
    /// Platforms the bundle provides; empty means every platform.
    #[serde(default)]
    pub supported_platforms: Vec<PlatformEntry>,
    /// Strategies to try, first to last.
    #[serde(default)]
    pub strategies: Vec<StrategyConfig>,
}

/// One supported platform.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct PlatformEntry {
    /// CPU architecture, for example `x86_64`.
    pub architecture: String,
    /// Operating system name, for example `linux`.
    pub os: String,
}

/// One entry of the `[[strategies]]` array.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(tag = "kind", rename_all = "kebab-case", deny_unknown_fields)]
pub enum StrategyConfig {
    /// Search the system library path, by default for the configured library.
    System {
        /// Alternative library name to search for.
        #[serde(default)]
        name: Option<String>,
    },
    /// Load an absolute file path.
    File {
        /// Path of the shared library.
        path: PathBuf,
    },
    /// Extract into a persistent directory and reuse earlier extractions.
    FixedResource {
        /// Destination directory.
        directory: PathBuf,
    },
    /// Extract into a directory, removing the file at shutdown.
    EphemeralResource {
        /// Destination directory.
        directory: PathBuf,
    },
    /// Extract into a fresh temporary directory.
    TemporaryResource,
}

impl LoaderConfig {
    /// Parse a configuration document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the document is malformed or has
    /// unknown fields.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        toml::from_str(source).map_err(|err| ConfigError::Parse {
            reason: err.to_string(),
        })
    }

    /// Read and parse the configuration file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] when the file cannot be read and
    /// [`ConfigError::Parse`] when it is malformed.
    pub fn load(path: &Utf8Path) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_owned(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    /// Build the naming scheme described by this configuration.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for an empty library name, version, or
    /// platform field.
    pub fn naming_scheme(&self) -> Result<NamingScheme, ConfigError> {
        let mut scheme = NamingScheme::new(LibraryName::try_from(self.library.as_str())?);
        if let Some(version) = &self.version {
            scheme = scheme.with_version(LibraryVersion::try_from(version.as_str())?);
        }
        if let Some(path) = &self.relative_path {
            scheme = scheme.with_relative_path(path);
        }
        for entry in &self.supported_platforms {
            scheme.add_supported_platform(Platform::new(&entry.architecture, &entry.os)?);
        }
        Ok(scheme)
    }

    /// Build the fallback chain trying each configured strategy in order.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EmptyChain`] when no strategies are listed, and
    /// the naming or path errors of individual entries.
    pub fn strategy(&self) -> Result<LoaderStrategy, ConfigError> {
        let factory = LoaderFactory::new(self.naming_scheme()?);
        let strategies = self
            .strategies
            .iter()
            .map(|entry| entry.build(&factory))
            .collect::<Result<Vec<_>, _>>()?;
        LoaderStrategy::chain(strategies).ok_or(ConfigError::EmptyChain)
    }
}

impl StrategyConfig {
    const fn kind(&self) -> &'static str {
        match self {
            Self::System { .. } => "system",
            Self::File { .. } => "file",
            Self::FixedResource { .. } => "fixed-resource",
            Self::EphemeralResource { .. } => "ephemeral-resource",
            Self::TemporaryResource => "temporary-resource",
        }
    }

    fn build(&self, factory: &LoaderFactory) -> Result<LoaderStrategy, ConfigError> {
        Ok(match self {
            Self::System { name: None } => factory.system_loader(),
            Self::System { name: Some(name) } => {
                let trimmed = name.trim();
                if trimmed.is_empty() {
                    return Err(ConfigError::EmptyLibraryName);
                }
                factory.system_loader_named(trimmed)
            }
            Self::File { path } => factory.file_loader(self.non_empty(path, "path")?),
            Self::FixedResource { directory } => {
                factory.resource_loader_fixed_directory(self.non_empty(directory, "directory")?)
            }
            Self::EphemeralResource { directory } => factory.resource_loader(
                ExtractionTarget::Ephemeral(self.non_empty(directory, "directory")?),
            ),
            Self::TemporaryResource => factory.resource_loader_temp_directory(),
        })
    }

    fn non_empty(&self, path: &Path, field: &'static str) -> Result<PathBuf, ConfigError> {
        if path.as_os_str().is_empty() {
            return Err(ConfigError::MissingDirectory {
                kind: self.kind(),
                field,
            });
        }
        Ok(path.to_path_buf())
    }
}
