//! Race-safe extraction of bundled libraries to disk.
//!
//! A bundled resource is first written to a randomly named temporary file in
//! the destination directory and then atomically renamed onto its final
//! name. Readers of the final path therefore see either a complete old file
//! or a complete new one, no matter how many threads or processes extract
//! concurrently. Redundant extraction by several processes is harmless.
//!
//! Fixed directories reuse an existing destination without reading the
//! resource store again. The file could be deleted between that check and
//! the subsequent load; strategies handle that by forcing a fresh extraction
//! when the reused file fails to load.

use crate::cleanup::CleanupRegistry;
use crate::events::EventLog;
use crate::resources::ResourceStore;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::NamedTempFile;

/// Errors arising from resource extraction.
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    /// The resource store has no entry with this name.
    #[error("resource '{name}' does not exist")]
    ResourceNotFound {
        /// The requested resource name.
        name: String,
    },

    /// The resource exists but could not be opened.
    #[error("failed to open resource '{name}'")]
    ReadResource {
        /// The requested resource name.
        name: String,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The extraction directory could not be created.
    #[error("failed to create extraction directory {}", path.display())]
    CreateDirectory {
        /// The directory that could not be created.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Writing the temporary file failed.
    #[error("failed to write temporary file in {}", path.display())]
    Write {
        /// The temporary file or its directory.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The atomic rename onto the destination failed.
    #[error("failed to move extracted library onto {}", path.display())]
    Persist {
        /// The destination path.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },
}

/// Where extracted libraries are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionTarget {
    /// A fresh directory under the system temporary directory, created per
    /// extraction and removed at shutdown.
    Temporary,
    /// A caller-supplied directory whose extracted files are removed at
    /// shutdown.
    Ephemeral(PathBuf),
    /// A caller-supplied directory whose files persist across runs.
    Fixed(PathBuf),
}

impl ExtractionTarget {
    /// Whether extracted files are removed at shutdown.
    #[must_use]
    pub const fn is_ephemeral(&self) -> bool {
        !matches!(self, Self::Fixed(_))
    }

    /// Return the caller-supplied directory, if any.
    #[must_use]
    pub fn directory(&self) -> Option<&Path> {
        match self {
            Self::Temporary => None,
            Self::Ephemeral(dir) | Self::Fixed(dir) => Some(dir),
        }
    }
}

impl fmt::Display for ExtractionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Temporary => f.write_str("temporary directory"),
            Self::Ephemeral(dir) | Self::Fixed(dir) => write!(f, "{}", dir.display()),
        }
    }
}

/// Names computed from a naming scheme for one extraction.
#[derive(Debug, Clone, Copy)]
pub struct ExtractionRequest<'a> {
    /// Key looked up in the resource store.
    pub resource_name: &'a str,
    /// File name of the destination inside the target directory.
    pub file_name: &'a str,
    /// Re-extract even when a fixed destination already exists.
    pub force: bool,
}

/// A library file ready to be loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extracted {
    /// Absolute path of the destination file.
    pub path: PathBuf,
    /// Whether an existing file was reused without reading the store.
    pub reused: bool,
}

/// Materialises resources from a [`ResourceStore`] onto disk.
#[derive(Clone)]
pub struct ResourceExtractor {
    store: Arc<dyn ResourceStore>,
    cleanup: Arc<CleanupRegistry>,
    events: EventLog,
}

impl fmt::Debug for ResourceExtractor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceExtractor")
            .field("cleanup", &self.cleanup)
            .finish_non_exhaustive()
    }
}

impl ResourceExtractor {
    /// Create an extractor over `store`, registering ephemeral files with
    /// `cleanup`.
    #[must_use]
    pub fn new(
        store: Arc<dyn ResourceStore>,
        cleanup: Arc<CleanupRegistry>,
        events: &EventLog,
    ) -> Self {
        Self {
            store,
            cleanup,
            events: events.scoped("native_init::extraction"),
        }
    }

    /// Extract `request.resource_name` into `target`.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractionError::ResourceNotFound`] when the store has no
    /// such resource, or another [`ExtractionError`] variant when a
    /// filesystem operation fails. A failure never leaves a partial file
    /// under the destination name.
    pub fn extract(
        &self,
        request: &ExtractionRequest<'_>,
        target: &ExtractionTarget,
    ) -> Result<Extracted, ExtractionError> {
        let ephemeral = target.is_ephemeral();
        let directory = self.prepare_directory(request, target)?;
        self.events.info(format_args!(
            "Extracting resource '{}' to '{}'{}",
            request.resource_name,
            directory.display(),
            if ephemeral { " (will be deleted on exit)" } else { "" }
        ));

        let destination = directory.join(request.file_name);
        if destination.exists() {
            if ephemeral || request.force {
                self.events.info(format_args!(
                    "File '{}' already exists, overwriting to avoid race conditions",
                    destination.display()
                ));
            } else {
                self.events.info(format_args!(
                    "File '{}' already exists, no need to extract",
                    destination.display()
                ));
                return Ok(Extracted {
                    path: destination,
                    reused: true,
                });
            }
        }

        self.write_atomically(request.resource_name, &directory, &destination)?;
        if ephemeral {
            self.cleanup.register_file(&destination);
        }
        Ok(Extracted {
            path: destination,
            reused: false,
        })
    }

    fn prepare_directory(
        &self,
        request: &ExtractionRequest<'_>,
        target: &ExtractionTarget,
    ) -> Result<PathBuf, ExtractionError> {
        let dir = match target {
            ExtractionTarget::Temporary => {
                let temp = tempfile::Builder::new()
                    .prefix(&format!("{}-", request.file_name))
                    .tempdir()
                    .map_err(|source| ExtractionError::CreateDirectory {
                        path: std::env::temp_dir(),
                        source,
                    })?;
                return Ok(self.cleanup.adopt(temp));
            }
            ExtractionTarget::Ephemeral(dir) | ExtractionTarget::Fixed(dir) => dir,
        };

        let existed = dir.is_dir();
        let create_error = |source: io::Error| ExtractionError::CreateDirectory {
            path: dir.clone(),
            source,
        };
        fs::create_dir_all(dir).map_err(create_error)?;
        let absolute = std::path::absolute(dir).map_err(create_error)?;
        if target.is_ephemeral() && !existed {
            self.cleanup.register_directory(&absolute);
        }
        Ok(absolute)
    }

    fn write_atomically(
        &self,
        resource_name: &str,
        directory: &Path,
        destination: &Path,
    ) -> Result<(), ExtractionError> {
        let mut reader = self
            .store
            .open(resource_name)
            .map_err(|source| ExtractionError::ReadResource {
                name: resource_name.to_owned(),
                source,
            })?
            .ok_or_else(|| ExtractionError::ResourceNotFound {
                name: resource_name.to_owned(),
            })?;

        let mut temp =
            NamedTempFile::new_in(directory).map_err(|source| ExtractionError::Write {
                path: directory.to_path_buf(),
                source,
            })?;
        self.events.info(format_args!(
            "Extracting to temporary file '{}'",
            temp.path().display()
        ));

        let written = io::copy(&mut reader, temp.as_file_mut())
            .and_then(|bytes| {
                mark_executable(temp.as_file())?;
                temp.as_file().sync_all()?;
                Ok(bytes)
            })
            .map_err(|source| ExtractionError::Write {
                path: temp.path().to_path_buf(),
                source,
            })?;
        self.events.debug(format_args!(
            "Wrote {written} bytes for resource '{resource_name}'"
        ));

        self.events.info(format_args!(
            "Moving temporary file '{}' -> '{}'",
            temp.path().display(),
            destination.display()
        ));
        temp.persist(destination)
            .map_err(|e| ExtractionError::Persist {
                path: destination.to_path_buf(),
                source: e.error,
            })?;
        Ok(())
    }
}

#[cfg(unix)]
fn mark_executable(file: &fs::File) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    file.set_permissions(fs::Permissions::from_mode(0o755))
}

#[cfg(not(unix))]
fn mark_executable(_file: &fs::File) -> io::Result<()> {
    Ok(())
}
