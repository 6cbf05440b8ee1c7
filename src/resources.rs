//! Stores serving bundled native libraries by resource name.
//!
//! Resource names are produced by
//! [`NamingScheme::resolve`](crate::naming::NamingScheme::resolve) with the
//! relative path included, e.g. `lib/thelib-linux-x86_64`.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Component, Path, PathBuf};

/// A readable resource stream.
pub type ResourceReader = Box<dyn Read + Send>;

/// Lookup of bundled binaries by name.
#[cfg_attr(test, mockall::automock)]
pub trait ResourceStore: Send + Sync {
    /// Open the resource called `name`.
    ///
    /// Returns `Ok(None)` when no such resource exists.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the resource exists but cannot be opened.
    fn open(&self, name: &str) -> io::Result<Option<ResourceReader>>;
}

/// Resources compiled into the binary, typically with `include_bytes!`.
///
/// # Examples
///
/// ```
/// use native_init::resources::{EmbeddedResources, ResourceStore};
///
/// let store = EmbeddedResources::new().with("lib/thelib-linux-x86_64", b"\x7fELF");
/// assert!(store.open("lib/thelib-linux-x86_64").expect("open").is_some());
/// assert!(store.open("lib/thelib-macos-aarch64").expect("open").is_none());
/// ```
#[derive(Debug, Default, Clone)]
pub struct EmbeddedResources {
    entries: HashMap<String, &'static [u8]>,
}

impl EmbeddedResources {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `bytes` under `name`.
    #[must_use]
    pub fn with(mut self, name: &str, bytes: &'static [u8]) -> Self {
        self.insert(name, bytes);
        self
    }

    /// Register `bytes` under `name`, replacing any previous entry.
    pub fn insert(&mut self, name: &str, bytes: &'static [u8]) {
        self.entries.insert(name.to_owned(), bytes);
    }
}

impl ResourceStore for EmbeddedResources {
    fn open(&self, name: &str) -> io::Result<Option<ResourceReader>> {
        Ok(self
            .entries
            .get(name)
            .map(|bytes| Box::new(*bytes) as ResourceReader))
    }
}

/// Resources stored as files below a root directory.
///
/// Names may contain `/` separators but must stay inside the root.
#[derive(Debug, Clone)]
pub struct DirectoryResources {
    root: PathBuf,
}

impl DirectoryResources {
    /// Serve resources from `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Return the root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn locate(&self, name: &str) -> Option<PathBuf> {
        let relative = Path::new(name);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            return None;
        }
        Some(self.root.join(relative))
    }
}

impl ResourceStore for DirectoryResources {
    fn open(&self, name: &str) -> io::Result<Option<ResourceReader>> {
        let Some(path) = self.locate(name) else {
            return Ok(None);
        };
        match fs::metadata(&path) {
            Ok(meta) if meta.is_file() => {
                let file = File::open(&path)?;
                Ok(Some(Box::new(file) as ResourceReader))
            }
            Ok(_) => Ok(None),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }
}
