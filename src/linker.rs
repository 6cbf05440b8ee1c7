//! Dynamic linker abstraction.
//!
//! The [`DynamicLinker`] trait is the seam between loader strategies and the
//! operating system loader. [`SystemLinker`] is the production implementation
//! backed by `libloading`; tests substitute mocks or recording stubs.

use crate::error::LinkError;
use libloading::Library;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// How a library was located by the linker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LibraryOrigin {
    /// Resolved by logical name on the process search path.
    Name(String),
    /// Loaded from an absolute file path.
    Path(PathBuf),
}

impl fmt::Display for LibraryOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => write!(f, "system library '{name}'"),
            Self::Path(path) => write!(f, "file '{}'", path.display()),
        }
    }
}

/// A library made available by a loader strategy.
///
/// When produced by [`SystemLinker`] the value owns the OS handle, so the
/// library stays mapped for as long as any clone of this value is alive.
#[derive(Debug, Clone)]
pub struct LoadedLibrary {
    origin: LibraryOrigin,
    handle: Option<Arc<Library>>,
}

impl LoadedLibrary {
    /// Describe a library loaded without an owned handle.
    #[must_use]
    pub const fn new(origin: LibraryOrigin) -> Self {
        Self {
            origin,
            handle: None,
        }
    }

    /// Describe a library and keep `library` open.
    #[must_use]
    pub fn with_handle(origin: LibraryOrigin, library: Library) -> Self {
        Self {
            origin,
            handle: Some(Arc::new(library)),
        }
    }

    /// Return where the library came from.
    #[must_use]
    pub const fn origin(&self) -> &LibraryOrigin {
        &self.origin
    }

    /// Whether an OS handle is held.
    #[must_use]
    pub const fn has_handle(&self) -> bool {
        self.handle.is_some()
    }

    /// Look up an exported symbol.
    ///
    /// # Safety
    ///
    /// `T` must match the actual type of the exported symbol, and the symbol
    /// must not be used after the library is unloaded.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError`] if no handle is held or the symbol is missing.
    pub unsafe fn symbol<T>(&self, name: &[u8]) -> Result<libloading::Symbol<'_, T>, LinkError> {
        let Some(handle) = &self.handle else {
            return Err(LinkError {
                target: self.origin.to_string(),
                reason: "no library handle is held".to_owned(),
            });
        };
        // SAFETY: the caller guarantees `T` matches the exported symbol.
        unsafe { handle.get::<T>(name) }.map_err(|e| LinkError {
            target: self.origin.to_string(),
            reason: e.to_string(),
        })
    }
}

/// Operating system dynamic linker.
#[cfg_attr(test, mockall::automock)]
pub trait DynamicLinker: Send + Sync {
    /// Load a library by logical name from the process search path.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError`] with the linker diagnostic if the library
    /// cannot be found or loaded.
    fn load_by_name(&self, name: &str) -> Result<LoadedLibrary, LinkError>;

    /// Load a library from an absolute file path.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError`] if the path is relative or does not resolve to
    /// a loadable image.
    fn load_by_path(&self, path: &Path) -> Result<LoadedLibrary, LinkError>;
}

/// `libloading`-backed linker.
///
/// Names are mapped to platform file names with
/// [`libloading::library_filename`], so `"thelib"` becomes `libthelib.so`,
/// `libthelib.dylib`, or `thelib.dll`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemLinker;

impl DynamicLinker for SystemLinker {
    fn load_by_name(&self, name: &str) -> Result<LoadedLibrary, LinkError> {
        let filename = libloading::library_filename(name);
        // SAFETY: running library initialisers is the purpose of this call;
        // the caller chose to trust the library by naming it.
        let library = unsafe { Library::new(&filename) }.map_err(|e| LinkError {
            target: filename.to_string_lossy().into_owned(),
            reason: e.to_string(),
        })?;
        Ok(LoadedLibrary::with_handle(
            LibraryOrigin::Name(name.to_owned()),
            library,
        ))
    }

    fn load_by_path(&self, path: &Path) -> Result<LoadedLibrary, LinkError> {
        if !path.is_absolute() {
            return Err(LinkError {
                target: path.display().to_string(),
                reason: "library path must be absolute".to_owned(),
            });
        }
        // SAFETY: as above; the path was selected by a loader strategy.
        let library = unsafe { Library::new(path) }.map_err(|e| LinkError {
            target: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Ok(LoadedLibrary::with_handle(
            LibraryOrigin::Path(path.to_path_buf()),
            library,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_path_is_rejected_before_linking() {
        let err = SystemLinker
            .load_by_path(Path::new("lib/thelib.so"))
            .expect_err("relative paths are not loadable");
        assert!(err.reason.contains("absolute"));
    }

    #[test]
    fn missing_file_reports_linker_diagnostic() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("missing-native-library");
        let err = SystemLinker
            .load_by_path(&path)
            .expect_err("missing file cannot be loaded");
        assert_eq!(err.target, path.display().to_string());
        assert!(!err.reason.is_empty());
    }

    #[test]
    fn garbage_file_is_not_a_loadable_image() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("not-a-library");
        std::fs::write(&path, b"definitely not ELF, Mach-O, or PE").expect("write");
        assert!(SystemLinker.load_by_path(&path).is_err());
    }

    #[test]
    fn unknown_name_fails_on_search_path() {
        let err = SystemLinker
            .load_by_name("native-init-no-such-library")
            .expect_err("library does not exist");
        assert!(err.target.contains("native-init-no-such-library"));
    }

    #[test]
    fn symbol_lookup_without_handle_fails() {
        let library = LoadedLibrary::new(LibraryOrigin::Name("thelib".to_owned()));
        assert!(!library.has_handle());
        // SAFETY: the lookup fails before any symbol is produced.
        let result = unsafe { library.symbol::<unsafe extern "C" fn()>(b"init\0") };
        assert!(result.is_err());
    }

    #[test]
    fn origin_display_names_source() {
        let origin = LibraryOrigin::Path(PathBuf::from("/opt/thelib.so"));
        assert_eq!(origin.to_string(), "file '/opt/thelib.so'");
    }
}
