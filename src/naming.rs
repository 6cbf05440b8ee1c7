//! Platform naming policy for bundled native libraries.
//!
//! A [`NamingScheme`] maps a logical library identity onto the concrete
//! resource and file names used for the current platform:
//! `[relative_path]<library>-<os>-<arch>[-<version>]`.
//!
//! Resolution never touches the filesystem. The platform is detected on each
//! call, so the same scheme can be shared freely between loaders.

use crate::error::{ConfigError, NamingError};
use crate::platform::Platform;
use std::collections::HashSet;
use std::fmt;

/// A validated, non-empty logical library name.
///
/// # Examples
///
/// ```
/// use native_init::naming::LibraryName;
///
/// let name: LibraryName = "thelib".try_into().expect("valid library name");
/// assert_eq!(name.as_str(), "thelib");
/// assert!(LibraryName::try_from("").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LibraryName(String);

impl LibraryName {
    /// Return the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&str> for LibraryName {
    type Error = ConfigError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(ConfigError::EmptyLibraryName);
        }
        Ok(Self(trimmed.to_owned()))
    }
}

impl TryFrom<String> for LibraryName {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::try_from(value.as_str())
    }
}

impl fmt::Display for LibraryName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A validated, non-empty library version.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LibraryVersion(String);

impl LibraryVersion {
    /// Return the version as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&str> for LibraryVersion {
    type Error = ConfigError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(ConfigError::EmptyVersion);
        }
        Ok(Self(trimmed.to_owned()))
    }
}

impl TryFrom<String> for LibraryVersion {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::try_from(value.as_str())
    }
}

impl fmt::Display for LibraryVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Deterministic naming of platform-specific library artefacts.
///
/// # Examples
///
/// ```
/// use native_init::naming::NamingScheme;
/// use native_init::platform::Platform;
///
/// let scheme = NamingScheme::new("thelib".try_into().expect("valid name"))
///     .with_version("0.4.2".try_into().expect("valid version"))
///     .with_relative_path("lib");
/// let platform = Platform::new("x86_64", "Linux").expect("valid platform");
///
/// assert_eq!(
///     scheme.resolve_for(&platform, true, true).expect("supported"),
///     "lib/thelib-linux-x86_64-0.4.2"
/// );
/// assert_eq!(
///     scheme.resolve_for(&platform, false, false).expect("supported"),
///     "thelib-linux-x86_64"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamingScheme {
    library_name: LibraryName,
    version: Option<LibraryVersion>,
    relative_path: Option<String>,
    supported_platforms: Option<HashSet<Platform>>,
}

impl NamingScheme {
    /// Create a scheme accepting every platform, with no version and no
    /// relative path.
    #[must_use]
    pub const fn new(library_name: LibraryName) -> Self {
        Self {
            library_name,
            version: None,
            relative_path: None,
            supported_platforms: None,
        }
    }

    /// Append `version` to file names resolved with `include_version`.
    #[must_use]
    pub fn with_version(mut self, version: LibraryVersion) -> Self {
        self.version = Some(version);
        self
    }

    /// Prefix resource names with `path`.
    ///
    /// The path is normalised to end with exactly one `/`. An empty path
    /// clears the prefix.
    #[must_use]
    pub fn with_relative_path(mut self, path: &str) -> Self {
        let trimmed = path.trim_end_matches('/');
        self.relative_path = if trimmed.is_empty() {
            None
        } else {
            Some(format!("{trimmed}/"))
        };
        self
    }

    /// Restrict resolution to `platform` and any other platforms added.
    #[must_use]
    pub fn with_supported_platform(mut self, platform: Platform) -> Self {
        self.add_supported_platform(platform);
        self
    }

    /// Add `platform` to the supported set, creating the set if needed.
    pub fn add_supported_platform(&mut self, platform: Platform) {
        self.supported_platforms
            .get_or_insert_with(HashSet::new)
            .insert(platform);
    }

    /// Remove `platform` from the supported set.
    ///
    /// Returns `true` if the platform was present. Removing the last platform
    /// leaves an empty set, which rejects every platform.
    pub fn remove_supported_platform(&mut self, platform: &Platform) -> bool {
        self.supported_platforms
            .as_mut()
            .is_some_and(|set| set.remove(platform))
    }

    /// Return the logical library name.
    #[must_use]
    pub const fn library_name(&self) -> &LibraryName {
        &self.library_name
    }

    /// Return the version, if configured.
    #[must_use]
    pub const fn version(&self) -> Option<&LibraryVersion> {
        self.version.as_ref()
    }

    /// Return the normalised relative path, if configured.
    #[must_use]
    pub fn relative_path(&self) -> Option<&str> {
        self.relative_path.as_deref()
    }

    /// Return the supported platforms, or `None` when every platform is
    /// accepted.
    #[must_use]
    pub const fn supported_platforms(&self) -> Option<&HashSet<Platform>> {
        self.supported_platforms.as_ref()
    }

    /// Resolve the name for the platform of the running process.
    ///
    /// # Errors
    ///
    /// Returns [`NamingError::UnsupportedPlatform`] when a supported set is
    /// configured and the detected platform is not in it.
    pub fn resolve(
        &self,
        include_path: bool,
        include_version: bool,
    ) -> Result<String, NamingError> {
        self.resolve_for(&Platform::detect(), include_path, include_version)
    }

    /// Resolve the name for an explicit `platform`.
    ///
    /// # Errors
    ///
    /// Returns [`NamingError::UnsupportedPlatform`] when a supported set is
    /// configured and `platform` is not in it.
    pub fn resolve_for(
        &self,
        platform: &Platform,
        include_path: bool,
        include_version: bool,
    ) -> Result<String, NamingError> {
        self.ensure_supported(platform)?;

        let mut name = String::new();
        if let Some(path) = self.relative_path.as_deref().filter(|_| include_path) {
            name.push_str(path);
        }
        name.push_str(self.library_name.as_str());
        name.push('-');
        name.push_str(platform.os_name());
        name.push('-');
        name.push_str(platform.architecture());
        if let Some(version) = self.version.as_ref().filter(|_| include_version) {
            name.push('-');
            name.push_str(version.as_str());
        }
        Ok(name)
    }

    fn ensure_supported(&self, platform: &Platform) -> Result<(), NamingError> {
        let Some(supported) = &self.supported_platforms else {
            return Ok(());
        };
        if supported.contains(platform) {
            return Ok(());
        }
        let mut expected: Vec<String> = supported.iter().map(ToString::to_string).collect();
        expected.sort();
        Err(NamingError::UnsupportedPlatform {
            platform: platform.clone(),
            expected: expected.join(", "),
        })
    }
}
