//! Host platform identity used to select native library artefacts.
//!
//! A [`Platform`] pairs an operating system name with a CPU architecture.
//! The OS name is always stored in lowercase so that comparisons against a
//! configured supported set do not depend on how the name was spelled.

use crate::error::ConfigError;
use std::fmt;

/// An operating system and CPU architecture pair.
///
/// # Examples
///
/// ```
/// use native_init::platform::Platform;
///
/// let platform = Platform::new("x86_64", "Linux").expect("valid platform");
/// assert_eq!(platform.os_name(), "linux");
/// assert_eq!(platform.to_string(), "linux:x86_64");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Platform {
    architecture: String,
    os_name: String,
}

impl Platform {
    /// Create a platform from an architecture and an OS name.
    ///
    /// The OS name is lowercased.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EmptyPlatformField`] if either value is empty.
    pub fn new(architecture: &str, os_name: &str) -> Result<Self, ConfigError> {
        let arch = architecture.trim();
        let os = os_name.trim();
        if arch.is_empty() {
            return Err(ConfigError::EmptyPlatformField {
                field: "architecture",
            });
        }
        if os.is_empty() {
            return Err(ConfigError::EmptyPlatformField { field: "os" });
        }
        Ok(Self {
            architecture: arch.to_owned(),
            os_name: os.to_lowercase(),
        })
    }

    /// Detect the platform of the running process.
    ///
    /// The ambient values are read on every call.
    #[must_use]
    pub fn detect() -> Self {
        Self {
            architecture: std::env::consts::ARCH.to_owned(),
            os_name: std::env::consts::OS.to_lowercase(),
        }
    }

    /// Return the CPU architecture, e.g. `x86_64`.
    #[must_use]
    pub fn architecture(&self) -> &str {
        &self.architecture
    }

    /// Return the lowercase operating system name, e.g. `linux`.
    #[must_use]
    pub fn os_name(&self) -> &str {
        &self.os_name
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.os_name, self.architecture)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::collections::HashSet;

    #[rstest]
    #[case::already_lower("x86_64", "linux", "linux")]
    #[case::capitalised("x86_64", "Linux", "linux")]
    #[case::mixed("aarch64", "MacOS", "macos")]
    fn os_name_is_lowercased(#[case] arch: &str, #[case] os: &str, #[case] expected: &str) {
        let platform = Platform::new(arch, os).expect("valid platform");
        assert_eq!(platform.os_name(), expected);
        assert_eq!(platform.architecture(), arch);
    }

    #[rstest]
    #[case::no_arch("", "linux")]
    #[case::no_os("x86_64", "")]
    #[case::blank_os("x86_64", "   ")]
    fn rejects_empty_fields(#[case] arch: &str, #[case] os: &str) {
        let err = Platform::new(arch, os).expect_err("empty field must be rejected");
        assert!(matches!(err, ConfigError::EmptyPlatformField { .. }));
    }

    #[test]
    fn equality_ignores_os_case() {
        let mut set = HashSet::new();
        set.insert(Platform::new("x86_64", "Linux").expect("valid"));
        assert!(set.contains(&Platform::new("x86_64", "linux").expect("valid")));
        assert!(!set.contains(&Platform::new("aarch64", "linux").expect("valid")));
    }

    #[test]
    fn detect_matches_build_target() {
        let platform = Platform::detect();
        assert_eq!(platform.architecture(), std::env::consts::ARCH);
        assert_eq!(platform.os_name(), std::env::consts::OS);
    }
}
