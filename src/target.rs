//! Target triple validation and host-based target resolution.
//!
//! A release is built for exactly one target triple. The triple is either
//! supplied explicitly or derived from the host operating system through a
//! static table; hosts missing from the table fail fast rather than guessing.

use crate::error::{PackagerError, Result};
use serde::Serialize;
use std::fmt;

/// Default release target for each supported host OS, keyed by the
/// `uname -s` spelling of the OS name.
const HOST_TARGETS: &[(&str, &str)] = &[
    ("Linux", "x86_64-unknown-linux-musl"),
    ("Darwin", "x86_64-apple-darwin"),
];

/// A syntactically valid target triple.
///
/// Construction via [`TryFrom`] checks the `{arch}-{vendor}-{os}[-{abi}]`
/// shape; it does not check that the triple is known to the toolchain.
///
/// # Examples
///
/// ```
/// use kak_lsp_release::target::TargetTriple;
///
/// let triple: TargetTriple = "x86_64-unknown-linux-musl"
///     .try_into()
///     .expect("valid target triple");
/// assert_eq!(triple.as_str(), "x86_64-unknown-linux-musl");
/// assert_eq!(triple.executable_suffix(), "");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct TargetTriple(String);

impl TargetTriple {
    /// Return the triple as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the wrapper and return the inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }

    /// Return the executable file suffix for binaries built for this target.
    ///
    /// Inspects the triple at runtime so the answer is correct when
    /// cross-compiling for a platform other than the host.
    #[must_use]
    pub fn executable_suffix(&self) -> &'static str {
        if self.0.contains("windows") {
            ".exe"
        } else {
            ""
        }
    }
}

impl TryFrom<&str> for TargetTriple {
    type Error = PackagerError;

    fn try_from(value: &str) -> Result<Self> {
        validate_triple(value)?;
        Ok(Self(value.to_owned()))
    }
}

impl TryFrom<String> for TargetTriple {
    type Error = PackagerError;

    fn try_from(value: String) -> Result<Self> {
        validate_triple(&value)?;
        Ok(Self(value))
    }
}

impl AsRef<str> for TargetTriple {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TargetTriple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn validate_triple(value: &str) -> Result<()> {
    let invalid = |reason: &str| PackagerError::InvalidTarget {
        value: value.to_owned(),
        reason: reason.to_owned(),
    };

    if value.is_empty() {
        return Err(invalid("triple is empty"));
    }
    if !value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    {
        return Err(invalid("only ASCII letters, digits, '_', '.' and '-' are allowed"));
    }
    let components: Vec<&str> = value.split('-').collect();
    if components.len() < 3 {
        return Err(invalid("expected at least {arch}-{vendor}-{os}"));
    }
    if components.iter().any(|c| c.is_empty()) {
        return Err(invalid("triple contains an empty component"));
    }
    Ok(())
}

/// The operating system of the machine running the packager.
///
/// Names follow `uname -s` (`Linux`, `Darwin`, ...), which is how the host
/// table in this module is keyed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostOs(String);

impl HostOs {
    /// Wrap an explicit OS name, for example one reported by `uname -s`.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Detect the host OS from the compile-time platform constants.
    #[must_use]
    pub fn detect() -> Self {
        Self::from_rust_os(std::env::consts::OS)
    }

    /// Translate a `std::env::consts::OS` value into its `uname -s` name.
    ///
    /// Unknown values are kept verbatim so error messages still identify the
    /// host.
    #[must_use]
    pub fn from_rust_os(os: &str) -> Self {
        let name = match os {
            "linux" => "Linux",
            "macos" => "Darwin",
            "freebsd" => "FreeBSD",
            "netbsd" => "NetBSD",
            "openbsd" => "OpenBSD",
            "windows" => "Windows_NT",
            other => other,
        };
        Self(name.to_owned())
    }

    /// Return the OS name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HostOs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Return the default target for a host OS, if the host is supported.
#[must_use]
pub fn default_target_for(host: &HostOs) -> Option<&'static str> {
    HOST_TARGETS
        .iter()
        .find(|(os, _)| *os == host.as_str())
        .map(|(_, triple)| *triple)
}

/// Return the host OS names that have a default target.
#[must_use]
pub fn supported_hosts() -> Vec<&'static str> {
    HOST_TARGETS.iter().map(|(os, _)| *os).collect()
}

/// Resolve the release target.
///
/// An explicit target always wins and is only checked for shape. Without
/// one, the host OS is looked up in the static host table.
///
/// # Errors
///
/// Returns [`PackagerError::InvalidTarget`] for a malformed explicit triple
/// and [`PackagerError::UnsupportedPlatform`] when no explicit triple is
/// given and the host has no default.
///
/// # Examples
///
/// ```
/// use kak_lsp_release::target::{HostOs, resolve_target};
///
/// let target = resolve_target(None, &HostOs::new("Darwin")).expect("mapped host");
/// assert_eq!(target.as_str(), "x86_64-apple-darwin");
///
/// assert!(resolve_target(None, &HostOs::new("SunOS")).is_err());
/// ```
pub fn resolve_target(explicit: Option<&str>, host: &HostOs) -> Result<TargetTriple> {
    if let Some(triple) = explicit {
        return TargetTriple::try_from(triple);
    }

    let triple = default_target_for(host).ok_or_else(|| PackagerError::UnsupportedPlatform {
        os: host.as_str().to_owned(),
    })?;
    log::debug!("host {host} maps to default target {triple}");
    TargetTriple::try_from(triple)
}
