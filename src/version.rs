//! Release version resolution from version control.
//!
//! The version label is the output of `git describe --tags`: the nearest tag,
//! plus a distance and abbreviated hash when the checkout is past that tag.
//! A tag supplied explicitly (for example by a CI job) replaces the lookup.

use crate::error::{PackagerError, Result};
use crate::executor::{CommandExecutor, stderr_text};
use serde::Serialize;
use std::fmt;

/// A release version label, safe to embed in an archive file name.
///
/// # Examples
///
/// ```
/// use kak_lsp_release::version::ReleaseVersion;
///
/// let version = ReleaseVersion::try_from(" v12.1.0-3-gabc1234\n").expect("valid version");
/// assert_eq!(version.as_str(), "v12.1.0-3-gabc1234");
/// assert!(ReleaseVersion::try_from("release/1.0").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ReleaseVersion(String);

impl ReleaseVersion {
    /// Return the version as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&str> for ReleaseVersion {
    type Error = PackagerError;

    fn try_from(value: &str) -> Result<Self> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(PackagerError::VersionResolution {
                reason: "version is empty".to_owned(),
            });
        }
        if let Some(bad) = trimmed
            .chars()
            .find(|c| c.is_whitespace() || matches!(c, '/' | '\\'))
        {
            return Err(PackagerError::VersionResolution {
                reason: format!("version \"{trimmed}\" contains {bad:?}"),
            });
        }
        Ok(Self(trimmed.to_owned()))
    }
}

impl fmt::Display for ReleaseVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where the release version comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionSource {
    /// Ask `git describe --tags` in the project root.
    GitDescribe,
    /// Use a tag supplied on the command line or by the environment.
    Explicit(ReleaseVersion),
}

impl VersionSource {
    /// Resolve the version, running git only when no tag was supplied.
    ///
    /// # Errors
    ///
    /// Returns [`PackagerError::VersionResolution`] when git describe fails.
    pub fn resolve(&self, executor: &dyn CommandExecutor) -> Result<ReleaseVersion> {
        match self {
            Self::GitDescribe => resolve_version(executor),
            Self::Explicit(version) => {
                log::debug!("using explicit release version {version}");
                Ok(version.clone())
            }
        }
    }
}

/// Resolve the release version with `git describe --tags`.
///
/// The executor is expected to run inside the project root.
///
/// # Errors
///
/// Returns [`PackagerError::VersionResolution`] when git cannot be started,
/// times out, exits non-zero (no tags, not a repository), or prints nothing
/// usable.
pub fn resolve_version(executor: &dyn CommandExecutor) -> Result<ReleaseVersion> {
    let output = executor
        .run("git", &["describe", "--tags"])
        .map_err(|err| PackagerError::VersionResolution {
            reason: format!("failed to run git: {err}"),
        })?;

    if !output.status.success() {
        let stderr = stderr_text(&output);
        return Err(PackagerError::VersionResolution {
            reason: if stderr.is_empty() {
                format!("git describe --tags exited with {}", output.status)
            } else {
                stderr
            },
        });
    }

    parse_describe_output(&output.stdout)
}

/// Parse the stdout of `git describe --tags` into a version.
///
/// # Errors
///
/// Returns [`PackagerError::VersionResolution`] if the output is empty or
/// not a valid version label.
pub fn parse_describe_output(stdout: &[u8]) -> Result<ReleaseVersion> {
    let text = String::from_utf8_lossy(stdout);
    let first_line = text.lines().next().unwrap_or_default();
    ReleaseVersion::try_from(first_line).map_err(|err| match err {
        PackagerError::VersionResolution { reason } => PackagerError::VersionResolution {
            reason: format!("git describe --tags printed no usable version: {reason}"),
        },
        other => other,
    })
}
