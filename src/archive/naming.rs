//! Archive naming policy.
//!
//! Release archives are named `{name}-{version}-{target}.tar.gz`, which is
//! unique per (name, version, target) so per-platform uploads never collide.

use crate::target::TargetTriple;
use crate::version::ReleaseVersion;
use std::fmt;

/// The fixed file extension for release archives.
pub const ARCHIVE_EXTENSION: &str = ".tar.gz";

/// A fully-qualified release archive name.
///
/// # Examples
///
/// ```
/// use kak_lsp_release::archive::ArchiveName;
/// use kak_lsp_release::target::TargetTriple;
/// use kak_lsp_release::version::ReleaseVersion;
///
/// let version = ReleaseVersion::try_from("1.2.0").expect("valid version");
/// let target = TargetTriple::try_from("x86_64-unknown-linux-musl").expect("valid target");
///
/// let name = ArchiveName::new("kak-lsp", version, target);
/// assert_eq!(name.filename(), "kak-lsp-1.2.0-x86_64-unknown-linux-musl.tar.gz");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveName {
    name: String,
    version: ReleaseVersion,
    target: TargetTriple,
}

impl ArchiveName {
    /// Create an archive name from its components.
    #[must_use]
    pub fn new(name: impl Into<String>, version: ReleaseVersion, target: TargetTriple) -> Self {
        Self {
            name: name.into(),
            version,
            target,
        }
    }

    /// Return the project name component.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Return the version component.
    #[must_use]
    pub fn version(&self) -> &ReleaseVersion {
        &self.version
    }

    /// Return the target triple component.
    #[must_use]
    pub fn target(&self) -> &TargetTriple {
        &self.target
    }

    /// Return the file name of the archive.
    #[must_use]
    pub fn filename(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ArchiveName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}-{}{ARCHIVE_EXTENSION}",
            self.name, self.version, self.target
        )
    }
}
