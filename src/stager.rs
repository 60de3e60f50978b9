//! Artifact collection into an exclusively owned staging directory.
//!
//! Each run stages into a fresh, uniquely named temporary directory. The
//! directory is deleted when the [`StagingDirectory`] is dropped, so every
//! early return (including a missing artifact part way through) cleans up.

use crate::config::ArtifactManifest;
use crate::error::{PackagerError, Result};
use camino::{Utf8Path, Utf8PathBuf};
use std::collections::HashSet;
use std::fmt;
use std::fs;
use tempfile::TempDir;

/// Prefix of every staging directory name.
pub const STAGING_PREFIX: &str = "kak-lsp-release-";

/// Role of a file in the release archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    /// The compiled release binary.
    Binary,
    /// The default configuration file.
    Config,
    /// The readme document.
    Readme,
    /// A license file.
    License,
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Binary => "binary",
            Self::Config => "config",
            Self::Readme => "readme",
            Self::License => "license",
        })
    }
}

/// A single file to stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// Role of the file.
    pub kind: ArtifactKind,
    /// Where the file is copied from.
    pub source: Utf8PathBuf,
}

impl Artifact {
    /// Bare file name the artifact is staged under.
    #[must_use]
    pub fn file_name(&self) -> &str {
        self.source.file_name().unwrap_or_default()
    }
}

/// The ordered set of files that make up a release.
///
/// No two entries share a file name, so each staged file is present exactly
/// once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactSet {
    entries: Vec<Artifact>,
}

impl ArtifactSet {
    /// Build the artifact set from explicit entries.
    ///
    /// # Errors
    ///
    /// Returns [`PackagerError::InvalidConfig`] if an entry has no file name
    /// or two entries share one.
    pub fn new(entries: Vec<Artifact>) -> Result<Self> {
        let mut seen = HashSet::new();
        for artifact in &entries {
            let name = artifact.file_name();
            if name.is_empty() {
                return Err(PackagerError::InvalidConfig {
                    reason: format!("{} path {} has no file name", artifact.kind, artifact.source),
                });
            }
            if !seen.insert(name.to_owned()) {
                return Err(PackagerError::InvalidConfig {
                    reason: format!("more than one artifact is named {name}"),
                });
            }
        }
        Ok(Self { entries })
    }

    /// Build the fixed release set: binary, config, readme, then licenses.
    ///
    /// Manifest paths are resolved against `project_root`.
    ///
    /// # Errors
    ///
    /// Returns [`PackagerError::InvalidConfig`] on duplicate file names.
    pub fn for_release(
        manifest: &ArtifactManifest,
        project_root: &Utf8Path,
        binary: &Utf8Path,
    ) -> Result<Self> {
        let mut entries = vec![
            Artifact {
                kind: ArtifactKind::Binary,
                source: binary.to_owned(),
            },
            Artifact {
                kind: ArtifactKind::Config,
                source: project_root.join(&manifest.config_file),
            },
            Artifact {
                kind: ArtifactKind::Readme,
                source: project_root.join(&manifest.readme),
            },
        ];
        entries.extend(manifest.license_files.iter().map(|license| Artifact {
            kind: ArtifactKind::License,
            source: project_root.join(license),
        }));
        Self::new(entries)
    }

    /// Return the entries in staging order.
    #[must_use]
    pub fn entries(&self) -> &[Artifact] {
        &self.entries
    }

    /// Return the bare file names in staging order.
    #[must_use]
    pub fn file_names(&self) -> Vec<&str> {
        self.entries.iter().map(Artifact::file_name).collect()
    }
}

/// A uniquely named temporary directory owned by one packaging run.
#[derive(Debug)]
pub struct StagingDirectory {
    dir: TempDir,
    path: Utf8PathBuf,
    staged: Vec<String>,
}

impl StagingDirectory {
    /// Create a staging directory under the system temp directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or its path is
    /// not UTF-8.
    pub fn create() -> Result<Self> {
        Self::from_builder(|builder| builder.tempdir())
    }

    /// Create a staging directory under `parent`.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or its path is
    /// not UTF-8.
    pub fn create_in(parent: &Utf8Path) -> Result<Self> {
        Self::from_builder(|builder| builder.tempdir_in(parent))
    }

    fn from_builder(
        make: impl FnOnce(&mut tempfile::Builder<'_, '_>) -> std::io::Result<TempDir>,
    ) -> Result<Self> {
        let dir = make(tempfile::Builder::new().prefix(STAGING_PREFIX))?;
        let path = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).map_err(|path| {
            PackagerError::InvalidConfig {
                reason: format!("staging path {} is not UTF-8", path.display()),
            }
        })?;
        log::debug!("created staging directory {path}");
        Ok(Self {
            dir,
            path,
            staged: Vec::new(),
        })
    }

    /// Return the directory path.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Return the file names staged so far, in copy order.
    #[must_use]
    pub fn staged_files(&self) -> &[String] {
        &self.staged
    }

    /// Copy one artifact into the directory under its bare file name.
    ///
    /// # Errors
    ///
    /// Returns [`PackagerError::MissingArtifact`] if the source is not a
    /// regular file, or an I/O error if the copy fails.
    pub fn stage(&mut self, artifact: &Artifact) -> Result<Utf8PathBuf> {
        if !artifact.source.is_file() {
            return Err(PackagerError::MissingArtifact {
                path: artifact.source.clone(),
            });
        }

        let name = artifact.file_name();
        let dest = self.path.join(name);
        fs::copy(&artifact.source, &dest)?;
        log::debug!("staged {} {} as {name}", artifact.kind, artifact.source);
        self.staged.push(name.to_owned());
        Ok(dest)
    }

    /// Delete the directory now, reporting any failure.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the tree cannot be removed.
    pub fn close(self) -> Result<()> {
        let path = self.path;
        self.dir.close()?;
        log::debug!("removed staging directory {path}");
        Ok(())
    }
}

/// Copy every artifact, in order, into a fresh staging directory.
///
/// The directory lives under `parent` when given, otherwise under the
/// system temp directory. On error the partially filled directory is
/// removed before returning.
///
/// # Errors
///
/// Returns [`PackagerError::MissingArtifact`] for the first absent source,
/// or an I/O error if the directory cannot be created or a copy fails.
pub fn stage_artifacts(
    artifacts: &ArtifactSet,
    parent: Option<&Utf8Path>,
) -> Result<StagingDirectory> {
    let mut staging = match parent {
        Some(parent) => StagingDirectory::create_in(parent)?,
        None => StagingDirectory::create()?,
    };

    for artifact in artifacts.entries() {
        staging.stage(artifact)?;
    }
    Ok(staging)
}
