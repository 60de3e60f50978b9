//! Extraction of a single executable from a gzip-compressed tarball.
//!
//! Tool releases ship as `.tar.gz` archives. Only the named executable is
//! unpacked; every entry path is checked so nothing can land outside the
//! destination directory.

use flate2::read::GzDecoder;
use std::path::{Component, Path, PathBuf};

/// Errors arising from archive extraction.
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    /// I/O error during extraction.
    #[error("extraction I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A path in the archive attempts to traverse outside the destination.
    #[error("path traversal detected: {path}")]
    PathTraversal {
        /// The offending path from the archive entry.
        path: String,
    },

    /// The archive has no entry with the requested file name.
    #[error("archive does not contain {name}")]
    EntryNotFound {
        /// File name that was looked for.
        name: String,
    },
}

/// Extract the entry whose file name is `name` into `dest_dir`.
///
/// The entry may sit at any depth inside the archive; it is written directly
/// into `dest_dir` under its bare file name. Returns the written path.
///
/// # Errors
///
/// Returns [`ExtractionError::PathTraversal`] if any entry before the match
/// escapes the archive root, [`ExtractionError::EntryNotFound`] if no entry
/// matches, and [`ExtractionError::Io`] on read or write failures.
pub fn extract_executable(
    archive_path: &Path,
    name: &str,
    dest_dir: &Path,
) -> Result<PathBuf, ExtractionError> {
    let file = std::fs::File::open(archive_path)?;
    let mut archive = tar::Archive::new(GzDecoder::new(file));

    for entry_result in archive.entries()? {
        let mut entry = entry_result?;
        let entry_path = entry.path()?.into_owned();
        validate_entry_path(&entry_path)?;

        if !entry.header().entry_type().is_file() {
            continue;
        }
        if entry_path.file_name().is_none_or(|file| file != name) {
            continue;
        }

        std::fs::create_dir_all(dest_dir)?;
        let dest = dest_dir.join(name);
        entry.unpack(&dest)?;
        mark_executable(&dest)?;
        return Ok(dest);
    }

    Err(ExtractionError::EntryNotFound {
        name: name.to_owned(),
    })
}

/// Validate that a tar entry path does not escape the destination
/// directory via `..` components or absolute paths.
fn validate_entry_path(path: &Path) -> Result<(), ExtractionError> {
    let escapes = path.is_absolute()
        || path
            .components()
            .any(|c| matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_)));
    if escapes {
        return Err(ExtractionError::PathTraversal {
            path: path.display().to_string(),
        });
    }
    Ok(())
}

#[cfg(unix)]
fn mark_executable(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut perms = std::fs::metadata(path)?.permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(path, perms)
}

#[cfg(not(unix))]
fn mark_executable(_path: &Path) -> std::io::Result<()> {
    Ok(())
}
