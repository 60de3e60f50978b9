//! Release archive creation.
//!
//! Packs the top-level files of a staging directory into a gzip-compressed
//! tarball. The archive is assembled in a temporary file next to its final
//! location and renamed into place, so a failure never leaves a partial
//! archive behind.

use super::digest::{Sha256Digest, compute_sha256};
use super::naming::ArchiveName;
use crate::error::{PackagerError, Result};
use crate::stager::StagingDirectory;
use camino::{Utf8Path, Utf8PathBuf};
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use serde::Serialize;
use std::fs;
use std::io::Write;

/// A written release archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReleaseArchive {
    /// Location of the archive.
    pub path: Utf8PathBuf,
    /// Member file names, in the order they were written.
    pub members: Vec<String>,
    /// SHA-256 of the archive file.
    pub sha256: Sha256Digest,
}

/// Package every regular file at the top of `staging` into
/// `output_dir/{name}-{version}-{target}.tar.gz`.
///
/// Members use bare file names and are written in directory-listing order.
/// `output_dir` is created if it does not exist. The process working
/// directory is left untouched.
///
/// # Errors
///
/// Returns [`PackagerError::ArchiveWrite`] if the staging directory cannot be
/// listed or the archive cannot be written, hashed, or moved into place.
pub fn package_archive(
    staging: &StagingDirectory,
    name: &ArchiveName,
    output_dir: &Utf8Path,
) -> Result<ReleaseArchive> {
    let path = output_dir.join(name.filename());
    let write_error = |source: std::io::Error| PackagerError::ArchiveWrite {
        path: path.clone(),
        source,
    };

    let members = top_level_files(staging.path()).map_err(write_error)?;
    fs::create_dir_all(output_dir).map_err(write_error)?;
    write_archive(staging.path(), &members, output_dir, &path).map_err(write_error)?;
    let sha256 = compute_sha256(path.as_std_path()).map_err(write_error)?;

    log::info!("wrote {path} ({} members)", members.len());
    Ok(ReleaseArchive {
        path,
        members,
        sha256,
    })
}

/// List the regular files directly inside `dir`, in listing order.
fn top_level_files(dir: &Utf8Path) -> std::io::Result<Vec<String>> {
    let mut files = Vec::new();
    for entry in dir.read_dir_utf8()? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            files.push(entry.file_name().to_owned());
        }
    }
    Ok(files)
}

fn write_archive(
    source_dir: &Utf8Path,
    members: &[String],
    output_dir: &Utf8Path,
    dest: &Utf8Path,
) -> std::io::Result<()> {
    let partial = tempfile::Builder::new()
        .prefix(".kak-lsp-release-")
        .suffix(".partial")
        .tempfile_in(output_dir)?;

    let encoder = GzEncoder::new(partial.as_file(), Compression::default());
    let mut builder = tar::Builder::new(encoder);
    for member in members {
        builder.append_path_with_name(source_dir.join(member), member)?;
    }
    let mut file = builder.into_inner()?.finish()?;
    file.flush()?;
    file.sync_all()?;

    partial.persist(dest).map_err(|err| err.error)?;
    Ok(())
}

/// Return the member paths of a `.tar.gz` archive, in archive order.
///
/// # Errors
///
/// Returns an I/O error if the archive cannot be read or decoded.
pub fn list_archive_members(path: &Utf8Path) -> std::io::Result<Vec<String>> {
    let file = fs::File::open(path)?;
    let mut archive = tar::Archive::new(GzDecoder::new(file));
    let mut members = Vec::new();
    for entry in archive.entries()? {
        let entry = entry?;
        members.push(entry.path()?.to_string_lossy().into_owned());
    }
    Ok(members)
}

#[cfg(test)]
#[path = "packaging_tests.rs"]
mod tests;
