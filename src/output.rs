//! Output formatting for the packager CLI.
//!
//! Progress and diagnostics go to stderr through [`write_stderr_line`]; the
//! machine-readable [`ReleaseReport`] goes to stdout.

use crate::archive::{ReleaseArchive, Sha256Digest};
use crate::pipeline::ReleasePlan;
use crate::target::TargetTriple;
use crate::version::ReleaseVersion;
use camino::Utf8PathBuf;
use serde::Serialize;
use std::io::Write;

/// Write one line to `stderr`, ignoring write failures.
pub fn write_stderr_line(stderr: &mut dyn Write, message: impl std::fmt::Display) {
    if writeln!(stderr, "{message}").is_err() {
        // Best-effort logging; ignore write failures.
    }
}

/// Format the summary line printed after a successful run.
///
/// # Examples
///
/// ```
/// use kak_lsp_release::output::success_message;
///
/// let line = success_message("dist/kak-lsp-1.2.0-x86_64-apple-darwin.tar.gz", 6, "ab12");
/// assert_eq!(
///     line,
///     "Wrote dist/kak-lsp-1.2.0-x86_64-apple-darwin.tar.gz (6 files, sha256 ab12)"
/// );
/// ```
#[must_use]
pub fn success_message(path: impl std::fmt::Display, members: usize, sha256: &str) -> String {
    let plural = if members == 1 { "file" } else { "files" };
    format!("Wrote {path} ({members} {plural}, sha256 {sha256})")
}

/// Render a release plan for `--dry-run`.
#[must_use]
pub fn dry_run_text(plan: &ReleasePlan) -> String {
    let mut lines = vec![
        "Dry run - nothing will be built or written".to_owned(),
        String::new(),
        format!("Name: {}", plan.archive.name()),
        format!("Target: {}", plan.archive.target()),
        format!("Version: {}", plan.archive.version()),
        format!("Tool: {}", plan.tool),
        format!("Tests: {}", if plan.skip_tests { "skipped" } else { "run" }),
        format!("Archive: {}", plan.archive_path),
        String::new(),
        "Files to package:".to_owned(),
    ];
    lines.extend(
        plan.artifacts
            .entries()
            .iter()
            .map(|artifact| format!("  - {} ({}, from {})", artifact.file_name(), artifact.kind, artifact.source)),
    );
    lines.join("\n")
}

/// Machine-readable summary of a finished release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReleaseReport {
    /// Archive and binary name.
    pub name: String,
    /// Version label embedded in the archive name.
    pub version: ReleaseVersion,
    /// Target the archive was built for.
    pub target: TargetTriple,
    /// Location of the archive.
    pub archive: Utf8PathBuf,
    /// Archive members.
    pub members: Vec<String>,
    /// SHA-256 of the archive.
    pub sha256: Sha256Digest,
}

impl ReleaseReport {
    /// Combine a plan and the archive it produced.
    #[must_use]
    pub fn new(plan: &ReleasePlan, archive: ReleaseArchive) -> Self {
        Self {
            name: plan.archive.name().to_owned(),
            version: plan.archive.version().clone(),
            target: plan.archive.target().clone(),
            archive: archive.path,
            members: archive.members,
            sha256: archive.sha256,
        }
    }

    /// Render the report as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialisation fails.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Return the summary line for this report.
    #[must_use]
    pub fn summary(&self) -> String {
        success_message(&self.archive, self.members.len(), self.sha256.as_str())
    }
}
