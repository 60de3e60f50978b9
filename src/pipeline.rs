//! End-to-end release pipeline.
//!
//! The flow is linear: resolve the target and version, make the tool
//! available, build and test, stage the artifacts, and package them. Any
//! failure aborts the remaining stages. The staging directory is owned by
//! [`StagingDirectory`], so it is removed on every exit path.

use crate::archive::{ArchiveName, package_archive};
use crate::builder::{BuildConfig, Builder, binary_path};
use crate::config::ReleaseConfig;
use crate::error::Result;
use crate::executor::CommandExecutor;
use crate::output::{ReleaseReport, write_stderr_line};
use crate::stager::{ArtifactSet, stage_artifacts};
use crate::target::{HostOs, resolve_target};
use crate::tool::ToolProvider;
use camino::Utf8PathBuf;
use std::io::Write;

/// Everything decided before any build work starts.
#[derive(Debug, Clone)]
pub struct ReleasePlan {
    /// Name of the archive to produce.
    pub archive: ArchiveName,
    /// Where the archive will be written.
    pub archive_path: Utf8PathBuf,
    /// Where the build will leave the release binary.
    pub binary_path: Utf8PathBuf,
    /// Files to stage, in order.
    pub artifacts: ArtifactSet,
    /// Configured tool program.
    pub tool: String,
    /// Whether the test phase is skipped.
    pub skip_tests: bool,
}

/// Resolve the target and version and derive every path of the run.
///
/// The executor is only used for `git describe` and must run in the
/// project root.
///
/// # Errors
///
/// Returns target, version, or configuration errors.
pub fn plan(
    config: &ReleaseConfig,
    host: &HostOs,
    executor: &dyn CommandExecutor,
) -> Result<ReleasePlan> {
    let target = resolve_target(config.target.as_deref(), host)?;
    let version = config.version.resolve(executor)?;
    log::info!("releasing {} {version} for {target}", config.name);

    let binary_path = binary_path(&config.cargo_target_dir, &target, &config.binary_name);
    let artifacts =
        ArtifactSet::for_release(&config.artifacts, &config.project_root, &binary_path)?;
    let archive = ArchiveName::new(config.name.clone(), version, target);
    let archive_path = config.output_dir.join(archive.filename());

    Ok(ReleasePlan {
        archive,
        archive_path,
        binary_path,
        artifacts,
        tool: config.tool.program.clone(),
        skip_tests: config.skip_tests,
    })
}

/// Collaborators and settings for one pipeline run.
pub struct PipelineContext<'a> {
    /// Release configuration.
    pub config: &'a ReleaseConfig,
    /// Host OS used when no target is configured.
    pub host: &'a HostOs,
    /// Runs git, cargo, and the tool inside the project root.
    pub executor: &'a dyn CommandExecutor,
    /// Makes the cross-compilation tool available.
    pub tool: &'a dyn ToolProvider,
    /// Suppress progress output.
    pub quiet: bool,
}

impl PipelineContext<'_> {
    fn progress(&self, stderr: &mut dyn Write, message: impl std::fmt::Display) {
        if !self.quiet {
            write_stderr_line(stderr, message);
        }
    }
}

/// Run the whole pipeline and report the archive it produced.
///
/// # Errors
///
/// Returns the first stage failure. No archive exists at the planned path
/// when this returns an error from a stage before packaging.
pub fn execute(context: &PipelineContext<'_>, stderr: &mut dyn Write) -> Result<ReleaseReport> {
    let config = context.config;
    let plan = plan(config, context.host, context.executor)?;
    context.progress(
        stderr,
        format!(
            "Releasing {} {} for {}",
            plan.archive.name(),
            plan.archive.version(),
            plan.archive.target()
        ),
    );

    let program = context.tool.ensure_installed()?;
    log::info!("using tool {program}");

    context.progress(stderr, format!("Building with {program}..."));
    let builder = Builder::new(BuildConfig {
        program,
        project_root: config.project_root.clone(),
        target_dir: config.cargo_target_dir.clone(),
        binary_name: config.binary_name.clone(),
        verbosity: config.verbosity,
        skip_tests: config.skip_tests,
    });
    let built = builder.build_and_test(context.executor, plan.archive.target())?;
    debug_assert_eq!(built.binary_path, plan.binary_path);

    context.progress(
        stderr,
        format!("Staging {} files...", plan.artifacts.entries().len()),
    );
    let staging = stage_artifacts(&plan.artifacts, config.staging_parent.as_deref())?;

    context.progress(stderr, format!("Packaging {}...", plan.archive));
    let archive = package_archive(&staging, &plan.archive, &config.output_dir)?;

    if let Err(err) = staging.close() {
        log::warn!("failed to remove staging directory: {err}");
    }

    let report = ReleaseReport::new(&plan, archive);
    context.progress(stderr, report.summary());
    Ok(report)
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
