//! Release build and test orchestration.
//!
//! Drives the cross-compilation tool through its `build` and `test`
//! subcommands for one target in the release profile. Output is streamed to
//! the terminal; only the exit status decides whether the run continues.

use crate::error::{PackagerError, Result};
use crate::executor::{CommandExecutor, stderr_text};
use crate::target::TargetTriple;
use camino::{Utf8Path, Utf8PathBuf};

/// Configuration for the build process.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Program to invoke, as returned by the tool provider.
    pub program: String,
    /// Root of the project being released.
    pub project_root: Utf8PathBuf,
    /// Cargo's target directory for the project.
    pub target_dir: Utf8PathBuf,
    /// File stem of the binary being released.
    pub binary_name: String,
    /// Number of `-v` flags forwarded to the tool.
    pub verbosity: u8,
    /// Skip `<tool> test`.
    pub skip_tests: bool,
}

/// Result of a successful build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOutput {
    /// Path of the compiled release binary.
    pub binary_path: Utf8PathBuf,
}

#[derive(Debug, Clone, Copy)]
enum Phase {
    Build,
    Test,
}

impl Phase {
    fn subcommand(self) -> &'static str {
        match self {
            Self::Build => "build",
            Self::Test => "test",
        }
    }
}

/// Builder for the release binary.
pub struct Builder {
    config: BuildConfig,
}

impl Builder {
    /// Create a new builder with the given configuration.
    #[must_use]
    pub fn new(config: BuildConfig) -> Self {
        Self { config }
    }

    /// Build the release binary for `target`, then run its tests.
    ///
    /// Generates `Cargo.lock` first when the project has none. The executor
    /// must run commands inside the project root.
    ///
    /// # Errors
    ///
    /// Returns [`PackagerError::BuildFailed`] if lockfile generation or the
    /// build fails or times out, and [`PackagerError::TestFailed`] if the
    /// tests fail or time out.
    pub fn build_and_test(
        &self,
        executor: &dyn CommandExecutor,
        target: &TargetTriple,
    ) -> Result<BuildOutput> {
        ensure_lockfile(executor, &self.config.project_root, target)?;

        log::info!("building {} for {target}", self.config.binary_name);
        self.run_phase(executor, target, Phase::Build)?;

        if self.config.skip_tests {
            log::info!("skipping tests for {target}");
        } else {
            log::info!("testing {} for {target}", self.config.binary_name);
            self.run_phase(executor, target, Phase::Test)?;
        }

        Ok(BuildOutput {
            binary_path: self.binary_path(target),
        })
    }

    /// Return the tool arguments for a phase.
    fn phase_args<'a>(&self, target: &'a TargetTriple, phase: Phase) -> Vec<&'a str> {
        let mut args = vec![phase.subcommand(), "--target", target.as_str(), "--release"];
        args.extend(std::iter::repeat_n("-v", usize::from(self.config.verbosity)));
        args
    }

    fn run_phase(
        &self,
        executor: &dyn CommandExecutor,
        target: &TargetTriple,
        phase: Phase,
    ) -> Result<()> {
        let args = self.phase_args(target, phase);
        let program = &self.config.program;

        let status = match executor.run_attached(program, &args) {
            Ok(status) => status,
            Err(PackagerError::Io(err)) => {
                return Err(phase_failure(
                    phase,
                    target,
                    None,
                    format!("failed to run {program}: {err}"),
                ));
            }
            Err(err @ PackagerError::Timeout { .. }) => {
                return Err(phase_failure(phase, target, None, err.to_string()));
            }
            Err(other) => return Err(other),
        };

        if status.success() {
            return Ok(());
        }
        Err(phase_failure(
            phase,
            target,
            status.code(),
            format!("`{program} {}` did not succeed", args.join(" ")),
        ))
    }

    /// Compute the expected path of the release binary.
    #[must_use]
    pub fn binary_path(&self, target: &TargetTriple) -> Utf8PathBuf {
        binary_path(
            &self.config.target_dir,
            target,
            &self.config.binary_name,
        )
    }
}

/// Path of the release binary the tool produces for `target`.
///
/// # Examples
///
/// ```
/// use camino::Utf8Path;
/// use kak_lsp_release::builder::binary_path;
/// use kak_lsp_release::target::TargetTriple;
///
/// let target = TargetTriple::try_from("x86_64-pc-windows-gnu").expect("valid");
/// let path = binary_path(Utf8Path::new("target"), &target, "kak-lsp");
/// assert_eq!(path, "target/x86_64-pc-windows-gnu/release/kak-lsp.exe");
/// ```
#[must_use]
pub fn binary_path(target_dir: &Utf8Path, target: &TargetTriple, name: &str) -> Utf8PathBuf {
    target_dir
        .join(target.as_str())
        .join("release")
        .join(format!("{name}{}", target.executable_suffix()))
}

/// Run `cargo generate-lockfile` when `Cargo.lock` is missing.
///
/// # Errors
///
/// Returns [`PackagerError::BuildFailed`] if cargo cannot generate the
/// lockfile.
pub fn ensure_lockfile(
    executor: &dyn CommandExecutor,
    project_root: &Utf8Path,
    target: &TargetTriple,
) -> Result<()> {
    if project_root.join("Cargo.lock").is_file() {
        return Ok(());
    }

    log::info!("Cargo.lock not found; generating it");
    let output = executor
        .run("cargo", &["generate-lockfile"])
        .map_err(|err| match err {
            PackagerError::Io(_) | PackagerError::Timeout { .. } => PackagerError::BuildFailed {
                target: target.clone(),
                code: None,
                reason: format!("failed to run cargo generate-lockfile: {err}"),
            },
            other => other,
        })?;

    if output.status.success() {
        return Ok(());
    }
    Err(PackagerError::BuildFailed {
        target: target.clone(),
        code: output.status.code(),
        reason: format!("cargo generate-lockfile failed: {}", stderr_text(&output)),
    })
}

fn phase_failure(
    phase: Phase,
    target: &TargetTriple,
    code: Option<i32>,
    reason: String,
) -> PackagerError {
    let target = target.clone();
    match phase {
        Phase::Build => PackagerError::BuildFailed {
            target,
            code,
            reason,
        },
        Phase::Test => PackagerError::TestFailed {
            target,
            code,
            reason,
        },
    }
}
