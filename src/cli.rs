//! CLI argument definitions for the release packager.
//!
//! Besides the clap definition this module owns the merge of flags, the CI
//! environment, and `release.toml` into a [`ReleaseConfig`]. Process state is
//! passed in through [`ProcessContext`] so the merge is testable.

use crate::config::{DEFAULT_BINARY, DEFAULT_NAME, FileConfig, ReleaseConfig, ReleaseEnv};
use crate::error::{PackagerError, Result};
use crate::tool::{DEFAULT_TOOL, DEFAULT_TOOL_VERSION, ToolSettings, default_install_dir};
use crate::version::{ReleaseVersion, VersionSource};
use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;
use std::time::Duration;

/// Cross-compile, test, and package a kak-lsp release archive.
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "kak-lsp-release")]
#[command(version, about)]
#[command(long_about = concat!(
    "Cross-compile, test, and package a kak-lsp release archive.\n\n",
    "Builds the release binary for one target triple with `cross`, runs the ",
    "test suite under the target's runner, and packs the binary, default ",
    "config, readme, and license files into ",
    "{name}-{version}-{target}.tar.gz.\n\n",
    "Without a TARGET the triple is derived from the host OS. The version is ",
    "taken from `git describe --tags` unless --tag (or a CI tag variable with ",
    "--from-env) supplies it.",
))]
#[command(after_help = concat!(
    "ENVIRONMENT (with --from-env):\n",
    "  TARGET                     target triple\n",
    "  CRATE_NAME                 archive name\n",
    "  RELEASE_TAG, TRAVIS_TAG    release version\n\n",
    "EXAMPLES:\n",
    "  Package for the host platform:\n",
    "    $ kak-lsp-release\n\n",
    "  Package an explicit target and version:\n",
    "    $ kak-lsp-release x86_64-unknown-linux-musl --tag 1.2.0\n\n",
    "  Preview a CI release:\n",
    "    $ kak-lsp-release --from-env --dry-run",
))]
pub struct Cli {
    /// Target triple to build [default: derived from the host OS].
    #[arg(value_name = "TARGET")]
    pub target: Option<String>,

    /// Read TARGET, CRATE_NAME, and RELEASE_TAG or TRAVIS_TAG from the
    /// environment.
    #[arg(long)]
    pub from_env: bool,

    /// Archive name [default: kak-lsp].
    #[arg(long, value_name = "NAME")]
    pub name: Option<String>,

    /// File stem of the built binary [default: kak-lsp].
    #[arg(long, value_name = "NAME")]
    pub binary: Option<String>,

    /// Release version; skips `git describe`.
    #[arg(long, value_name = "VERSION")]
    pub tag: Option<String>,

    /// Project root [default: current directory].
    #[arg(short = 'C', long, value_name = "DIR")]
    pub project_root: Option<Utf8PathBuf>,

    /// Directory the archive is written to [default: current directory].
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<Utf8PathBuf>,

    /// Cross-compilation tool to invoke [default: cross].
    #[arg(long, value_name = "PROGRAM")]
    pub tool: Option<String>,

    /// Never download the tool when it is missing.
    #[arg(long)]
    pub skip_install: bool,

    /// Build only; do not run the test suite.
    #[arg(long)]
    pub skip_tests: bool,

    /// Kill any subprocess that runs longer than this many seconds.
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Show the release plan and exit without building.
    #[arg(long)]
    pub dry_run: bool,

    /// Print the release report as JSON on stdout.
    #[arg(long)]
    pub json: bool,

    /// Increase log and tool verbosity (repeatable: -v, -vv, -vvv).
    #[arg(
        short,
        long = "verbose",
        action = clap::ArgAction::Count,
        conflicts_with = "quiet"
    )]
    pub verbosity: u8,

    /// Suppress progress output (errors still shown).
    #[arg(short, long, conflicts_with = "verbosity")]
    pub quiet: bool,
}

/// Process state read once at the entry point.
#[derive(Debug, Clone, Default)]
pub struct ProcessContext {
    /// Current working directory.
    pub cwd: Utf8PathBuf,
    /// `CARGO_HOME`, if set.
    pub cargo_home: Option<Utf8PathBuf>,
    /// `CARGO_TARGET_DIR`, if set.
    pub cargo_target_dir: Option<Utf8PathBuf>,
    /// CI release variables.
    pub release_env: ReleaseEnv,
}

impl ProcessContext {
    /// Capture the current process state.
    ///
    /// # Errors
    ///
    /// Returns [`PackagerError::InvalidConfig`] if the working directory
    /// cannot be determined or is not valid UTF-8.
    pub fn from_process() -> Result<Self> {
        let cwd = std::env::current_dir().map_err(|err| PackagerError::InvalidConfig {
            reason: format!("cannot determine the working directory: {err}"),
        })?;
        let cwd = Utf8PathBuf::from_path_buf(cwd).map_err(|path| PackagerError::InvalidConfig {
            reason: format!("working directory {} is not UTF-8", path.display()),
        })?;
        let utf8_var = |key: &str| {
            std::env::var(key)
                .ok()
                .filter(|value| !value.is_empty())
                .map(Utf8PathBuf::from)
        };
        Ok(Self {
            cwd,
            cargo_home: utf8_var("CARGO_HOME"),
            cargo_target_dir: utf8_var("CARGO_TARGET_DIR"),
            release_env: ReleaseEnv::from_process(),
        })
    }
}

impl Cli {
    /// Merge flags, environment, `release.toml`, and defaults into the
    /// pipeline configuration.
    ///
    /// Precedence is flag, then environment (only with `--from-env`), then
    /// `release.toml`, then the built-in default.
    ///
    /// # Errors
    ///
    /// Returns [`PackagerError::InvalidConfig`] for an unreadable or invalid
    /// `release.toml` or invalid values, and
    /// [`PackagerError::VersionResolution`] for an unusable tag.
    pub fn resolve(&self, ctx: &ProcessContext) -> Result<ReleaseConfig> {
        let project_root = relative_to(&ctx.cwd, self.project_root.as_deref());
        let file = FileConfig::load(&project_root)?;
        let env = if self.from_env {
            ctx.release_env.clone()
        } else {
            ReleaseEnv::default()
        };

        let name = first_of([&self.name, &env.crate_name, &file.name])
            .unwrap_or_else(|| DEFAULT_NAME.to_owned());
        let binary_name =
            first_of([&self.binary, &file.binary]).unwrap_or_else(|| DEFAULT_BINARY.to_owned());
        let target = first_of([&self.target, &env.target]);
        let version = match first_of([&self.tag, &env.tag]) {
            Some(tag) => VersionSource::Explicit(ReleaseVersion::try_from(tag.as_str())?),
            None => VersionSource::GitDescribe,
        };

        let cargo_target_dir = match &ctx.cargo_target_dir {
            Some(dir) => project_root.join(dir),
            None => project_root.join("target"),
        };
        let tool = ToolSettings {
            program: first_of([&self.tool, &file.tool]).unwrap_or_else(|| DEFAULT_TOOL.to_owned()),
            version: file
                .tool_version
                .clone()
                .unwrap_or_else(|| DEFAULT_TOOL_VERSION.to_owned()),
            install_dir: default_install_dir(
                ctx.cargo_home.as_deref().map(|home| ctx.cwd.join(home)).as_deref(),
            ),
            skip_install: self.skip_install,
        };

        let config = ReleaseConfig {
            name,
            binary_name,
            target,
            version,
            output_dir: relative_to(&ctx.cwd, self.output_dir.as_deref()),
            cargo_target_dir,
            artifacts: file.artifact_manifest(),
            tool,
            skip_tests: self.skip_tests,
            verbosity: self.verbosity,
            timeout: self.timeout.map(Duration::from_secs),
            staging_parent: None,
            project_root,
        };
        config.validate()?;
        Ok(config)
    }
}

fn relative_to(base: &Utf8Path, path: Option<&Utf8Path>) -> Utf8PathBuf {
    match path {
        Some(path) => base.join(path),
        None => base.to_owned(),
    }
}

fn first_of<const N: usize>(candidates: [&Option<String>; N]) -> Option<String> {
    candidates.into_iter().find_map(Clone::clone)
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
