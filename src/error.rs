//! Error types for the release packager.
//!
//! Every pipeline stage reports failure through a dedicated variant of
//! [`PackagerError`], so the binary can name the stage that failed and pick
//! the process exit code. All variants are fatal; a failed run is re-invoked
//! from scratch.

use crate::target::TargetTriple;
use camino::Utf8PathBuf;
use std::fmt;
use thiserror::Error;

/// Errors that can occur while producing a release archive.
#[derive(Debug, Error)]
pub enum PackagerError {
    /// No target was supplied and the host OS has no default target.
    #[error("unsupported platform {os}; pass an explicit target triple")]
    UnsupportedPlatform {
        /// Host OS name as reported by `uname -s`.
        os: String,
    },

    /// An explicitly supplied target triple is malformed.
    #[error("invalid target triple \"{value}\": {reason}")]
    InvalidTarget {
        /// The rejected input.
        value: String,
        /// Description of the validation failure.
        reason: String,
    },

    /// The release version could not be derived from version control.
    #[error("version resolution failed: {reason}")]
    VersionResolution {
        /// Description of why resolution failed.
        reason: String,
    },

    /// The cross-compilation tool is missing and could not be installed.
    #[error("{tool} is unavailable: {reason}")]
    ToolUnavailable {
        /// Name of the tool.
        tool: String,
        /// Description of the bootstrap failure.
        reason: String,
    },

    /// The release build failed.
    #[error("build failed for {target} ({}): {reason}", describe_exit(.code))]
    BuildFailed {
        /// Target that was being built.
        target: TargetTriple,
        /// Exit code of the tool, if it exited normally.
        code: Option<i32>,
        /// Captured diagnostics, if any.
        reason: String,
    },

    /// The test suite failed under the target's runner.
    #[error("tests failed for {target} ({}): {reason}", describe_exit(.code))]
    TestFailed {
        /// Target whose tests were run.
        target: TargetTriple,
        /// Exit code of the tool, if it exited normally.
        code: Option<i32>,
        /// Captured diagnostics, if any.
        reason: String,
    },

    /// A required release artifact does not exist.
    #[error("missing artifact {path}")]
    MissingArtifact {
        /// Expected source path of the artifact.
        path: Utf8PathBuf,
    },

    /// The release archive could not be written.
    #[error("failed to write archive {path}")]
    ArchiveWrite {
        /// Destination path of the archive.
        path: Utf8PathBuf,
        /// The underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// Configuration from flags, environment, or `release.toml` is invalid.
    #[error("invalid configuration: {reason}")]
    InvalidConfig {
        /// Description of the problem.
        reason: String,
    },

    /// A subprocess exceeded the configured timeout and was killed.
    #[error("{program} timed out after {seconds} seconds")]
    Timeout {
        /// The program that was killed.
        program: String,
        /// The timeout that elapsed.
        seconds: u64,
    },

    /// The release report could not be written to stdout.
    #[error("failed to write the release report: {source}")]
    ReportWrite {
        /// The underlying I/O or serialisation failure.
        #[source]
        source: std::io::Error,
    },

    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Test stub received an unexpected or mismatched command invocation.
    #[cfg(any(test, feature = "test-support"))]
    #[error("stub mismatch: {message}")]
    StubMismatch {
        /// Description of what was expected versus what was received.
        message: String,
    },
}

/// Pipeline stage a [`PackagerError`] is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Loading flags, environment, and `release.toml`.
    Configuration,
    /// Resolving the target triple.
    Target,
    /// Resolving the release version.
    Version,
    /// Installing or locating the cross-compilation tool.
    Bootstrap,
    /// Compiling the release binary.
    Build,
    /// Running the test suite.
    Test,
    /// Copying artifacts into the staging directory.
    Staging,
    /// Writing the compressed archive.
    Packaging,
    /// Printing the release report.
    Report,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Configuration => "configuration",
            Self::Target => "target resolution",
            Self::Version => "version resolution",
            Self::Bootstrap => "tool bootstrap",
            Self::Build => "build",
            Self::Test => "test",
            Self::Staging => "staging",
            Self::Packaging => "packaging",
            Self::Report => "report",
        };
        f.write_str(name)
    }
}

impl PackagerError {
    /// Return the pipeline stage this error belongs to.
    ///
    /// Version, build, and test code fold subprocess timeouts and spawn
    /// failures into their own variants, so a bare `Timeout` or `Io` only
    /// reaches this point from the build tool or from staging.
    #[must_use]
    pub fn stage(&self) -> Stage {
        match self {
            Self::UnsupportedPlatform { .. } | Self::InvalidTarget { .. } => Stage::Target,
            Self::VersionResolution { .. } => Stage::Version,
            Self::ToolUnavailable { .. } => Stage::Bootstrap,
            Self::BuildFailed { .. } | Self::Timeout { .. } => Stage::Build,
            Self::TestFailed { .. } => Stage::Test,
            Self::MissingArtifact { .. } | Self::Io(_) => Stage::Staging,
            Self::ArchiveWrite { .. } => Stage::Packaging,
            Self::ReportWrite { .. } => Stage::Report,
            Self::InvalidConfig { .. } => Stage::Configuration,
            #[cfg(any(test, feature = "test-support"))]
            Self::StubMismatch { .. } => Stage::Configuration,
        }
    }

    /// Return the process exit code for this error.
    ///
    /// Build and test failures propagate the tool's own non-zero exit code;
    /// every other failure, including a tool killed by a signal, maps to 1.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::BuildFailed { code: Some(code), .. } | Self::TestFailed { code: Some(code), .. }
                if *code != 0 =>
            {
                *code
            }
            _ => 1,
        }
    }
}

/// Renders an optional exit code for error messages.
struct ExitDescription(Option<i32>);

fn describe_exit(code: &Option<i32>) -> ExitDescription {
    ExitDescription(*code)
}

impl fmt::Display for ExitDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(code) => write!(f, "exit code {code}"),
            None => f.write_str("terminated by signal"),
        }
    }
}

/// Result type alias using [`PackagerError`].
pub type Result<T> = std::result::Result<T, PackagerError>;
