//! Release configuration.
//!
//! [`ReleaseConfig`] is the single explicit structure the pipeline runs
//! from. It is assembled at the process boundary from command-line flags,
//! the CI environment ([`ReleaseEnv`]), an optional `release.toml` in the
//! project root ([`FileConfig`]), and built-in defaults, in that order of
//! precedence.

use crate::error::{PackagerError, Result};
use crate::tool::ToolSettings;
use crate::version::VersionSource;
use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;
use std::time::Duration;

/// Default archive name.
pub const DEFAULT_NAME: &str = "kak-lsp";

/// Default file stem of the release binary.
pub const DEFAULT_BINARY: &str = "kak-lsp";

/// Name of the optional per-project configuration file.
pub const FILE_CONFIG_NAME: &str = "release.toml";

/// Environment variable holding the target triple in CI mode.
pub const TARGET_VAR: &str = "TARGET";
/// Environment variable holding the crate name in CI mode.
pub const CRATE_NAME_VAR: &str = "CRATE_NAME";
/// Environment variables holding the release tag, in lookup order.
pub const TAG_VARS: [&str; 2] = ["RELEASE_TAG", "TRAVIS_TAG"];

/// The non-binary files shipped in every release, relative to the project
/// root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactManifest {
    /// Default configuration file.
    pub config_file: Utf8PathBuf,
    /// Readme document.
    pub readme: Utf8PathBuf,
    /// License files, staged in this order.
    pub license_files: Vec<Utf8PathBuf>,
}

impl Default for ArtifactManifest {
    fn default() -> Self {
        Self {
            config_file: Utf8PathBuf::from("kak-lsp.toml"),
            readme: Utf8PathBuf::from("README.asciidoc"),
            license_files: ["COPYING", "MIT", "UNLICENSE"]
                .into_iter()
                .map(Utf8PathBuf::from)
                .collect(),
        }
    }
}

/// Contents of `release.toml`. Every key is optional.
///
/// ```toml
/// name = "kak-lsp"
/// binary = "kak-lsp"
/// config_file = "kak-lsp.toml"
/// readme = "README.asciidoc"
/// license_files = ["COPYING", "MIT", "UNLICENSE"]
/// tool = "cross"
/// tool_version = "v0.2.5"
/// ```
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    /// Archive name.
    pub name: Option<String>,
    /// File stem of the binary cargo builds.
    pub binary: Option<String>,
    /// Default configuration file to ship.
    pub config_file: Option<Utf8PathBuf>,
    /// Readme to ship.
    pub readme: Option<Utf8PathBuf>,
    /// License files to ship.
    pub license_files: Option<Vec<Utf8PathBuf>>,
    /// Cross-compilation tool to invoke.
    pub tool: Option<String>,
    /// Tool release to download when it is missing.
    pub tool_version: Option<String>,
}

impl FileConfig {
    /// Parse `release.toml` contents. `origin` is only used in messages.
    ///
    /// # Errors
    ///
    /// Returns [`PackagerError::InvalidConfig`] on malformed TOML or unknown
    /// keys.
    ///
    /// # Examples
    ///
    /// ```
    /// use camino::Utf8Path;
    /// use kak_lsp_release::config::FileConfig;
    ///
    /// let config = FileConfig::parse("name = \"kak-lsp\"\n", Utf8Path::new("release.toml"))
    ///     .expect("valid config");
    /// assert_eq!(config.name.as_deref(), Some("kak-lsp"));
    /// ```
    pub fn parse(text: &str, origin: &Utf8Path) -> Result<Self> {
        toml::from_str(text).map_err(|err| PackagerError::InvalidConfig {
            reason: format!("{origin}: {err}"),
        })
    }

    /// Load `release.toml` from `project_root`, or defaults if it is absent.
    ///
    /// # Errors
    ///
    /// Returns [`PackagerError::InvalidConfig`] if the file exists but cannot
    /// be read or parsed.
    pub fn load(project_root: &Utf8Path) -> Result<Self> {
        let path = project_root.join(FILE_CONFIG_NAME);
        match std::fs::read_to_string(&path) {
            Ok(text) => {
                log::debug!("loaded {path}");
                Self::parse(&text, &path)
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(PackagerError::InvalidConfig {
                reason: format!("failed to read {path}: {err}"),
            }),
        }
    }

    /// Apply file overrides on top of the default artifact manifest.
    #[must_use]
    pub fn artifact_manifest(&self) -> ArtifactManifest {
        let defaults = ArtifactManifest::default();
        ArtifactManifest {
            config_file: self.config_file.clone().unwrap_or(defaults.config_file),
            readme: self.readme.clone().unwrap_or(defaults.readme),
            license_files: self.license_files.clone().unwrap_or(defaults.license_files),
        }
    }
}

/// Release parameters supplied by a CI job through the environment.
///
/// Empty values count as unset; CI services commonly export an empty tag
/// on untagged builds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReleaseEnv {
    /// Target triple (`TARGET`).
    pub target: Option<String>,
    /// Project name (`CRATE_NAME`).
    pub crate_name: Option<String>,
    /// Release tag (`RELEASE_TAG`, falling back to `TRAVIS_TAG`).
    pub tag: Option<String>,
}

impl ReleaseEnv {
    /// Build from an arbitrary variable lookup.
    ///
    /// # Examples
    ///
    /// ```
    /// use kak_lsp_release::config::ReleaseEnv;
    ///
    /// let env = ReleaseEnv::from_lookup(|key| match key {
    ///     "TARGET" => Some("x86_64-apple-darwin".to_owned()),
    ///     "TRAVIS_TAG" => Some("v12.1.0".to_owned()),
    ///     _ => None,
    /// });
    /// assert_eq!(env.target.as_deref(), Some("x86_64-apple-darwin"));
    /// assert_eq!(env.tag.as_deref(), Some("v12.1.0"));
    /// ```
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        Self {
            target: get(TARGET_VAR),
            crate_name: get(CRATE_NAME_VAR),
            tag: TAG_VARS.into_iter().find_map(|key| get(key)),
        }
    }

    /// Read the variables from the current process environment.
    #[must_use]
    pub fn from_process() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }
}

/// Everything the pipeline needs to produce one release archive.
#[derive(Debug, Clone)]
pub struct ReleaseConfig {
    /// Archive name; the `{name}` in `{name}-{version}-{target}.tar.gz`.
    pub name: String,
    /// File stem of the binary cargo leaves in `<target>/release/`.
    pub binary_name: String,
    /// Explicit target triple; `None` derives it from the host OS.
    pub target: Option<String>,
    /// Where the version label comes from.
    pub version: VersionSource,
    /// Root of the project being released.
    pub project_root: Utf8PathBuf,
    /// Directory the archive is written into.
    pub output_dir: Utf8PathBuf,
    /// Cargo's target directory for the project.
    pub cargo_target_dir: Utf8PathBuf,
    /// Non-binary files to ship.
    pub artifacts: ArtifactManifest,
    /// Cross-compilation tool settings.
    pub tool: ToolSettings,
    /// Skip `<tool> test`.
    pub skip_tests: bool,
    /// Number of `-v` flags forwarded to the tool.
    pub verbosity: u8,
    /// Upper bound on every subprocess.
    pub timeout: Option<Duration>,
    /// Directory staging directories are created in; `None` uses the system
    /// temp directory.
    pub staging_parent: Option<Utf8PathBuf>,
}

impl ReleaseConfig {
    /// Configuration for releasing the project at `project_root` with every
    /// default applied.
    #[must_use]
    pub fn for_project(project_root: &Utf8Path) -> Self {
        Self {
            name: DEFAULT_NAME.to_owned(),
            binary_name: DEFAULT_BINARY.to_owned(),
            target: None,
            version: VersionSource::GitDescribe,
            project_root: project_root.to_owned(),
            output_dir: project_root.to_owned(),
            cargo_target_dir: project_root.join("target"),
            artifacts: ArtifactManifest::default(),
            tool: ToolSettings::default(),
            skip_tests: false,
            verbosity: 0,
            timeout: None,
            staging_parent: None,
        }
    }

    /// Check values that would otherwise fail late or produce a bad archive
    /// name.
    ///
    /// # Errors
    ///
    /// Returns [`PackagerError::InvalidConfig`] describing the first problem.
    pub fn validate(&self) -> Result<()> {
        validate_name(&self.name)?;
        validate_name(&self.binary_name)?;
        if self.tool.program.trim().is_empty() {
            return Err(PackagerError::InvalidConfig {
                reason: "tool program is empty".to_owned(),
            });
        }
        if self.timeout.is_some_and(|t| t.is_zero()) {
            return Err(PackagerError::InvalidConfig {
                reason: "timeout must be at least one second".to_owned(),
            });
        }
        Ok(())
    }
}

/// Check that `name` can be used as a binary and archive name.
///
/// # Errors
///
/// Returns [`PackagerError::InvalidConfig`] for empty names and names with
/// whitespace or path separators.
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(PackagerError::InvalidConfig {
            reason: "name is empty".to_owned(),
        });
    }
    if name
        .chars()
        .any(|c| c.is_whitespace() || matches!(c, '/' | '\\'))
        || name == "."
        || name == ".."
    {
        return Err(PackagerError::InvalidConfig {
            reason: format!("name \"{name}\" must be a plain file name"),
        });
    }
    Ok(())
}
