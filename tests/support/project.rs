use camino::{Utf8Path, Utf8PathBuf};
use kak_lsp_release::config::ReleaseConfig;
use kak_lsp_release::error::{PackagerError, Result};
use kak_lsp_release::tool::ToolProvider;
use kak_lsp_release::version::{ReleaseVersion, VersionSource};
use std::convert::Infallible;
use std::str::FromStr;
use tempfile::TempDir;

/// Files a kak-lsp checkout ships next to the binary.
pub const SHIPPED_FILES: [&str; 5] = ["kak-lsp.toml", "README.asciidoc", "COPYING", "MIT", "UNLICENSE"];

/// A temporary checkout laid out the way a finished build leaves it.
pub struct ReleaseProject {
    _temp: TempDir,
    root: Utf8PathBuf,
}

impl ReleaseProject {
    /// Create a checkout with a lockfile and every shipped file.
    pub fn new() -> Self {
        let temp = TempDir::new().expect("temp dir");
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).expect("utf8 temp dir");
        for dir in ["src", "dist", "staging"] {
            std::fs::create_dir_all(root.join(dir)).expect("create project dir");
        }
        std::fs::write(root.join("src/Cargo.lock"), "").expect("write lockfile");
        for name in SHIPPED_FILES {
            std::fs::write(root.join("src").join(name), name).expect("write shipped file");
        }
        Self { _temp: temp, root }
    }

    /// Place a release binary where a build for `target` would leave it.
    pub fn add_binary(&self, target: &str) {
        let release = self.source_dir().join("target").join(target).join("release");
        std::fs::create_dir_all(&release).expect("create release dir");
        std::fs::write(release.join("kak-lsp"), b"\x7fELF").expect("write binary");
    }

    /// Delete one shipped file.
    pub fn remove(&self, name: &str) {
        std::fs::remove_file(self.source_dir().join(name)).expect("remove shipped file");
    }

    /// Configuration pointing every path into this checkout.
    pub fn config(&self, target: Option<&str>, version: &str) -> ReleaseConfig {
        let mut config = ReleaseConfig::for_project(&self.source_dir());
        config.target = target.map(str::to_owned);
        config.version =
            VersionSource::Explicit(ReleaseVersion::try_from(version).expect("valid version"));
        config.output_dir = self.output_dir();
        config.staging_parent = Some(self.root.join("staging"));
        config
    }

    /// Root of the kak-lsp checkout.
    pub fn source_dir(&self) -> Utf8PathBuf {
        self.root.join("src")
    }

    /// Directory archives are written to.
    pub fn output_dir(&self) -> Utf8PathBuf {
        self.root.join("dist")
    }

    /// File names in the output directory.
    pub fn outputs(&self) -> Vec<String> {
        names_in(&self.output_dir())
    }

    /// Entries left under the staging parent.
    pub fn staging_leftovers(&self) -> Vec<String> {
        names_in(&self.root.join("staging"))
    }
}

fn names_in(dir: &Utf8Path) -> Vec<String> {
    dir.read_dir_utf8()
        .expect("read dir")
        .map(|entry| entry.expect("dir entry").file_name().to_owned())
        .collect()
}

/// Tool provider that reports a fixed outcome.
pub struct FixedTool {
    available: bool,
}

impl FixedTool {
    /// A provider that always finds `cross`.
    pub fn available() -> Self {
        Self { available: true }
    }

    /// A provider whose bootstrap always fails.
    pub fn missing() -> Self {
        Self { available: false }
    }
}

impl ToolProvider for FixedTool {
    fn ensure_installed(&self) -> Result<String> {
        if self.available {
            Ok("cross".to_owned())
        } else {
            Err(PackagerError::ToolUnavailable {
                tool: "cross".to_owned(),
                reason: "download disabled".to_owned(),
            })
        }
    }
}

/// Quoted or bare string supplied by a step.
#[derive(Clone, Debug)]
pub struct StepText {
    raw: String,
}

impl FromStr for StepText {
    type Err = Infallible;

    fn from_str(input: &str) -> std::result::Result<Self, Self::Err> {
        let raw = input
            .trim()
            .trim_matches(|candidate| matches!(candidate, '"' | '\''))
            .to_owned();

        Ok(Self { raw })
    }
}

impl StepText {
    /// Consumes the step value, yielding the parsed string.
    pub fn into_inner(self) -> String {
        self.raw
    }
}
