//! Bootstrap of the `cross` executable.
//!
//! Looks for a working tool on `PATH`, then in the install directory, and
//! only then downloads the pinned release for the host.

use super::download::ToolDownloader;
use super::extraction::extract_executable;
use super::{DEFAULT_TOOL, ToolProvider, ToolSettings};
use crate::error::{PackagerError, Result};
use crate::executor::{CommandExecutor, command_succeeds};
use camino::{Utf8Path, Utf8PathBuf};

/// Release asset triple for each supported `(arch, os)` host pair.
///
/// Apple Silicon hosts use the x86_64 build under Rosetta; no native asset
/// is published for the pinned release.
const HOST_ASSETS: &[((&str, &str), &str)] = &[
    (("x86_64", "linux"), "x86_64-unknown-linux-musl"),
    (("x86_64", "macos"), "x86_64-apple-darwin"),
    (("aarch64", "macos"), "x86_64-apple-darwin"),
    (("x86_64", "windows"), "x86_64-pc-windows-msvc"),
];

/// Return the release asset triple for a host, if one is published.
///
/// `arch` and `os` use the `std::env::consts` spellings.
///
/// # Examples
///
/// ```
/// use kak_lsp_release::tool::host_asset_triple;
///
/// assert_eq!(host_asset_triple("x86_64", "linux"), Some("x86_64-unknown-linux-musl"));
/// assert_eq!(host_asset_triple("riscv64", "linux"), None);
/// ```
#[must_use]
pub fn host_asset_triple(arch: &str, os: &str) -> Option<&'static str> {
    HOST_ASSETS
        .iter()
        .find(|((a, o), _)| *a == arch && *o == os)
        .map(|(_, asset)| *asset)
}

/// Construct the GitHub release URL of the tool archive.
///
/// # Examples
///
/// ```
/// use kak_lsp_release::tool::asset_url;
///
/// assert_eq!(
///     asset_url("v0.2.5", "x86_64-apple-darwin"),
///     "https://github.com/cross-rs/cross/releases/download/v0.2.5/cross-x86_64-apple-darwin.tar.gz",
/// );
/// ```
#[must_use]
pub fn asset_url(version: &str, asset_triple: &str) -> String {
    format!(
        "https://github.com/cross-rs/cross/releases/download/{version}/cross-{asset_triple}.tar.gz"
    )
}

/// Return the directory downloaded tools are installed into.
///
/// Uses `$CARGO_HOME/bin` when `cargo_home` is given, otherwise
/// `~/.cargo/bin`. Returns `None` when no home directory can be determined
/// or the path is not UTF-8.
#[must_use]
pub fn default_install_dir(cargo_home: Option<&Utf8Path>) -> Option<Utf8PathBuf> {
    if let Some(home) = cargo_home {
        return Some(home.join("bin"));
    }
    let base = directories_next::BaseDirs::new()?;
    let bin = base.home_dir().join(".cargo").join("bin");
    Utf8PathBuf::from_path_buf(bin).ok()
}

/// Production [`ToolProvider`] that installs `cross` on demand.
pub struct CrossInstaller<'a> {
    executor: &'a dyn CommandExecutor,
    downloader: &'a dyn ToolDownloader,
    settings: &'a ToolSettings,
    arch: &'a str,
    os: &'a str,
}

impl<'a> CrossInstaller<'a> {
    /// Create an installer for the current host.
    #[must_use]
    pub fn new(
        executor: &'a dyn CommandExecutor,
        downloader: &'a dyn ToolDownloader,
        settings: &'a ToolSettings,
    ) -> Self {
        Self {
            executor,
            downloader,
            settings,
            arch: std::env::consts::ARCH,
            os: std::env::consts::OS,
        }
    }

    /// Pretend to run on a different host when choosing the release asset.
    #[must_use]
    pub fn with_host(mut self, arch: &'a str, os: &'a str) -> Self {
        self.arch = arch;
        self.os = os;
        self
    }

    fn unavailable(&self, reason: impl Into<String>) -> PackagerError {
        PackagerError::ToolUnavailable {
            tool: self.settings.program.clone(),
            reason: reason.into(),
        }
    }

    fn installed_path(&self, dir: &Utf8Path) -> Utf8PathBuf {
        dir.join(format!(
            "{}{}",
            self.settings.program,
            std::env::consts::EXE_SUFFIX
        ))
    }

    fn install(&self, dir: &Utf8Path) -> Result<Utf8PathBuf> {
        let asset = host_asset_triple(self.arch, self.os).ok_or_else(|| {
            self.unavailable(format!(
                "no prebuilt release for {}-{}; install it manually",
                self.arch, self.os
            ))
        })?;
        let url = asset_url(&self.settings.version, asset);

        let download_dir = tempfile::Builder::new()
            .prefix("kak-lsp-release-tool-")
            .tempdir()
            .map_err(|e| self.unavailable(format!("failed to create download directory: {e}")))?;
        let archive = download_dir.path().join(format!("cross-{asset}.tar.gz"));

        self.downloader
            .download(&url, &archive)
            .map_err(|e| self.unavailable(e.to_string()))?;

        let binary = format!("{}{}", DEFAULT_TOOL, std::env::consts::EXE_SUFFIX);
        extract_executable(&archive, &binary, dir.as_std_path())
            .map_err(|e| self.unavailable(format!("failed to unpack {url}: {e}")))?;

        Ok(self.installed_path(dir))
    }
}

impl ToolProvider for CrossInstaller<'_> {
    fn ensure_installed(&self) -> Result<String> {
        let program = &self.settings.program;
        if command_succeeds(self.executor, program, &["--version"]) {
            log::debug!("using {program} from PATH");
            return Ok(program.clone());
        }

        let install_dir = self.settings.install_dir.as_deref();
        if let Some(dir) = install_dir {
            let installed = self.installed_path(dir);
            if command_succeeds(self.executor, installed.as_str(), &["--version"]) {
                log::debug!("using previously installed {installed}");
                return Ok(installed.into_string());
            }
        }

        if self.settings.skip_install {
            return Err(self.unavailable("not found and installation is disabled"));
        }
        if program != DEFAULT_TOOL {
            return Err(self.unavailable(format!(
                "not found; only {DEFAULT_TOOL} can be installed automatically"
            )));
        }
        let dir = install_dir.ok_or_else(|| {
            self.unavailable("not found and no install directory is known; set CARGO_HOME")
        })?;

        log::info!("installing {program} {} into {dir}", self.settings.version);
        let installed = self.install(dir)?;
        if !command_succeeds(self.executor, installed.as_str(), &["--version"]) {
            return Err(self.unavailable(format!(
                "installed {installed} but `{installed} --version` failed"
            )));
        }
        Ok(installed.into_string())
    }
}
