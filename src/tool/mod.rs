//! Cross-compilation tool provisioning.
//!
//! The pipeline only needs to know which program to invoke. [`ToolProvider`]
//! answers that, installing the tool first when necessary; tests substitute
//! a mock so no network or PATH lookup is involved.

pub mod download;
pub mod extraction;
pub mod install;

pub use install::{CrossInstaller, asset_url, default_install_dir, host_asset_triple};

use crate::error::Result;
use camino::Utf8PathBuf;

/// Program name of the default cross-compilation tool.
pub const DEFAULT_TOOL: &str = "cross";

/// Release of the default tool that is downloaded when it is missing.
pub const DEFAULT_TOOL_VERSION: &str = "v0.2.5";

/// Capability for making the cross-compilation tool available.
#[cfg_attr(test, mockall::automock)]
pub trait ToolProvider {
    /// Ensure the tool can be run and return the program to invoke.
    ///
    /// The result is either a bare program name found on `PATH` or an
    /// absolute path to an installed executable.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::PackagerError::ToolUnavailable`] when the tool
    /// is absent and cannot be installed.
    fn ensure_installed(&self) -> Result<String>;
}

/// Settings describing which tool to use and how to install it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolSettings {
    /// Program to invoke, for example `cross`.
    pub program: String,
    /// Release tag downloaded when the program is missing.
    pub version: String,
    /// Directory the downloaded executable is installed into.
    pub install_dir: Option<Utf8PathBuf>,
    /// Fail instead of downloading a missing tool.
    pub skip_install: bool,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            program: DEFAULT_TOOL.to_owned(),
            version: DEFAULT_TOOL_VERSION.to_owned(),
            install_dir: None,
            skip_install: false,
        }
    }
}
