//! Release packager for kak-lsp.
//!
//! This crate cross-compiles the language server for one target triple,
//! runs its test suite, and packs the binary with its default configuration,
//! readme, and license files into `{name}-{version}-{target}.tar.gz`.
//!
//! # Modules
//!
//! - [`cli`]: command-line definition and configuration precedence
//! - [`config`]: `release.toml`, CI environment, and the resolved configuration
//! - [`target`]: host detection and target triple resolution
//! - [`version`]: release version from a tag or `git describe`
//! - [`tool`]: locating or installing the cross-compilation tool
//! - [`builder`]: build and test invocations
//! - [`stager`]: the scratch directory holding files to package
//! - [`archive`]: archive naming, packaging, and digests
//! - [`pipeline`]: the end-to-end release flow
//! - [`output`]: progress lines, dry-run text, and the JSON report
//! - [`executor`]: subprocess execution behind a trait
//! - [`error`]: error types and exit codes

pub mod archive;
pub mod builder;
pub mod cli;
pub mod config;
pub mod error;
pub mod executor;
pub mod output;
pub mod pipeline;
pub mod stager;
pub mod target;
pub mod tool;
pub mod version;

#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;
