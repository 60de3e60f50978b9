//! Shared test support utilities for behaviour-driven suites.
//!
//! Exposes the `project` helpers (for example `ReleaseProject`) that lay out a
//! throwaway kak-lsp checkout with a prebuilt binary, plus a tool provider
//! that never touches the network.
pub mod project;
