//! Release archive naming, packaging, and digests.
//!
//! # Sub-modules
//!
//! - [`digest`]: SHA-256 digest newtype (`Sha256Digest`).
//! - [`naming`]: archive file name policy (`ArchiveName`).
//! - [`packaging`]: `.tar.gz` creation from a staging directory.

pub mod digest;
pub mod naming;
pub mod packaging;

pub use digest::{Sha256Digest, compute_sha256};
pub use naming::ArchiveName;
pub use packaging::{ReleaseArchive, list_archive_members, package_archive};
