//! File operations confined to a single root directory.
//!
//! - [`resolver`]: maps untrusted logical paths to absolute paths under the root
//! - [`browser`]: directory listing
//! - [`transfer`]: upload, download, mkdir and delete
//!
//! # Security
//!
//! Every operation resolves its path through [`PathResolver`] first.
//! Operations that touch existing entries also canonicalize them, so a
//! symlink under the root cannot be used to reach outside it.

pub mod browser;
pub mod canonical;
pub mod error;
pub mod resolver;
pub mod transfer;

pub use browser::{DirectoryBrowser, DirectoryEntry, DirectoryListing};
pub use error::FileError;
pub use resolver::{Operation, PathRejection, PathResolver, ResolvedPath};
pub use transfer::{Download, FileTransfer, DEFAULT_MAX_UPLOAD_SIZE};
