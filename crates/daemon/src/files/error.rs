//! Errors raised by file operations.

use std::io;

use protocol::ErrorCode;
use thiserror::Error;

use super::resolver::PathRejection;

/// Errors that can occur while browsing or transferring files.
///
/// Paths carried by the variants are relative to the root, so the messages
/// are safe to show to clients.
#[derive(Debug, Error)]
pub enum FileError {
    /// The path was refused by the resolver or by the symlink check.
    #[error(transparent)]
    Rejected(#[from] PathRejection),

    /// The target does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A directory was expected.
    #[error("not a directory: {0}")]
    NotADirectory(String),

    /// A file was expected.
    #[error("is a directory: {0}")]
    IsADirectory(String),

    /// A non-directory entry already occupies the name.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// The operating system refused access.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// The upload exceeds the configured size limit.
    #[error("file too large: {size} bytes exceeds limit of {limit} bytes")]
    TooLarge { size: u64, limit: u64 },

    /// Any other I/O failure.
    #[error("IO error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
}

impl FileError {
    /// Classify an I/O error raised while operating on `path`.
    pub fn from_io(err: io::Error, path: impl Into<String>) -> Self {
        let path = path.into();
        match err.kind() {
            io::ErrorKind::NotFound => Self::NotFound(path),
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(path),
            io::ErrorKind::NotADirectory => Self::NotADirectory(path),
            io::ErrorKind::IsADirectory => Self::IsADirectory(path),
            io::ErrorKind::AlreadyExists => Self::AlreadyExists(path),
            _ => Self::Io { path, source: err },
        }
    }

    /// API error code for this failure.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Rejected(rejection) => rejection.code(),
            Self::NotFound(_) => ErrorCode::NotFound,
            Self::NotADirectory(_) | Self::IsADirectory(_) | Self::AlreadyExists(_) => {
                ErrorCode::Conflict
            }
            Self::PermissionDenied(_) => ErrorCode::PermissionDenied,
            Self::TooLarge { .. } => ErrorCode::PayloadTooLarge,
            Self::Io { .. } => ErrorCode::IoFailure,
        }
    }
}
