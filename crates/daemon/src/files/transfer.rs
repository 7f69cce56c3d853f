//! Uploads, downloads, directory creation and deletion.
//!
//! Uploads are written to a temporary file in the destination directory and
//! renamed into place, so a failed upload never leaves a partial file under
//! the target name.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::Path;

use tracing::{debug, warn};

use super::canonical;
use super::error::FileError;
use super::resolver::{Operation, PathRejection, PathResolver, ResolvedPath};

/// Default upload limit (32 MiB).
pub const DEFAULT_MAX_UPLOAD_SIZE: u64 = 32 * 1024 * 1024;

/// An opened file ready to be streamed to a client.
#[derive(Debug)]
pub struct Download {
    pub file: File,
    pub path: ResolvedPath,
    /// Name offered to the client.
    pub file_name: String,
    pub size: u64,
}

/// File transfer handler.
#[derive(Debug, Clone)]
pub struct FileTransfer {
    resolver: PathResolver,
    max_upload_size: u64,
}

impl FileTransfer {
    pub fn new(resolver: PathResolver, max_upload_size: u64) -> Self {
        Self {
            resolver,
            max_upload_size,
        }
    }

    pub fn max_upload_size(&self) -> u64 {
        self.max_upload_size
    }

    fn root(&self) -> &Path {
        self.resolver.root()
    }

    /// Open the file named by `logical` for download.
    pub fn open_download(&self, logical: &str) -> Result<Download, FileError> {
        let path = self.resolver.resolve(logical, Operation::Download)?;
        let canonical = canonical::existing_target(self.root(), &path)?;

        let metadata =
            fs::metadata(&canonical).map_err(|e| FileError::from_io(e, path.relative()))?;
        if metadata.is_dir() {
            return Err(FileError::IsADirectory(path.relative()));
        }

        let file = File::open(&canonical).map_err(|e| FileError::from_io(e, path.relative()))?;
        let file_name = path.file_name().unwrap_or("download").to_string();

        Ok(Download {
            file,
            path,
            file_name,
            size: metadata.len(),
        })
    }

    /// Store `data` as `file_name` inside the directory `directory`.
    ///
    /// An existing file of the same name is replaced. The name is validated
    /// before anything is written.
    pub fn upload(
        &self,
        directory: &str,
        file_name: &str,
        data: &[u8],
    ) -> Result<ResolvedPath, FileError> {
        let destination = self
            .resolver
            .resolve_join(directory, file_name, Operation::Upload)?;

        let size = data.len() as u64;
        if size > self.max_upload_size {
            return Err(FileError::TooLarge {
                size,
                limit: self.max_upload_size,
            });
        }

        let parent = canonical::existing_parent(self.root(), &destination)?;
        if !parent.is_dir() {
            return Err(FileError::NotADirectory(directory.to_string()));
        }

        if let Ok(existing) = fs::symlink_metadata(destination.as_path()) {
            if existing.is_dir() {
                return Err(FileError::IsADirectory(destination.relative()));
            }
        }

        // Fixed length: the client's name may already be at NAME_MAX.
        let temp_path = parent.join(format!(".{}.upload", uuid::Uuid::new_v4()));
        if let Err(e) = write_new_file(&temp_path, data) {
            remove_temp_file(&temp_path);
            return Err(FileError::from_io(e, destination.relative()));
        }

        // Rename replaces a symlink at the destination instead of following it.
        if let Err(e) = fs::rename(&temp_path, destination.as_path()) {
            remove_temp_file(&temp_path);
            return Err(FileError::from_io(e, destination.relative()));
        }

        debug!(path = %destination.relative(), size, "upload stored");
        Ok(destination)
    }

    /// Create the directory `name` inside `directory`.
    ///
    /// Creating a directory that already exists succeeds. Only the final
    /// segment is created; the parent must exist.
    pub fn create_directory(&self, directory: &str, name: &str) -> Result<ResolvedPath, FileError> {
        let target = self.resolver.resolve_join(directory, name, Operation::Mkdir)?;
        canonical::existing_parent(self.root(), &target)?;

        match fs::create_dir(target.as_path()) {
            Ok(()) => Ok(target),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                match fs::symlink_metadata(target.as_path()) {
                    Ok(m) if m.is_dir() => Ok(target),
                    _ => Err(FileError::AlreadyExists(target.relative())),
                }
            }
            Err(e) => Err(FileError::from_io(e, target.relative())),
        }
    }

    /// Remove the file or directory tree named by `logical`.
    ///
    /// A symlink is removed itself, never its target. The root can never be
    /// removed.
    pub fn delete(&self, logical: &str) -> Result<ResolvedPath, FileError> {
        let target = self.resolver.resolve(logical, Operation::Delete)?;
        if target.is_root() {
            return Err(PathRejection::IsRootItself.into());
        }
        canonical::existing_parent(self.root(), &target)?;

        let metadata = fs::symlink_metadata(target.as_path())
            .map_err(|e| FileError::from_io(e, target.relative()))?;

        let result = if metadata.is_dir() {
            let canonical = fs::canonicalize(target.as_path())
                .map_err(|e| FileError::from_io(e, target.relative()))?;
            if canonical == self.root() {
                return Err(PathRejection::IsRootItself.into());
            }
            fs::remove_dir_all(target.as_path())
        } else {
            fs::remove_file(target.as_path())
        };

        result.map_err(|e| FileError::from_io(e, target.relative()))?;
        Ok(target)
    }
}

fn write_new_file(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
    file.write_all(data)?;
    file.sync_all()
}

fn remove_temp_file(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(path = %path.display(), error = %e, "failed to remove temporary upload file");
        }
    }
}
