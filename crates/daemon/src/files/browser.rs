//! Directory listing inside the confined root.

use std::cmp::Ordering;
use std::fs;
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use protocol::{DirectoryResponse, FileEntry};
use tracing::debug;

use super::canonical;
use super::error::FileError;
use super::resolver::{Operation, PathResolver, ResolvedPath};

/// A directory entry with metadata.
#[derive(Debug, Clone)]
pub struct DirectoryEntry {
    /// Entry name (not full path).
    pub name: String,
    /// Size in bytes as reported by the filesystem.
    pub size: u64,
    /// Last modified timestamp.
    pub modified: SystemTime,
    /// Whether the entry is a directory, after following symlinks.
    pub is_dir: bool,
}

impl DirectoryEntry {
    /// Convert to protocol FileEntry.
    pub fn to_protocol(&self) -> FileEntry {
        FileEntry {
            name: self.name.clone(),
            size: self.size,
            mod_time: DateTime::<Utc>::from(self.modified),
            is_dir: self.is_dir,
        }
    }
}

/// Result of listing one directory.
#[derive(Debug, Clone)]
pub struct DirectoryListing {
    /// The listed directory.
    pub directory: ResolvedPath,
    /// Its immediate children, directories first.
    pub entries: Vec<DirectoryEntry>,
}

impl DirectoryListing {
    pub fn to_protocol(&self) -> DirectoryResponse {
        DirectoryResponse {
            path: self.directory.relative(),
            files: self.entries.iter().map(DirectoryEntry::to_protocol).collect(),
        }
    }
}

/// Lists directories below the root.
#[derive(Debug, Clone)]
pub struct DirectoryBrowser {
    resolver: PathResolver,
    include_hidden: bool,
}

impl DirectoryBrowser {
    pub fn new(resolver: PathResolver) -> Self {
        Self {
            resolver,
            include_hidden: true,
        }
    }

    /// Set whether entries whose name starts with '.' are listed.
    pub fn include_hidden(mut self, include: bool) -> Self {
        self.include_hidden = include;
        self
    }

    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    /// List the immediate children of the directory named by `logical`.
    ///
    /// Entries whose metadata cannot be read, such as dangling symlinks, are
    /// skipped.
    pub fn list_directory(&self, logical: &str) -> Result<DirectoryListing, FileError> {
        let directory = self.resolver.resolve(logical, Operation::List)?;
        let canonical = canonical::existing_target(self.resolver.root(), &directory)?;

        let metadata =
            fs::metadata(&canonical).map_err(|e| FileError::from_io(e, directory.relative()))?;
        if !metadata.is_dir() {
            return Err(FileError::NotADirectory(directory.relative()));
        }

        let read_dir =
            fs::read_dir(&canonical).map_err(|e| FileError::from_io(e, directory.relative()))?;

        let mut entries = Vec::new();
        for entry_result in read_dir {
            let entry = match entry_result {
                Ok(e) => e,
                Err(_) => continue,
            };

            let name = entry.file_name().to_string_lossy().to_string();
            if !self.include_hidden && name.starts_with('.') {
                continue;
            }

            // Follows symlinks so linked directories list as directories.
            let metadata = match fs::metadata(entry.path()) {
                Ok(m) => m,
                Err(e) => {
                    debug!(entry = %name, error = %e, "skipping unreadable entry");
                    continue;
                }
            };

            entries.push(DirectoryEntry {
                name,
                size: metadata.len(),
                modified: metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH),
                is_dir: metadata.is_dir(),
            });
        }

        entries.sort_by(compare_entries);

        Ok(DirectoryListing { directory, entries })
    }
}

/// Directories first, then case-insensitive by name.
fn compare_entries(a: &DirectoryEntry, b: &DirectoryEntry) -> Ordering {
    match (a.is_dir, b.is_dir) {
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        _ => a
            .name
            .to_lowercase()
            .cmp(&b.name.to_lowercase())
            .then_with(|| a.name.cmp(&b.name)),
    }
}
