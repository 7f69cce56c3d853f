//! Symlink containment checks.
//!
//! The resolver only proves that a path is lexically inside the root. An
//! entry under the root may still be a symlink to somewhere else, so
//! operations that touch the disk canonicalize what they act on and check
//! it again.

use std::fs;
use std::path::{Path, PathBuf};

use super::error::FileError;
use super::resolver::{is_within, PathRejection, ResolvedPath};

/// Canonicalize an existing target and require it to lie inside `root`.
///
/// Follows symlinks, so a link pointing outside the root is refused.
pub fn existing_target(root: &Path, resolved: &ResolvedPath) -> Result<PathBuf, FileError> {
    let canonical = fs::canonicalize(resolved.as_path())
        .map_err(|e| FileError::from_io(e, resolved.relative()))?;
    ensure_within(root, &canonical, resolved)?;
    Ok(canonical)
}

/// Canonicalize the directory that contains `resolved`.
///
/// Used when the final entry may not exist yet, or must not be followed.
/// The parent has to exist.
pub fn existing_parent(root: &Path, resolved: &ResolvedPath) -> Result<PathBuf, FileError> {
    let parent = resolved
        .as_path()
        .parent()
        .filter(|_| !resolved.is_root())
        .ok_or(PathRejection::IsRootItself)?;

    let canonical = fs::canonicalize(parent).map_err(|e| {
        let display = parent
            .strip_prefix(root)
            .map(|p| p.display().to_string())
            .unwrap_or_else(|_| resolved.relative());
        FileError::from_io(e, display)
    })?;
    ensure_within(root, &canonical, resolved)?;
    Ok(canonical)
}

fn ensure_within(root: &Path, canonical: &Path, resolved: &ResolvedPath) -> Result<(), FileError> {
    if is_within(root, canonical) {
        Ok(())
    } else {
        Err(PathRejection::OutsideRoot(resolved.relative()).into())
    }
}
