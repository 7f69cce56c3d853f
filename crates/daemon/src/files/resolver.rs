//! Path confinement for client-supplied paths.
//!
//! Every file operation names its target with a logical path: an untrusted
//! string interpreted relative to the configured root. This module turns a
//! logical path into an absolute path that is guaranteed to be the root or
//! one of its descendants, or rejects it.
//!
//! Resolution is pure path algebra. Nothing here touches the filesystem, so
//! symlinks are not followed; callers that act on existing entries re-check
//! the canonical target (see [`super::canonical`]).
//!
//! # Algorithm
//!
//! 1. An empty path means the root, unless the operation needs an explicit
//!    target (download, delete), which yields [`PathRejection::MissingPath`].
//! 2. The path is normalized lexically: `.` segments are dropped and `..`
//!    removes the previous segment.
//! 3. A `..` that would climb above the root is [`PathRejection::Traversal`];
//!    an absolute path is [`PathRejection::OutsideRoot`].
//! 4. Deleting the root, however it is spelled, is
//!    [`PathRejection::IsRootItself`].
//! 5. The normalized segments are joined onto the root and containment is
//!    checked component by component, never by string prefix.

use std::fmt;
use std::path::{Component, Path, PathBuf};

use protocol::ErrorCode;
use thiserror::Error;

/// The kind of file operation a path is resolved for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// List a directory.
    List,
    /// Read a file.
    Download,
    /// Write a file into a directory.
    Upload,
    /// Create a directory inside a directory.
    Mkdir,
    /// Remove a file or directory tree.
    Delete,
}

impl Operation {
    /// Whether an empty logical path is an error instead of the root.
    pub fn requires_target(&self) -> bool {
        matches!(self, Self::Download | Self::Delete)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::List => "list",
            Self::Download => "download",
            Self::Upload => "upload",
            Self::Mkdir => "mkdir",
            Self::Delete => "delete",
        };
        f.write_str(name)
    }
}

/// Why a logical path was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathRejection {
    /// The operation requires a path and none was given.
    #[error("path required")]
    MissingPath,

    /// The path climbs above the root or carries a separator where a single
    /// name was expected.
    #[error("invalid path: {0}")]
    Traversal(String),

    /// The path does not lie inside the root.
    #[error("access denied: {0} is outside the root directory")]
    OutsideRoot(String),

    /// The operation would act on the root directory itself.
    #[error("refusing to operate on the root directory")]
    IsRootItself,
}

impl PathRejection {
    /// API error code for this rejection.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::MissingPath => ErrorCode::MissingPath,
            Self::Traversal(_) => ErrorCode::Traversal,
            Self::OutsideRoot(_) => ErrorCode::OutsideRoot,
            Self::IsRootItself => ErrorCode::IsRootItself,
        }
    }
}

/// A logical path after lexical normalization.
///
/// Holds only plain name segments; an empty segment list is the root.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedPath {
    segments: Vec<String>,
}

impl NormalizedPath {
    /// Whether this path denotes the root itself.
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// The plain name segments, outermost first.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Join onto `base`, one segment at a time.
    fn join_onto(&self, base: &Path) -> PathBuf {
        let mut joined = base.to_path_buf();
        for segment in &self.segments {
            joined.push(segment);
        }
        joined
    }
}

impl fmt::Display for NormalizedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            f.write_str(".")
        } else {
            f.write_str(&self.segments.join("/"))
        }
    }
}

/// An absolute path proven to lie inside the root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    absolute: PathBuf,
    relative: NormalizedPath,
}

impl ResolvedPath {
    /// The absolute on-disk path.
    pub fn as_path(&self) -> &Path {
        &self.absolute
    }

    /// Path relative to the root, `"."` for the root itself.
    pub fn relative(&self) -> String {
        self.relative.to_string()
    }

    /// Whether this is the root directory.
    pub fn is_root(&self) -> bool {
        self.relative.is_root()
    }

    /// Final path segment, or `None` for the root.
    pub fn file_name(&self) -> Option<&str> {
        self.relative.segments.last().map(String::as_str)
    }

    pub fn into_path_buf(self) -> PathBuf {
        self.absolute
    }
}

impl AsRef<Path> for ResolvedPath {
    fn as_ref(&self) -> &Path {
        &self.absolute
    }
}

/// Lexically normalize a logical path.
///
/// `.` segments and repeated separators vanish and `..` pops the previous
/// segment. A `..` with nothing left to pop is a traversal attempt.
pub fn normalize(logical: &str) -> Result<NormalizedPath, PathRejection> {
    if logical.contains('\0') {
        return Err(PathRejection::Traversal(
            "path contains a NUL byte".to_string(),
        ));
    }

    let mut segments: Vec<String> = Vec::new();
    for component in Path::new(logical).components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if segments.pop().is_none() {
                    return Err(PathRejection::Traversal(logical.to_string()));
                }
            }
            Component::Normal(name) => segments.push(name.to_string_lossy().into_owned()),
            Component::RootDir | Component::Prefix(_) => {
                return Err(PathRejection::OutsideRoot(logical.to_string()));
            }
        }
    }

    Ok(NormalizedPath { segments })
}

/// Whether `candidate` equals `root` or lies below it.
///
/// Compares whole path components, so `/srv/data-public` is not within
/// `/srv/data`.
pub fn is_within(root: &Path, candidate: &Path) -> bool {
    candidate.starts_with(root)
}

/// Resolve `logical` against `root` for `operation`.
pub fn resolve(
    root: &Path,
    logical: &str,
    operation: Operation,
) -> Result<ResolvedPath, PathRejection> {
    let logical = if logical.is_empty() {
        if operation.requires_target() {
            return Err(PathRejection::MissingPath);
        }
        "."
    } else {
        logical
    };

    let normalized = normalize(logical)?;
    if operation == Operation::Delete && normalized.is_root() {
        return Err(PathRejection::IsRootItself);
    }

    confine(root, normalized, logical)
}

/// Resolve `child` as a single entry name inside the directory `base`.
///
/// Used when the target name arrives separately from its directory, e.g. the
/// filename of an upload. The name must be one plain segment: separators,
/// `.` and `..` are rejected rather than interpreted.
pub fn resolve_join(
    root: &Path,
    base: &str,
    child: &str,
    operation: Operation,
) -> Result<ResolvedPath, PathRejection> {
    // The child supplies the target, so an empty base always means the root.
    let base = if base.is_empty() { "." } else { base };
    let parent = normalize(base)?;
    validate_child_name(child)?;

    let mut normalized = parent;
    normalized.segments.push(child.to_string());
    if operation == Operation::Delete && normalized.is_root() {
        return Err(PathRejection::IsRootItself);
    }

    confine(root, normalized, child)
}

fn validate_child_name(child: &str) -> Result<(), PathRejection> {
    if child.is_empty() {
        return Err(PathRejection::MissingPath);
    }
    if child == "." || child == ".." {
        return Err(PathRejection::Traversal(child.to_string()));
    }
    if child.contains(['/', '\\', '\0']) {
        return Err(PathRejection::Traversal(format!(
            "name contains a path separator: {child}"
        )));
    }
    Ok(())
}

fn confine(
    root: &Path,
    normalized: NormalizedPath,
    logical: &str,
) -> Result<ResolvedPath, PathRejection> {
    let absolute = normalized.join_onto(root);
    if !is_within(root, &absolute) {
        return Err(PathRejection::OutsideRoot(logical.to_string()));
    }

    Ok(ResolvedPath {
        absolute,
        relative: normalized,
    })
}

/// Resolver bound to a fixed root directory.
///
/// The root should be absolute and canonical; [`PathResolver::canonicalized`]
/// builds one from a directory that exists on disk.
#[derive(Debug, Clone)]
pub struct PathResolver {
    root: PathBuf,
}

impl PathResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Canonicalize `root` and check that it is a directory.
    pub fn canonicalized(root: impl AsRef<Path>) -> std::io::Result<Self> {
        let canonical = std::fs::canonicalize(root.as_ref())?;
        if !canonical.is_dir() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotADirectory,
                format!("root is not a directory: {}", canonical.display()),
            ));
        }
        Ok(Self::new(canonical))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn resolve(
        &self,
        logical: &str,
        operation: Operation,
    ) -> Result<ResolvedPath, PathRejection> {
        resolve(&self.root, logical, operation)
    }

    pub fn resolve_join(
        &self,
        base: &str,
        child: &str,
        operation: Operation,
    ) -> Result<ResolvedPath, PathRejection> {
        resolve_join(&self.root, base, child, operation)
    }
}
