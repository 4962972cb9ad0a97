use std::path::Path;

use crate::error::FsResult;

/// Whole-file storage capability used to persist root buckets.
///
/// All implementations must satisfy these invariants:
/// - `write_all` replaces the file atomically. A crash or error mid-write
///   never leaves a truncated or half-written file behind.
/// - A failed `write_all` leaves the previous contents (if any) in place.
/// - A missing file is reported as [`FsError::NotFound`](crate::FsError::NotFound)
///   by `read_all` and `remove`.
/// - Contents are never interpreted.
pub trait FileSystem: Send + Sync {
    /// Read the entire file at `path`.
    fn read_all(&self, path: &Path) -> FsResult<Vec<u8>>;

    /// Atomically replace the file at `path` with `contents`.
    fn write_all(&self, path: &Path, contents: &[u8]) -> FsResult<()>;

    /// Remove the file at `path`.
    fn remove(&self, path: &Path) -> FsResult<()>;

    /// Check whether a file exists at `path`.
    fn exists(&self, path: &Path) -> FsResult<bool>;
}
