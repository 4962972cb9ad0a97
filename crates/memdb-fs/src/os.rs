use std::fs;
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::error::{FsError, FsResult};
use crate::traits::FileSystem;

/// Flush/sync strategy for replace-writes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    /// `fsync` the new contents before they are renamed into place, then
    /// `fsync` the directory so the rename itself is on disk.
    EveryWrite,
    /// Rely on OS page-cache buffering (fastest, least durable).
    OsDefault,
}

impl Default for SyncMode {
    fn default() -> Self {
        Self::OsDefault
    }
}

/// The real file system.
///
/// `write_all` stages the new contents in a temporary file created in the
/// destination directory and renames it over the target, so the target is
/// replaced in a single step. The rename stays on one file system because
/// the temporary file lives next to the target.
#[derive(Clone, Debug, Default)]
pub struct OsFileSystem {
    sync_mode: SyncMode,
}

impl OsFileSystem {
    /// Create a backend with the default sync mode.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a backend with an explicit sync mode.
    pub fn with_sync_mode(sync_mode: SyncMode) -> Self {
        Self { sync_mode }
    }

    /// The configured sync mode.
    pub fn sync_mode(&self) -> SyncMode {
        self.sync_mode
    }
}

impl FileSystem for OsFileSystem {
    fn read_all(&self, path: &Path) -> FsResult<Vec<u8>> {
        let contents = fs::read(path).map_err(|e| FsError::from_io(path, e))?;
        debug!(path = %path.display(), bytes = contents.len(), "read file");
        Ok(contents)
    }

    fn write_all(&self, path: &Path, contents: &[u8]) -> FsResult<()> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir).map_err(|e| FsError::from_io(dir, e))?;

        // Dropping `tmp` on any early return removes the temporary file.
        let mut tmp = NamedTempFile::new_in(dir).map_err(|e| FsError::from_io(dir, e))?;
        tmp.write_all(contents)
            .and_then(|()| tmp.flush())
            .map_err(|e| FsError::from_io(tmp.path(), e))?;

        if self.sync_mode == SyncMode::EveryWrite {
            tmp.as_file()
                .sync_all()
                .map_err(|e| FsError::from_io(tmp.path(), e))?;
        }

        // Keep the permissions of the file being replaced.
        if let Ok(meta) = fs::metadata(path) {
            if meta.is_file() {
                if let Err(e) = tmp.as_file().set_permissions(meta.permissions()) {
                    warn!(path = %path.display(), error = %e, "could not carry over file permissions");
                }
            }
        }

        tmp.persist(path).map_err(|e| {
            // `e.file` is dropped here, which deletes the temporary file.
            FsError::Io {
                path: path.to_path_buf(),
                source: e.error,
            }
        })?;

        if self.sync_mode == SyncMode::EveryWrite {
            sync_dir(dir)?;
        }

        debug!(path = %path.display(), bytes = contents.len(), sync = ?self.sync_mode, "replaced file");
        Ok(())
    }

    fn remove(&self, path: &Path) -> FsResult<()> {
        fs::remove_file(path).map_err(|e| FsError::from_io(path, e))?;
        debug!(path = %path.display(), "removed file");
        Ok(())
    }

    fn exists(&self, path: &Path) -> FsResult<bool> {
        match fs::metadata(path) {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(FsError::from_io(path, e)),
        }
    }
}

/// Flush a directory's entries, making a rename inside it durable.
#[cfg(unix)]
fn sync_dir(dir: &Path) -> FsResult<()> {
    fs::File::open(dir)
        .and_then(|d| d.sync_all())
        .map_err(|e| FsError::from_io(dir, e))
}

// Directories cannot be opened as files here; the rename is left to the OS.
#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> FsResult<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dir_entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn write_and_read_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.db");
        let fs = OsFileSystem::new();

        fs.write_all(&path, b"hello world").unwrap();
        assert_eq!(fs.read_all(&path).unwrap(), b"hello world");
    }

    #[test]
    fn write_replaces_and_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.db");
        let fs = OsFileSystem::new();

        fs.write_all(&path, b"first version, quite a bit longer").unwrap();
        fs.write_all(&path, b"second").unwrap();

        assert_eq!(fs.read_all(&path).unwrap(), b"second");
        assert_eq!(dir_entries(dir.path()), vec!["data.db".to_string()]);
    }

    #[test]
    fn write_creates_missing_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("deeper").join("data.db");
        let fs = OsFileSystem::new();

        fs.write_all(&path, b"x").unwrap();
        assert!(fs.exists(&path).unwrap());
    }

    #[test]
    fn failed_write_leaves_target_and_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        // A directory sits where the file should go, so the final rename fails.
        let target = dir.path().join("occupied");
        fs::create_dir(&target).unwrap();
        fs::write(target.join("keep.txt"), b"keep").unwrap();

        let result = OsFileSystem::new().write_all(&target, b"new contents");
        assert!(matches!(result, Err(FsError::Io { .. })));

        assert!(target.is_dir());
        assert_eq!(fs::read(target.join("keep.txt")).unwrap(), b"keep");
        assert_eq!(dir_entries(dir.path()), vec!["occupied".to_string()]);
    }

    #[test]
    fn read_missing_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.db");
        let err = OsFileSystem::new().read_all(&path).unwrap_err();
        assert!(matches!(err, FsError::NotFound(p) if p == path));
    }

    #[test]
    fn remove_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gone.db");
        let fs = OsFileSystem::new();

        fs.write_all(&path, b"bye").unwrap();
        fs.remove(&path).unwrap();
        assert!(!fs.exists(&path).unwrap());
        assert!(matches!(fs.remove(&path), Err(FsError::NotFound(_))));
    }

    #[test]
    fn sync_every_write_mode() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sync.db");
        let fs = OsFileSystem::with_sync_mode(SyncMode::EveryWrite);
        assert_eq!(fs.sync_mode(), SyncMode::EveryWrite);

        fs.write_all(&path, b"durable").unwrap();
        assert_eq!(fs.read_all(&path).unwrap(), b"durable");
    }

    #[test]
    fn sync_every_write_into_new_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fresh").join("sync.db");
        let fs = OsFileSystem::with_sync_mode(SyncMode::EveryWrite);

        fs.write_all(&path, b"one").unwrap();
        fs.write_all(&path, b"two").unwrap();
        assert_eq!(fs.read_all(&path).unwrap(), b"two");
        assert_eq!(dir_entries(&dir.path().join("fresh")), vec!["sync.db".to_string()]);
    }

    #[cfg(unix)]
    #[test]
    fn sync_dir_flushes_existing_and_reports_missing() {
        let dir = tempfile::tempdir().unwrap();
        sync_dir(dir.path()).unwrap();

        let missing = dir.path().join("missing");
        assert!(matches!(sync_dir(&missing), Err(FsError::NotFound(p)) if p == missing));
    }

    #[cfg(unix)]
    #[test]
    fn replace_keeps_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("perm.db");
        let fs = OsFileSystem::new();

        fs.write_all(&path, b"one").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o640)).unwrap();
        fs.write_all(&path, b"two").unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o640);
    }

    #[test]
    fn sync_mode_default_is_os_default() {
        assert_eq!(SyncMode::default(), SyncMode::OsDefault);
    }
}
