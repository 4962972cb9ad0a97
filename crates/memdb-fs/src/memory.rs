use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use crate::error::{FsError, FsResult};
use crate::traits::FileSystem;

/// In-memory, HashMap-based file system.
///
/// Intended for tests and embedding. Files are held in memory behind a
/// `RwLock`; a write swaps the whole entry under the lock, so it is atomic
/// by construction. Contents are cloned on read/write.
pub struct InMemoryFileSystem {
    files: RwLock<HashMap<PathBuf, Vec<u8>>>,
}

impl InMemoryFileSystem {
    /// Create a new empty file system.
    pub fn new() -> Self {
        Self {
            files: RwLock::new(HashMap::new()),
        }
    }

    /// Number of files currently stored.
    pub fn len(&self) -> usize {
        self.files.read().expect("lock poisoned").len()
    }

    /// Returns `true` if no files are stored.
    pub fn is_empty(&self) -> bool {
        self.files.read().expect("lock poisoned").is_empty()
    }

    /// Return a sorted list of all stored paths.
    pub fn paths(&self) -> Vec<PathBuf> {
        let map = self.files.read().expect("lock poisoned");
        let mut paths: Vec<PathBuf> = map.keys().cloned().collect();
        paths.sort();
        paths
    }
}

impl Default for InMemoryFileSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl FileSystem for InMemoryFileSystem {
    fn read_all(&self, path: &Path) -> FsResult<Vec<u8>> {
        let map = self.files.read().expect("lock poisoned");
        map.get(path)
            .cloned()
            .ok_or_else(|| FsError::NotFound(path.to_path_buf()))
    }

    fn write_all(&self, path: &Path, contents: &[u8]) -> FsResult<()> {
        let mut map = self.files.write().expect("lock poisoned");
        map.insert(path.to_path_buf(), contents.to_vec());
        Ok(())
    }

    fn remove(&self, path: &Path) -> FsResult<()> {
        let mut map = self.files.write().expect("lock poisoned");
        map.remove(path)
            .map(|_| ())
            .ok_or_else(|| FsError::NotFound(path.to_path_buf()))
    }

    fn exists(&self, path: &Path) -> FsResult<bool> {
        let map = self.files.read().expect("lock poisoned");
        Ok(map.contains_key(path))
    }
}

impl std::fmt::Debug for InMemoryFileSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.len();
        f.debug_struct("InMemoryFileSystem")
            .field("file_count", &count)
            .finish()
    }
}
