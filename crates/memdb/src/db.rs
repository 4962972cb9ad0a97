//! [`MemDb`]: the root bucket bound to its file system and configuration.

use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use memdb_fs::{FileSystem, OsFileSystem};
use tracing::debug;

use crate::bucket::Bucket;
use crate::codec;
use crate::config::MemDbConfig;
use crate::error::MemDbResult;

/// A database handle: the root bucket plus everything needed to persist it.
///
/// Dereferences to the root [`Bucket`], so key and child-bucket operations
/// are called on the handle directly.
pub struct MemDb {
    root: Bucket,
    fs: Arc<dyn FileSystem>,
    config: MemDbConfig,
}

impl std::fmt::Debug for MemDb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemDb")
            .field("name", &self.root.name())
            .field("location", &self.root.location())
            .field("keys", &self.root.len())
            .field("children", &self.root.child_count())
            .field("config", &self.config)
            .finish()
    }
}

impl MemDb {
    /// Create an empty database at `location` on the OS file system.
    ///
    /// Nothing touches the disk until [`write`](Self::write).
    pub fn create(name: impl Into<String>, location: impl Into<PathBuf>) -> Self {
        Self::create_with_config(name, location, MemDbConfig::default())
    }

    /// Like [`create`](Self::create), with an explicit configuration.
    pub fn create_with_config(
        name: impl Into<String>,
        location: impl Into<PathBuf>,
        config: MemDbConfig,
    ) -> Self {
        let fs = Arc::new(OsFileSystem::with_sync_mode(config.sync_mode));
        Self::create_with(name, location, fs, config)
    }

    /// Create an empty database persisted through `fs`.
    pub fn create_with(
        name: impl Into<String>,
        location: impl Into<PathBuf>,
        fs: Arc<dyn FileSystem>,
        config: MemDbConfig,
    ) -> Self {
        Self {
            root: Bucket::root(name, location),
            fs,
            config,
        }
    }

    /// Load the database stored at `location` on the OS file system.
    pub fn open(location: impl AsRef<Path>) -> MemDbResult<Self> {
        Self::open_with_config(location, MemDbConfig::default())
    }

    /// Like [`open`](Self::open), with an explicit configuration.
    pub fn open_with_config(location: impl AsRef<Path>, config: MemDbConfig) -> MemDbResult<Self> {
        let fs = Arc::new(OsFileSystem::with_sync_mode(config.sync_mode));
        Self::open_with(location, fs, config)
    }

    /// Load the database stored at `location` through `fs`.
    ///
    /// The whole tree is decoded before anything is returned. The opened
    /// path becomes the root's location, whatever the document recorded.
    pub fn open_with(
        location: impl AsRef<Path>,
        fs: Arc<dyn FileSystem>,
        config: MemDbConfig,
    ) -> MemDbResult<Self> {
        let location = location.as_ref();
        let contents = fs.read_all(location)?;
        let root = codec::decode(&contents)?.into_root(location.to_path_buf());

        debug!(
            path = %location.display(),
            bytes = contents.len(),
            bucket = root.name(),
            children = root.child_count(),
            "opened bucket tree"
        );
        Ok(Self { root, fs, config })
    }

    /// Persist the whole tree, atomically replacing the backing file.
    pub fn write(&self) -> MemDbResult<()> {
        self.root.write(self.fs.as_ref(), self.config.format)
    }

    /// Remove the backing file. The in-memory tree stays usable and can be
    /// written again.
    pub fn destroy(&self) -> MemDbResult<()> {
        self.root.destroy(self.fs.as_ref())
    }

    /// The root bucket.
    pub fn root(&self) -> &Bucket {
        &self.root
    }

    /// The root bucket, mutably.
    pub fn root_mut(&mut self) -> &mut Bucket {
        &mut self.root
    }

    /// Give up persistence and keep only the tree.
    pub fn into_root(self) -> Bucket {
        self.root
    }

    /// The active configuration.
    pub fn config(&self) -> &MemDbConfig {
        &self.config
    }

    /// The file-system capability backing this database.
    pub fn file_system(&self) -> &Arc<dyn FileSystem> {
        &self.fs
    }
}

impl Deref for MemDb {
    type Target = Bucket;

    fn deref(&self) -> &Bucket {
        &self.root
    }
}

impl DerefMut for MemDb {
    fn deref_mut(&mut self) -> &mut Bucket {
        &mut self.root
    }
}
