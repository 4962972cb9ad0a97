//! The bucket tree: one flat key-value store per node plus named children.
//!
//! A [`Bucket`] owns its children by value, so the tree can never contain a
//! cycle and deleting a child drops its whole subtree. Every mutator works on
//! a single bucket; reaching a grandchild means walking down with
//! [`Bucket::get_child_bucket_mut`].

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use memdb_fs::FileSystem;
use serde::Serialize;
use tracing::{debug, warn};

use crate::codec;
use crate::config::DocumentFormat;
use crate::error::{MemDbError, MemDbResult};

/// Whether a bucket is the persistable root of a tree or a nested child.
///
/// Fixed at creation; a bucket never changes role.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum BucketRole {
    /// The top of a tree, backed by the file at `location`.
    Root { location: PathBuf },
    /// A bucket nested under a parent. Never persisted on its own.
    #[default]
    Child,
}

/// A node in the tree: a flat key-value store and named child buckets.
///
/// Keys and child names are separate namespaces. Values are opaque bytes.
///
/// Serializes as the persisted document shape; decoding lives in
/// [`codec`](crate::codec).
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Bucket {
    name: String,
    #[serde(rename = "Location", serialize_with = "codec::serialize_role")]
    role: BucketRole,
    #[serde(serialize_with = "codec::serialize_store")]
    store: BTreeMap<String, Vec<u8>>,
    #[serde(serialize_with = "codec::serialize_children")]
    children: BTreeMap<String, Bucket>,
}

impl Bucket {
    /// Create an empty root bucket backed by the file at `location`.
    pub fn root(name: impl Into<String>, location: impl Into<PathBuf>) -> Self {
        Self::with_role(
            name,
            BucketRole::Root {
                location: location.into(),
            },
        )
    }

    fn with_role(name: impl Into<String>, role: BucketRole) -> Self {
        Self {
            name: name.into(),
            role,
            store: BTreeMap::new(),
            children: BTreeMap::new(),
        }
    }

    /// Assemble a decoded child bucket.
    pub(crate) fn from_parts(
        name: String,
        store: BTreeMap<String, Vec<u8>>,
        children: BTreeMap<String, Bucket>,
    ) -> Self {
        Self {
            name,
            role: BucketRole::Child,
            store,
            children,
        }
    }

    /// Turn a freshly decoded tree into the root backed by `location`.
    ///
    /// Decoding leaves every node as a child; only the opener knows which
    /// file the document came from.
    pub(crate) fn into_root(mut self, location: PathBuf) -> Self {
        self.role = BucketRole::Root { location };
        self
    }

    /// The bucket's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The bucket's role.
    pub fn role(&self) -> &BucketRole {
        &self.role
    }

    /// The backing file, for a root bucket.
    pub fn location(&self) -> Option<&Path> {
        match &self.role {
            BucketRole::Root { location } => Some(location.as_path()),
            BucketRole::Child => None,
        }
    }

    /// Returns `true` if this bucket is the root of its tree.
    pub fn is_root(&self) -> bool {
        matches!(self.role, BucketRole::Root { .. })
    }

    // ---------------------------------------------------------------
    // Key-value operations
    // ---------------------------------------------------------------

    /// Insert or overwrite `key`.
    pub fn upsert(&mut self, key: impl Into<String>, value: impl Into<Vec<u8>>) {
        self.store.insert(key.into(), value.into());
    }

    /// Insert `key` only if it is not already present.
    ///
    /// The existing value is left untouched on failure.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Vec<u8>>) -> MemDbResult<()> {
        use std::collections::btree_map::Entry;

        match self.store.entry(key.into()) {
            Entry::Occupied(e) => Err(MemDbError::KeyExists { key: e.key().clone() }),
            Entry::Vacant(e) => {
                e.insert(value.into());
                Ok(())
            }
        }
    }

    /// Fetch the value for `key`.
    ///
    /// `Some(&[])` is a present, empty value; `None` means absent.
    pub fn retrieve(&self, key: &str) -> Option<&[u8]> {
        self.store.get(key).map(Vec::as_slice)
    }

    /// Fetch an owned copy of the value for `key`.
    pub fn retrieve_owned(&self, key: &str) -> Option<Vec<u8>> {
        self.store.get(key).cloned()
    }

    /// Remove `key`, returning its value if it was present.
    pub fn delete(&mut self, key: &str) -> Option<Vec<u8>> {
        self.store.remove(key)
    }

    /// Returns `true` if `key` is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.store.contains_key(key)
    }

    /// Keys in this bucket, in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.store.keys().map(String::as_str)
    }

    /// Number of keys in this bucket (children not counted).
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// Returns `true` if this bucket holds no keys.
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    // ---------------------------------------------------------------
    // Child buckets
    // ---------------------------------------------------------------

    /// Create an empty child bucket named `name` and return it.
    ///
    /// Fails if a child with that name already exists; the existing child is
    /// left as it was.
    pub fn create_child_bucket(&mut self, name: &str) -> MemDbResult<&mut Bucket> {
        use std::collections::btree_map::Entry;

        match self.children.entry(name.to_string()) {
            Entry::Occupied(_) => Err(MemDbError::BucketExists {
                name: name.to_string(),
            }),
            Entry::Vacant(e) => {
                debug!(parent = %self.name, bucket = name, "created child bucket");
                Ok(e.insert(Bucket::with_role(name, BucketRole::Child)))
            }
        }
    }

    /// Look up a child bucket.
    pub fn get_child_bucket(&self, name: &str) -> Option<&Bucket> {
        self.children.get(name)
    }

    /// Look up a child bucket for mutation.
    pub fn get_child_bucket_mut(&mut self, name: &str) -> Option<&mut Bucket> {
        self.children.get_mut(name)
    }

    /// Detach the child bucket `name` and its whole subtree.
    ///
    /// Returns the detached subtree, or `None` if there was no such child.
    pub fn delete_child_bucket(&mut self, name: &str) -> Option<Bucket> {
        let removed = self.children.remove(name);
        if removed.is_some() {
            debug!(parent = %self.name, bucket = name, "deleted child bucket");
        }
        removed
    }

    /// Names of the child buckets, in sorted order.
    pub fn child_names(&self) -> impl Iterator<Item = &str> {
        self.children.keys().map(String::as_str)
    }

    /// Number of direct children.
    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    /// Levels of descendants below this bucket (0 for a leaf).
    pub fn depth(&self) -> usize {
        stacker::maybe_grow(codec::STACK_RED_ZONE, codec::STACK_GROWTH, || {
            self.children
                .values()
                .map(|child| child.depth() + 1)
                .max()
                .unwrap_or(0)
        })
    }

    // ---------------------------------------------------------------
    // Persistence
    // ---------------------------------------------------------------

    /// Encode the whole tree under this bucket and atomically replace the
    /// backing file with it.
    ///
    /// Only a root may be written; a child is rejected before the file
    /// system is touched.
    pub fn write(&self, fs: &dyn FileSystem, format: DocumentFormat) -> MemDbResult<()> {
        let location = self.require_root("write")?;
        let contents = codec::encode(self, format)?;
        fs.write_all(location, &contents)?;

        debug!(
            bucket = %self.name,
            path = %location.display(),
            bytes = contents.len(),
            children = self.children.len(),
            "wrote bucket tree"
        );
        Ok(())
    }

    /// Remove the backing file. Only a root may be destroyed.
    ///
    /// The in-memory tree is unaffected.
    pub fn destroy(&self, fs: &dyn FileSystem) -> MemDbResult<()> {
        let location = self.require_root("destroy")?;
        fs.remove(location)?;
        debug!(bucket = %self.name, path = %location.display(), "removed bucket file");
        Ok(())
    }

    fn require_root(&self, op: &str) -> MemDbResult<&Path> {
        match &self.role {
            BucketRole::Root { location } => Ok(location.as_path()),
            BucketRole::Child => {
                warn!(bucket = %self.name, op, "rejected persistence of non-root bucket");
                Err(MemDbError::NonRoot {
                    name: self.name.clone(),
                })
            }
        }
    }
}
