//! Embeddable hierarchical key-value store.
//!
//! A database is a tree of named buckets. Each bucket holds a flat map from
//! string keys to opaque byte values plus any number of named child buckets.
//! The whole tree is persisted as one JSON document in a single file owned by
//! the root bucket, and loaded back in one piece.
//!
//! # Key Types
//!
//! - [`MemDb`] -- handle on a root bucket, its file system and configuration
//! - [`Bucket`] -- a node in the tree: keyed values and named children
//! - [`BucketRole`] -- root (persistable) or child (never persisted alone)
//! - [`MemDbConfig`] -- document layout and sync strategy
//!
//! # Rules
//!
//! 1. Only the root is ever written to or removed from storage.
//! 2. Writes replace the file atomically; a failed write leaves the old file.
//! 3. Opening rebuilds the entire tree or returns an error, never a partial tree.
//! 4. The tree has no internal locking; share it behind your own lock.

pub mod bucket;
pub mod codec;
pub mod config;
pub mod db;
pub mod error;

pub use bucket::{Bucket, BucketRole};
pub use config::{DocumentFormat, MemDbConfig};
pub use db::MemDb;
pub use error::{MemDbError, MemDbResult};

// Re-export the file-system capability so callers need only this crate.
pub use memdb_fs::{FileSystem, FsError, InMemoryFileSystem, OsFileSystem, SyncMode};
