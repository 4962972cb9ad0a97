//! File-system capability for MemDB.
//!
//! A bucket tree only ever touches storage through three whole-file
//! operations: read everything, replace everything, and remove. This crate
//! defines that capability as the [`FileSystem`] trait and ships two
//! backends for it.
//!
//! # Backends
//!
//! - [`OsFileSystem`] -- the real file system; writes go to a temporary file
//!   in the destination directory and are renamed over the target
//! - [`InMemoryFileSystem`] -- `HashMap`-based backend for tests and embedding
//!
//! # Design Rules
//!
//! 1. `write_all` is atomic: readers observe the old contents or the new
//!    contents, never a prefix.
//! 2. A failed write leaves the previous file untouched.
//! 3. Contents are opaque bytes; no backend interprets them.
//! 4. All I/O errors are propagated with the offending path attached.

pub mod error;
pub mod memory;
pub mod os;
pub mod traits;

pub use error::{FsError, FsResult};
pub use memory::InMemoryFileSystem;
pub use os::{OsFileSystem, SyncMode};
pub use traits::FileSystem;
