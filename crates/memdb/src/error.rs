//! Error types for the bucket tree.

use memdb_fs::FsError;

/// Errors that can occur during bucket and persistence operations.
#[derive(Debug, thiserror::Error)]
pub enum MemDbError {
    /// A child bucket with this name already exists.
    #[error("bucket already exists: {name}")]
    BucketExists { name: String },

    /// The key is already present (insert-if-absent).
    #[error("key already exists: {key}")]
    KeyExists { key: String },

    /// Persistence was attempted on a bucket that is not a root.
    #[error("could not persist non-root bucket: {name}")]
    NonRoot { name: String },

    /// The underlying file read, write or remove failed.
    #[error("io error: {0}")]
    Io(#[from] FsError),

    /// The persisted document does not have the expected shape.
    #[error("decode error: {0}")]
    Decode(String),

    /// The tree could not be encoded into a document.
    #[error("encode error: {0}")]
    Encode(String),

    /// The configuration could not be parsed.
    #[error("config error: {0}")]
    Config(String),
}

/// Convenience alias for bucket tree results.
pub type MemDbResult<T> = Result<T, MemDbError>;
