use std::io;
use std::path::{Path, PathBuf};

/// Errors from file-system operations.
#[derive(Debug, thiserror::Error)]
pub enum FsError {
    /// The file does not exist.
    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Any other I/O failure, tagged with the path it happened on.
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl FsError {
    /// Classify an `io::Error` raised while operating on `path`.
    pub fn from_io(path: &Path, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::NotFound {
            Self::NotFound(path.to_path_buf())
        } else {
            Self::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    }

    /// The path the failed operation targeted.
    pub fn path(&self) -> &Path {
        match self {
            Self::NotFound(path) => path,
            Self::Io { path, .. } => path,
        }
    }
}

/// Result alias for file-system operations.
pub type FsResult<T> = Result<T, FsError>;
