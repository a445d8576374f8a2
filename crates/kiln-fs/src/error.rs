//! Error type shared by every filesystem backend.

use std::path::PathBuf;

use thiserror::Error;

pub type FsResult<T> = std::result::Result<T, FsError>;

#[derive(Debug, Error)]
pub enum FsError {
    #[error("{op} failed for {}: {source}", .path.display())]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("invalid UTF-8 in {}", .0.display())]
    InvalidUtf8(PathBuf),
}

impl FsError {
    pub(crate) fn io(op: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            FsError::NotFound(path)
        } else {
            FsError::Io { op, path, source }
        }
    }

    /// True when the underlying cause is an absent path.
    pub fn is_not_found(&self) -> bool {
        matches!(self, FsError::NotFound(_))
    }
}
