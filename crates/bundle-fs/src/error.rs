//! Error types for bundle-fs

use std::path::PathBuf;

/// Result type for bundle-fs operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in bundle-fs operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Lock acquisition failed for {path}")]
    LockFailed { path: PathBuf },

    #[error("Cannot walk {path}: {message}")]
    Walk { path: PathBuf, message: String },

    #[error("Refusing to link {dest}: destination already exists")]
    LinkExists { dest: PathBuf },
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
