//! Error types for bundle-vcs

use std::path::PathBuf;

/// Result type for bundle-vcs operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in bundle-vcs operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    #[error("Filesystem error: {0}")]
    Fs(#[from] bundle_fs::Error),

    #[error("No repository found at or above {path}")]
    RepoNotFound { path: PathBuf },

    #[error("Revision '{rev}' not found")]
    RevisionNotFound { rev: String },

    #[error("Branch '{name}' not found")]
    BranchNotFound { name: String },

    #[error("Cloning {url} into {dest} failed: {message}")]
    CloneFailed {
        url: String,
        dest: PathBuf,
        message: String,
    },

    #[error("Cannot fast-forward branch '{branch}' to the pulled revision")]
    CannotFastForward { branch: String },

    #[error("Repository at {path} has no checked out revision")]
    NoCheckout { path: PathBuf },
}
