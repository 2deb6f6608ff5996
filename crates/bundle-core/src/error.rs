//! Error types for bundle-core

use std::fmt;
use std::path::PathBuf;

/// Result type for bundle-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in bundle-core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Manifest content is contradictory or incomplete
    #[error("Manifest conflict: {message}")]
    ManifestConflict { message: String },

    /// Manifest is not well-formed XML
    #[error("Cannot parse manifest {path}: {message}")]
    ManifestParse { path: PathBuf, message: String },

    /// Manifest tree cannot be serialised
    #[error("Cannot write manifest: {message}")]
    ManifestWrite { message: String },

    /// Directory has no manifest
    #[error("{path} is not a bundle: no manifest found")]
    NotABundle { path: PathBuf },

    /// Release of one repository failed
    #[error("Cannot release '{target}': {reason}")]
    RepoRelease {
        target: String,
        reason: ReleaseFailure,
    },

    /// Release of the bundle itself failed before touching any repository
    #[error("Cannot release bundle: {message}")]
    BundleRelease { message: String },

    /// No working copy where one is required
    #[error("No repository at {path}")]
    RepoNotFound { path: PathBuf },

    /// Named tag or revision is absent
    #[error("Node '{name}' not found")]
    NodeNotFound { name: String },

    /// Declared or inferred branch is absent
    #[error("Branch '{name}' not found in '{target}'")]
    BranchNotFound { name: String, target: String },

    /// No descriptor for the requested target
    #[error("No repository with target '{target}' in bundle")]
    TargetNotFound { target: String },

    /// Archive output would overwrite an existing directory
    #[error("Archive output {path} already exists")]
    ArchiveExists { path: PathBuf },

    /// Configuration file is invalid
    #[error("Invalid configuration {path}: {message}")]
    Config { path: PathBuf, message: String },

    // Transparent wrappers for underlying crate errors
    /// Filesystem error from bundle-fs
    #[error(transparent)]
    Fs(#[from] bundle_fs::Error),

    /// Backend error from bundle-vcs
    #[error(transparent)]
    Vcs(#[from] bundle_vcs::Error),
}

impl Error {
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::ManifestConflict {
            message: message.into(),
        }
    }

    pub fn release(target: impl Into<String>, reason: ReleaseFailure) -> Self {
        Self::RepoRelease {
            target: target.into(),
            reason,
        }
    }

    pub fn bundle(message: impl Into<String>) -> Self {
        Self::BundleRelease {
            message: message.into(),
        }
    }
}

/// Why a single repository could not be released.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReleaseFailure {
    /// Uncommitted modifications in the working copy
    LocalChanges { paths: Vec<String> },
    /// Tracked branch has more than one head
    MultipleHeads { count: usize },
    /// Working copy is on another branch than the declared one
    WrongBranch { expected: String, found: String },
    /// Checked out changeset is not a head of the tracked branch
    NotAHead,
    /// Tracked branch has no head at all
    NoHead { branch: String },
    /// Uncommitted merge in the working copy
    SeveralParents,
    /// Version marker or changelog missing
    MissingFile { file: String },
    /// Version marker present but unreadable
    InvalidVersionFile { file: String, message: String },
    /// Existing tag is followed by commits this tool does not make
    ForeignTag { tag: String },
    /// History moved since the last tag but the changelog is empty
    UnreleasedChanges { tag: String },
    /// Pinned working copy is not at its tag
    NotAtTag { tag: String },
}

impl ReleaseFailure {
    /// Short machine-readable label, `None` for the unlabelled reasons.
    pub fn label(&self) -> Option<&'static str> {
        match self {
            Self::LocalChanges { .. } => Some("local-changes"),
            Self::MultipleHeads { .. } => Some("multiple-heads"),
            Self::WrongBranch { .. } => Some("wrong-branch"),
            Self::NotAHead => Some("not-a-head"),
            Self::NoHead { .. } => Some("no-head"),
            Self::SeveralParents => Some("several-parents"),
            _ => None,
        }
    }
}

impl fmt::Display for ReleaseFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LocalChanges { paths } => {
                write!(f, "local changes in {}", paths.join(", "))
            }
            Self::MultipleHeads { count } => write!(f, "branch has {count} heads"),
            Self::WrongBranch { expected, found } => {
                write!(f, "working copy is on '{found}', expected '{expected}'")
            }
            Self::NotAHead => f.write_str("working copy is not at a head of its branch"),
            Self::NoHead { branch } => write!(f, "branch '{branch}' has no head"),
            Self::SeveralParents => f.write_str("uncommitted merge in working copy"),
            Self::MissingFile { file } => write!(f, "missing {file}"),
            Self::InvalidVersionFile { file, message } => {
                write!(f, "cannot read version from {file}: {message}")
            }
            Self::ForeignTag { tag } => {
                write!(f, "previous tag '{tag}' wasn't made by this tool")
            }
            Self::UnreleasedChanges { tag } => write!(
                f,
                "history changed since '{tag}' but the changelog is empty (use --release-again)"
            ),
            Self::NotAtTag { tag } => write!(f, "working copy is not at tag '{tag}'"),
        }?;
        if let Some(label) = self.label() {
            write!(f, " [{label}]")?;
        }
        Ok(())
    }
}
