//! Backend traits the bundler drives working copies through

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use crate::Result;

/// Full identifier of a changeset.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Revision(String);

impl Revision {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Abbreviated form for log lines.
    pub fn short(&self) -> &str {
        let end = self.0.len().min(12);
        &self.0[..end]
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<git2::Oid> for Revision {
    fn from(oid: git2::Oid) -> Self {
        Self(oid.to_string())
    }
}

/// Where a working copy currently sits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkingState {
    /// Checked out changeset
    pub node: Revision,
    /// Parents of the working directory. More than one during an uncommitted merge.
    pub parents: Vec<Revision>,
    /// Branch the working copy is on, `None` when detached
    pub branch: Option<String>,
}

impl WorkingState {
    /// The single working directory parent, or `None` during a merge.
    pub fn single_parent(&self) -> Option<&Revision> {
        match self.parents.as_slice() {
            [only] => Some(only),
            _ => None,
        }
    }
}

/// Operations on one working copy.
///
/// Revisions given as `&str` accept anything the backend can resolve: branch
/// names, tag names or full identifiers.
pub trait Vcs {
    /// Root of the working copy
    fn root(&self) -> &Path;

    /// Checked out revision, its parents and the current branch
    fn working_state(&self) -> Result<WorkingState>;

    /// Tracked paths with uncommitted modifications
    fn status(&self) -> Result<Vec<String>>;

    /// Every tag with the changeset it designates
    fn tags(&self) -> Result<BTreeMap<String, Revision>>;

    /// Names of known branches, local and remote-tracking
    fn branches(&self) -> Result<Vec<String>>;

    /// Branch the repository designates as its main line, if it knows one
    fn default_branch(&self) -> Result<Option<String>>;

    /// Heads of a branch, tip first. Empty when the branch does not exist.
    fn branch_heads(&self, name: &str) -> Result<Vec<Revision>>;

    /// Direct children of a changeset among all known heads
    fn children(&self, rev: &Revision) -> Result<Vec<Revision>>;

    /// First line of a changeset's message
    fn summary(&self, rev: &Revision) -> Result<String>;

    /// Move the working copy to a branch, tag or changeset.
    /// Local modifications to files the update does not touch are kept.
    fn update_to(&self, rev: &str) -> Result<()>;

    /// Pull every branch and tag from another working copy
    fn pull(&self, source: &Path) -> Result<()>;

    /// Start tracking files
    fn add(&self, paths: &[&str]) -> Result<()>;

    /// Commit every tracked modification
    fn commit(&self, message: &str) -> Result<Revision>;

    /// Tag the checked out changeset
    fn create_tag(&self, name: &str, message: &str) -> Result<()>;

    /// Create a branch at the checked out changeset and switch to it
    fn create_branch(&self, name: &str) -> Result<()>;

    /// Close a branch. Returns `false` when the backend has no such notion.
    fn close_branch(&self, name: &str) -> Result<bool>;

    /// Discard every uncommitted modification of tracked files
    fn revert_all(&self) -> Result<()>;

    /// Patch lines between two revisions, restricted to `path`
    fn diff(&self, from: &str, to: &str, path: &str) -> Result<Vec<String>>;

    /// Export the tree of `rev` into `dest`
    fn archive_to(&self, dest: &Path, rev: &str) -> Result<()>;

    /// Point the default remote to new URLs. Returns whether anything changed.
    fn set_remote_urls(&self, url: &str, push_url: Option<&str>) -> Result<bool>;

    /// Number of changesets on `branch` the default remote does not have
    fn outgoing(&self, branch: &str) -> Result<usize>;
}

/// Factory for working copies.
pub trait VcsProvider {
    /// Open the working copy rooted exactly at `path`
    fn open(&self, path: &Path) -> Result<Box<dyn Vcs>>;

    /// Open the working copy enclosing `path`
    fn discover(&self, path: &Path) -> Result<Box<dyn Vcs>>;

    /// Clone `url` into `dest`
    fn clone_repo(&self, url: &str, dest: &Path) -> Result<Box<dyn Vcs>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_revision_is_truncated() {
        let rev = Revision::new("0123456789abcdef0123");
        assert_eq!(rev.short(), "0123456789ab");
        assert_eq!(Revision::new("abc").short(), "abc");
    }

    #[test]
    fn merge_has_no_single_parent() {
        let state = WorkingState {
            node: Revision::new("a"),
            parents: vec![Revision::new("a"), Revision::new("b")],
            branch: Some("main".into()),
        };
        assert!(state.single_parent().is_none());
    }
}
