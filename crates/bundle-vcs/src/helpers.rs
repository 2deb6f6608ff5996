//! Shared git2 helper functions
//!
//! These functions encapsulate the git2 patterns the backend combines into
//! higher-level operations.

use std::fs;
use std::path::Path;

use git2::build::CheckoutBuilder;
use git2::{BranchType, Commit, ErrorCode, ObjectType, Oid, Repository, Signature, TreeWalkMode, TreeWalkResult};

use crate::{Error, Result, Revision};

/// Resolve a branch, tag or changeset id to a commit.
pub fn peel_revision<'r>(repo: &'r Repository, rev: &str) -> Result<Commit<'r>> {
    let object = repo.revparse_single(rev).map_err(|e| match e.code() {
        ErrorCode::NotFound | ErrorCode::Ambiguous | ErrorCode::InvalidSpec => {
            Error::RevisionNotFound {
                rev: rev.to_string(),
            }
        }
        _ => Error::Git(e),
    })?;
    Ok(object.peel_to_commit()?)
}

/// Commits recorded in `MERGE_HEAD` while a merge is uncommitted.
pub fn merge_heads(repo: &Repository) -> Result<Vec<Revision>> {
    let path = repo.path().join("MERGE_HEAD");
    if !path.exists() {
        return Ok(Vec::new());
    }
    let content = bundle_fs::read_text(&path)?;
    Ok(content
        .lines()
        .filter_map(|line| Oid::from_str(line.trim()).ok())
        .map(Revision::from)
        .collect())
}

/// Checkout options that keep unrelated local modifications.
pub fn safe_checkout() -> CheckoutBuilder<'static> {
    let mut builder = CheckoutBuilder::new();
    builder.safe();
    builder
}

/// Refresh the working tree to a local branch, then point HEAD at it.
///
/// The tree is checked out before HEAD moves so the old HEAD serves as the
/// checkout baseline.
pub fn switch_to_branch(repo: &Repository, name: &str) -> Result<()> {
    let branch = repo
        .find_branch(name, BranchType::Local)
        .map_err(|_| Error::BranchNotFound {
            name: name.to_string(),
        })?;
    let commit = branch.get().peel_to_commit()?;
    repo.checkout_tree(commit.as_object(), Some(&mut safe_checkout()))?;
    repo.set_head(&format!("refs/heads/{name}"))?;
    Ok(())
}

/// Create a local branch from `origin/<name>` with upstream tracking.
pub fn track_remote_branch(repo: &Repository, name: &str) -> Result<bool> {
    let remote_name = format!("origin/{name}");
    let Ok(remote) = repo.find_branch(&remote_name, BranchType::Remote) else {
        return Ok(false);
    };
    let commit = remote.get().peel_to_commit()?;
    let mut local = repo.branch(name, &commit, false)?;
    local.set_upstream(Some(&remote_name))?;
    tracing::debug!(branch = %name, "Created local tracking branch");
    Ok(true)
}

/// Move a local branch forward to `target` if that is a fast-forward.
pub fn fast_forward(repo: &Repository, branch: &str, target: Oid) -> Result<bool> {
    let refname = format!("refs/heads/{branch}");
    let mut reference = match repo.find_reference(&refname) {
        Ok(reference) => reference,
        Err(e) if e.code() == ErrorCode::NotFound => return Ok(false),
        Err(e) => return Err(e.into()),
    };
    let Some(current) = reference.target() else {
        return Ok(false);
    };
    if current == target {
        return Ok(false);
    }
    if !repo.graph_descendant_of(target, current)? {
        return Err(Error::CannotFastForward {
            branch: branch.to_string(),
        });
    }
    let checked_out = repo
        .head()
        .ok()
        .and_then(|head| head.name().map(|n| n == refname))
        .unwrap_or(false);
    if checked_out {
        let commit = repo.find_commit(target)?;
        repo.checkout_tree(commit.as_object(), Some(&mut safe_checkout()))?;
    }
    reference.set_target(target, "bundler: fast-forward")?;
    Ok(true)
}

/// Signature for commits and tags made by the bundler.
pub fn signature(repo: &Repository, identity: Option<(&str, &str)>) -> Result<Signature<'static>> {
    if let Some((name, email)) = identity {
        return Ok(Signature::now(name, email)?);
    }
    match repo.signature() {
        Ok(sig) => Ok(sig),
        Err(_) => Ok(Signature::now("bundler", "bundler@localhost")?),
    }
}

/// Write the tree of `commit` below `dest`.
pub fn export_tree(repo: &Repository, commit: &Commit<'_>, dest: &Path) -> Result<usize> {
    let tree = commit.tree()?;
    let mut written = 0;
    let mut failure: Option<Error> = None;

    let walked = tree.walk(TreeWalkMode::PreOrder, |dir, entry| {
        let Some(name) = entry.name() else {
            return TreeWalkResult::Skip;
        };
        let path = dest.join(dir).join(name);
        let outcome: Result<()> = match entry.kind() {
            Some(ObjectType::Tree) => {
                fs::create_dir_all(&path).map_err(|e| Error::from(bundle_fs::Error::io(&path, e)))
            }
            Some(ObjectType::Blob) => write_blob(repo, entry.id(), entry.filemode(), &path),
            // Submodule commits have nothing to export
            _ => Ok(()),
        };
        match outcome {
            Ok(()) => {
                if entry.kind() == Some(ObjectType::Blob) {
                    written += 1;
                }
                TreeWalkResult::Ok
            }
            Err(e) => {
                failure = Some(e);
                TreeWalkResult::Abort
            }
        }
    });

    // an aborted walk reports a generic git error, the cause is in `failure`
    if let Some(e) = failure {
        return Err(e);
    }
    walked?;
    Ok(written)
}

const LINK_MODE: i32 = 0o120000;
const EXEC_MODE: i32 = 0o100755;

fn write_blob(repo: &Repository, id: Oid, mode: i32, path: &Path) -> Result<()> {
    let blob = repo.find_blob(id)?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| bundle_fs::Error::io(parent, e))?;
    }

    if mode == LINK_MODE {
        let pointee = String::from_utf8_lossy(blob.content()).into_owned();
        return Ok(bundle_fs::link_dir(Path::new(&pointee), path)?);
    }

    fs::write(path, blob.content()).map_err(|e| bundle_fs::Error::io(path, e))?;
    if mode == EXEC_MODE {
        make_executable(path)?;
    }
    Ok(())
}

#[cfg(unix)]
fn make_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755))
        .map_err(|e| bundle_fs::Error::io(path, e))?;
    Ok(())
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> Result<()> {
    Ok(())
}
