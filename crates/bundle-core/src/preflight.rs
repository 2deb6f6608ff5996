//! Release preconditions as pure functions of working copy observations

use bundle_vcs::{Revision, WorkingState};

use crate::error::ReleaseFailure;

/// Everything the branch preconditions look at.
#[derive(Debug, Clone)]
pub struct BranchSnapshot {
    pub expected_branch: String,
    pub state: WorkingState,
    /// Tracked paths with uncommitted modifications
    pub changed: Vec<String>,
    /// Heads of the expected branch, tip first
    pub heads: Vec<Revision>,
}

/// Outcome of a passed head check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadCheck {
    /// Changeset releases are computed from
    pub tip: Revision,
    /// Several heads were tolerated
    pub tolerated_heads: usize,
}

/// Working copy must be on the expected branch without local modifications.
pub fn check_clean(
    expected: &str,
    current: Option<&str>,
    changed: &[String],
) -> Result<(), ReleaseFailure> {
    if current != Some(expected) {
        return Err(ReleaseFailure::WrongBranch {
            expected: expected.to_string(),
            found: current.unwrap_or("(detached)").to_string(),
        });
    }
    if !changed.is_empty() {
        return Err(ReleaseFailure::LocalChanges {
            paths: changed.to_vec(),
        });
    }
    Ok(())
}

/// The branch needs a head, a single one unless tolerated, and the working
/// copy must sit on one of them.
pub fn check_heads(
    branch: &str,
    heads: &[Revision],
    current: &Revision,
    allow_multiple: bool,
) -> Result<HeadCheck, ReleaseFailure> {
    let Some(tip) = heads.first() else {
        return Err(ReleaseFailure::NoHead {
            branch: branch.to_string(),
        });
    };
    if heads.len() > 1 && !allow_multiple {
        return Err(ReleaseFailure::MultipleHeads { count: heads.len() });
    }
    if !heads.contains(current) {
        return Err(ReleaseFailure::NotAHead);
    }
    Ok(HeadCheck {
        tip: tip.clone(),
        tolerated_heads: if heads.len() > 1 { heads.len() } else { 0 },
    })
}

/// Every branch precondition, in order.
pub fn check_branch(snapshot: &BranchSnapshot, allow_multiple: bool) -> Result<HeadCheck, ReleaseFailure> {
    check_clean(
        &snapshot.expected_branch,
        snapshot.state.branch.as_deref(),
        &snapshot.changed,
    )?;
    let current = snapshot
        .state
        .single_parent()
        .ok_or(ReleaseFailure::SeveralParents)?;
    check_heads(&snapshot.expected_branch, &snapshot.heads, current, allow_multiple)
}

/// A pinned working copy must be exactly at its tag, outside any merge.
pub fn check_pinned(
    tag: &str,
    parents: &[Revision],
    tag_node: Option<&Revision>,
) -> Result<(), ReleaseFailure> {
    let [current] = parents else {
        return Err(ReleaseFailure::SeveralParents);
    };
    if tag_node != Some(current) {
        return Err(ReleaseFailure::NotAtTag {
            tag: tag.to_string(),
        });
    }
    Ok(())
}
