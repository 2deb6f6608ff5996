//! Release of a single branch-tracking repository
//!
//! [`decide`] is a pure function of the product's version state; everything
//! that touches the working copy lives in [`release_branch`].

use std::collections::BTreeMap;

use bundle_fs::BundlePath;
use bundle_vcs::{Revision, Vcs, VcsProvider};
use semver::Version;

use crate::config::{ReleaseSettings, TagNaming};
use crate::descriptor::RepoDescriptor;
use crate::error::ReleaseFailure;
use crate::preflight::{BranchSnapshot, check_branch};
use crate::version::{ChangeCategories, VersionState, compose_version, history_section};
use crate::{Error, Result};

pub const VERSION_COMMIT_MESSAGE: &str = "bundler prepared version files for release";
pub const CHANGES_COMMIT_MESSAGE: &str = "bundler init new CHANGES file";
pub const TAG_MESSAGE: &str = "bundler setting tag";

/// Commits a release leaves after its tag.
const BOOKKEEPING_MESSAGES: [&str; 2] = [CHANGES_COMMIT_MESSAGE, VERSION_COMMIT_MESSAGE];

/// Steps the lineage walk may skip after a tag.
const MAX_BOOKKEEPING_STEPS: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseOptions {
    pub allow_multiple_heads: bool,
    pub release_again: bool,
    pub increment_major: bool,
    pub tag_naming: TagNaming,
}

impl Default for ReleaseOptions {
    fn default() -> Self {
        Self::from(&ReleaseSettings::default())
    }
}

impl From<&ReleaseSettings> for ReleaseOptions {
    fn from(settings: &ReleaseSettings) -> Self {
        Self {
            allow_multiple_heads: settings.allow_multiple_heads,
            release_again: settings.release_again,
            increment_major: settings.increment_major,
            tag_naming: settings.tag_naming,
        }
    }
}

/// Part of the version a release increments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bump {
    /// Current version gets its first tag
    None,
    /// Same version, next release number
    Release,
    Patch,
    Minor,
    Major,
}

/// What a release of one repository amounts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Tag `tag` for `version`/`release`
    Release {
        version: String,
        release: u32,
        bump: Bump,
        tag: String,
    },
    /// Nothing changed since `tag`
    Reuse { tag: String },
}

/// Relation between an existing tag and the branch head.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lineage {
    /// No such tag
    Missing,
    /// Head is the tag, possibly followed by bookkeeping commits
    Unchanged,
    /// Real changes after the tag
    Progressed,
}

/// Compute the next release of a product.
///
/// `lineage` is only consulted when the changelog gives no reason to bump,
/// with the tag name of the current version.
pub fn decide<F>(
    target: &str,
    state: &VersionState,
    opts: &ReleaseOptions,
    branch_suffix: Option<&str>,
    lineage: F,
) -> Result<Decision>
where
    F: FnOnce(&str) -> Result<Lineage>,
{
    let fail = |reason| Error::release(target, reason);
    let overflow = || {
        fail(ReleaseFailure::InvalidVersionFile {
            file: state.marker.format.file_name().to_string(),
            message: format!("cannot increment '{}' release {}", state.version(), state.release()),
        })
    };
    let next_release = || state.release().checked_add(1).ok_or_else(overflow);

    let triple = match &state.triple {
        Some(triple) if !state.changes.is_empty() => triple,
        None if !state.changes.is_empty() => {
            return Err(fail(ReleaseFailure::InvalidVersionFile {
                file: state.marker.format.file_name().to_string(),
                message: format!("'{}' is not major.minor.patch", state.version()),
            }));
        }
        _ => {
            let current = opts.tag_naming.tag_name(state.version(), state.release());
            return match lineage(current.as_str())? {
                Lineage::Missing => Ok(release(opts, state.version(), state.release(), Bump::None)),
                Lineage::Unchanged => Ok(Decision::Reuse { tag: current }),
                Lineage::Progressed if opts.release_again => Ok(release(
                    opts,
                    state.version(),
                    next_release()?,
                    Bump::Release,
                )),
                Lineage::Progressed => Err(fail(ReleaseFailure::UnreleasedChanges { tag: current })),
            };
        }
    };

    let bump = bump_for(&state.changes, opts.increment_major);
    let bumped = |part: u64| part.checked_add(1).ok_or_else(overflow);
    let next = match bump {
        Bump::Major => Version::new(bumped(triple.major)?, 0, 0),
        Bump::Minor => Version::new(triple.major, bumped(triple.minor)?, 0),
        Bump::Patch => Version::new(triple.major, triple.minor, bumped(triple.patch)?),
        Bump::Release | Bump::None => {
            return Ok(release(opts, state.version(), next_release()?, Bump::Release));
        }
    };
    Ok(release(opts, &compose_version(&next, branch_suffix), 1, bump))
}

fn bump_for(changes: &ChangeCategories, increment_major: bool) -> Bump {
    if changes.has_minor_changes() {
        if increment_major { Bump::Major } else { Bump::Minor }
    } else if !changes.bug_fixes.is_empty() {
        Bump::Patch
    } else {
        Bump::Release
    }
}

fn release(opts: &ReleaseOptions, version: &str, release: u32, bump: Bump) -> Decision {
    Decision::Release {
        version: version.to_string(),
        release,
        bump,
        tag: opts.tag_naming.tag_name(version, release),
    }
}

/// Where `head` stands relative to `tag`.
///
/// Children of the tagged changeset made by the bundler itself are skipped.
/// Any fork along the way means someone else tagged.
pub fn lineage(
    target: &str,
    vcs: &dyn Vcs,
    tags: &BTreeMap<String, Revision>,
    tag: &str,
    head: &Revision,
) -> Result<Lineage> {
    let Some(mut node) = tags.get(tag).cloned() else {
        return Ok(Lineage::Missing);
    };

    for _ in 0..MAX_BOOKKEEPING_STEPS {
        if &node == head {
            return Ok(Lineage::Unchanged);
        }
        let children = vcs.children(&node)?;
        let child = match children.as_slice() {
            [] => return Ok(Lineage::Progressed),
            [only] => only.clone(),
            _ => {
                return Err(Error::release(
                    target,
                    ReleaseFailure::ForeignTag {
                        tag: tag.to_string(),
                    },
                ));
            }
        };
        let summary = vcs.summary(&child)?;
        if !BOOKKEEPING_MESSAGES.contains(&summary.as_str()) {
            tracing::debug!(tag, child = %child.short(), %summary, "History moved since tag");
            return Ok(Lineage::Progressed);
        }
        tracing::debug!(tag, child = %child.short(), "Skipping bookkeeping commit");
        node = child;
    }

    Ok(if &node == head {
        Lineage::Unchanged
    } else {
        Lineage::Progressed
    })
}

/// Whether the bundler manages releases of this product.
pub fn is_managed(desc: &RepoDescriptor) -> bool {
    let dir = desc.product_dir();
    BundlePath::ManagedMarker.within(&dir).exists() || BundlePath::Changes.within(&dir).is_file()
}

/// Release a branch descriptor.
///
/// Returns the tag the descriptor should be pinned to, or `None` when the
/// product is not managed by the bundler.
pub fn release_branch(
    desc: &RepoDescriptor,
    provider: &dyn VcsProvider,
    opts: &ReleaseOptions,
) -> Result<Option<String>> {
    if !is_managed(desc) {
        tracing::info!(repo = %desc.target, "Not managed by bundler, skipping release");
        return Ok(None);
    }
    let fail = |reason| Error::release(&desc.target, reason);

    let repo = desc.repo(provider)?;
    let branch = desc.branch_name(provider)?;
    let snapshot = BranchSnapshot {
        expected_branch: branch.clone(),
        state: repo.working_state()?,
        changed: repo.status()?,
        heads: repo.branch_heads(&branch)?,
    };
    let heads = check_branch(&snapshot, opts.allow_multiple_heads).map_err(fail)?;
    if heads.tolerated_heads > 0 {
        tracing::warn!(repo = %desc.target, %branch, heads = heads.tolerated_heads, tip = %heads.tip.short(), "Multiple heads, releasing from tip");
    }

    let state = VersionState::load(&desc.product_dir()).map_err(fail)?;
    let suffix = match repo.default_branch()? {
        Some(default) if default != branch => Some(branch.as_str()),
        _ => None,
    };
    let tags = repo.tags()?;
    let decision = decide(&desc.target, &state, opts, suffix, |tag| {
        lineage(&desc.target, repo, &tags, tag, &heads.tip)
    })?;

    match decision {
        Decision::Reuse { tag } => {
            tracing::info!(repo = %desc.target, %tag, "No change since last release");
            Ok(Some(tag))
        }
        Decision::Release {
            tag, bump: Bump::None, ..
        } => {
            tracing::info!(repo = %desc.target, %tag, "Tagging current version");
            repo.create_tag(&tag, TAG_MESSAGE)?;
            Ok(Some(tag))
        }
        Decision::Release {
            version,
            release,
            bump,
            tag,
        } => {
            tracing::info!(repo = %desc.target, %version, release, ?bump, %tag, "Releasing");
            write_release(desc, repo, state, &version, release)?;
            repo.commit(VERSION_COMMIT_MESSAGE)?;
            repo.create_tag(&tag, TAG_MESSAGE)?;
            bundle_fs::write_text(
                &BundlePath::Changes.within(&desc.product_dir()),
                &ChangeCategories::blank_template(),
            )?;
            repo.commit(CHANGES_COMMIT_MESSAGE)?;
            Ok(Some(tag))
        }
    }
}

/// Rewrite the version marker and prepend the release to `HISTORY`.
fn write_release(
    desc: &RepoDescriptor,
    repo: &dyn Vcs,
    state: VersionState,
    version: &str,
    release: u32,
) -> Result<()> {
    let dir = desc.product_dir();
    let mut marker = state.marker;
    marker.version = version.to_string();
    marker.release = release;
    bundle_fs::write_text(&marker.path_in(&dir), &marker.render())?;

    let history_path = BundlePath::History.within(&dir);
    let previous = if history_path.is_file() {
        bundle_fs::read_text(&history_path)?
    } else {
        String::new()
    };
    let built_on = chrono::Local::now().format("%Y-%m-%d %H:%M").to_string();
    let section = history_section(&marker, &state.changes, &built_on);
    bundle_fs::write_text(&history_path, &format!("{section}\n{previous}"))?;

    let history_file = desc.product_file(BundlePath::History.as_str());
    let marker_file = desc.product_file(marker.format.file_name());
    repo.add(&[history_file.as_str(), marker_file.as_str()])?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::version::{MarkerFormat, VersionMarker};
    use pretty_assertions::assert_eq;

    fn state(version: &str, release: u32, changes: ChangeCategories) -> VersionState {
        VersionState::new(
            VersionMarker {
                product: "Foo".into(),
                version: version.into(),
                release,
                format: MarkerFormat::KeyValue,
            },
            changes,
        )
    }

    fn bug_fixes() -> ChangeCategories {
        ChangeCategories {
            bug_fixes: vec!["Fixed a crash".into()],
            ..Default::default()
        }
    }

    fn features() -> ChangeCategories {
        ChangeCategories {
            features: vec!["Shiny".into()],
            ..Default::default()
        }
    }

    fn never_asked(_: &str) -> Result<Lineage> {
        panic!("lineage must not be consulted when the changelog decides")
    }

    fn released(version: &str, release: u32, bump: Bump) -> Decision {
        Decision::Release {
            version: version.into(),
            release,
            bump,
            tag: TagNaming::Version.tag_name(version, release),
        }
    }

    #[test]
    fn exhausted_counters_are_invalid_markers() {
        let opts = ReleaseOptions::default();
        let patch = format!("1.2.{}", u64::MAX);
        let err = decide("Foo", &state(&patch, 1, bug_fixes()), &opts, None, never_asked).unwrap_err();
        assert!(matches!(
            err,
            Error::RepoRelease { reason: ReleaseFailure::InvalidVersionFile { .. }, .. }
        ));

        let again = ReleaseOptions {
            release_again: true,
            ..ReleaseOptions::default()
        };
        let empty = ChangeCategories::default();
        let err = decide("Foo", &state("1.2.3", u32::MAX, empty), &again, None, |_| Ok(Lineage::Progressed))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::RepoRelease { reason: ReleaseFailure::InvalidVersionFile { .. }, .. }
        ));
    }

    #[test]
    fn bug_fixes_bump_patch() {
        let decision = decide("Foo", &state("1.2.3", 4, bug_fixes()), &ReleaseOptions::default(), None, never_asked).unwrap();
        assert_eq!(decision, released("1.2.4", 1, Bump::Patch));
    }

    #[test]
    fn features_bump_minor_or_major() {
        let opts = ReleaseOptions::default();
        let decision = decide("Foo", &state("1.2.3", 1, features()), &opts, None, never_asked).unwrap();
        assert_eq!(decision, released("1.3.0", 1, Bump::Minor));

        let opts = ReleaseOptions {
            increment_major: true,
            ..ReleaseOptions::default()
        };
        let decision = decide("Foo", &state("1.2.3", 1, features()), &opts, None, never_asked).unwrap();
        assert_eq!(decision, released("2.0.0", 1, Bump::Major));
    }

    #[test]
    fn requirements_and_internal_features_are_minor() {
        let changes = ChangeCategories {
            requires: vec!["Bar >= 2".into()],
            bug_fixes: vec!["Fix".into()],
            ..Default::default()
        };
        let decision = decide("Foo", &state("0.4.9", 2, changes), &ReleaseOptions::default(), None, never_asked).unwrap();
        assert_eq!(decision, released("0.5.0", 1, Bump::Minor));

        let changes = ChangeCategories {
            internal_features: vec!["Refactoring".into()],
            ..Default::default()
        };
        let decision = decide("Foo", &state("0.4.9", 2, changes), &ReleaseOptions::default(), None, never_asked).unwrap();
        assert_eq!(decision, released("0.5.0", 1, Bump::Minor));
    }

    #[test]
    fn branch_suffix_is_appended() {
        let decision = decide("Foo", &state("1.2.3-legacy", 1, bug_fixes()), &ReleaseOptions::default(), Some("legacy"), never_asked).unwrap();
        assert_eq!(decision, released("1.2.4-legacy", 1, Bump::Patch));
    }

    #[test]
    fn empty_changelog_without_tag_tags_current_version() {
        let mut asked = None;
        let decision = decide("Foo", &state("0.1.0", 1, ChangeCategories::default()), &ReleaseOptions::default(), None, |tag| {
            asked = Some(tag.to_string());
            Ok(Lineage::Missing)
        })
        .unwrap();

        assert_eq!(asked.as_deref(), Some("0.1.0"));
        assert_eq!(decision, released("0.1.0", 1, Bump::None));
    }

    #[test]
    fn empty_changelog_with_unchanged_tag_reuses_it() {
        let decision = decide("Foo", &state("1.0.0", 1, ChangeCategories::default()), &ReleaseOptions::default(), None, |_| Ok(Lineage::Unchanged)).unwrap();
        assert_eq!(decision, Decision::Reuse { tag: "1.0.0".into() });
    }

    #[test]
    fn progressed_history_needs_release_again() {
        let empty = state("1.0.0", 1, ChangeCategories::default());
        let err = decide("Foo", &empty, &ReleaseOptions::default(), None, |_| Ok(Lineage::Progressed)).unwrap_err();
        assert!(matches!(
            err,
            Error::RepoRelease { reason: ReleaseFailure::UnreleasedChanges { ref tag }, .. } if tag == "1.0.0"
        ));

        let opts = ReleaseOptions {
            release_again: true,
            ..ReleaseOptions::default()
        };
        let decision = decide("Foo", &empty, &opts, None, |_| Ok(Lineage::Progressed)).unwrap();
        assert_eq!(decision, released("1.0.0", 2, Bump::Release));
    }

    #[test]
    fn free_form_version_is_only_retagged() {
        let decision = decide("Foo", &state("trunk", 3, ChangeCategories::default()), &ReleaseOptions::default(), None, |_| Ok(Lineage::Missing)).unwrap();
        assert_eq!(decision, released("trunk", 3, Bump::None));

        let err = decide("Foo", &state("trunk", 3, features()), &ReleaseOptions::default(), None, never_asked).unwrap_err();
        assert!(matches!(
            err,
            Error::RepoRelease { reason: ReleaseFailure::InvalidVersionFile { .. }, .. }
        ));
    }

    #[test]
    fn version_release_naming() {
        let opts = ReleaseOptions {
            tag_naming: TagNaming::VersionRelease,
            ..ReleaseOptions::default()
        };
        let decision = decide("Foo", &state("1.2.3", 1, bug_fixes()), &opts, None, never_asked).unwrap();
        assert!(matches!(decision, Decision::Release { ref tag, .. } if tag == "1.2.4-1"));
    }
}
