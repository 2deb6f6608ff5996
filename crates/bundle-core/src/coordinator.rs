//! Bundle-level releases
//!
//! A bundle release releases every branch repository, pins the manifest to
//! the resulting tags and records that manifest on a release branch of the
//! bundle's own working copy, tagged with the release name.
//!
//! Several bundles living in one working copy can be released together.
//! Repositories they share are released once and pulled into the others so
//! every bundle pins the same changesets.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use bundle_vcs::{Vcs, VcsProvider, WorkingState, ref_component};

use crate::bundle::{self, Bundle};
use crate::config::BundlerConfig;
use crate::descriptor::{RepoKind, element_target};
use crate::manifest::{Element, names};
use crate::preflight::check_pinned;
use crate::releaser::{self, ReleaseOptions, TAG_MESSAGE};
use crate::{Error, Result};

pub const MANIFEST_COMMIT_MESSAGE: &str = "bundler update manifest for release";

/// Which parts of the bundle protocol to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReleaseMode {
    /// Check the bundle working copy and release name first
    pub check: bool,
    /// Commit and tag the rewritten manifest
    pub commit: bool,
}

impl Default for ReleaseMode {
    fn default() -> Self {
        Self {
            check: true,
            commit: true,
        }
    }
}

/// Targets pinned by a release, with their tags.
pub type Released = BTreeMap<String, String>;

/// Name of the branch the manifest of release `name` is committed on.
pub fn release_branch_name(prefix: &str, name: &str) -> String {
    format!("{prefix}{}", ref_component(name))
}

/// Bundle working copy checks shared by every release.
///
/// Returns the state to come back to afterwards.
pub fn release_preflight(repo: &dyn Vcs, name: &str, branch_prefix: &str) -> Result<WorkingState> {
    let state = repo.working_state()?;
    if state.single_parent().is_none() {
        return Err(Error::bundle("bundle working copy has several parents (uncommitted merge?)"));
    }
    let dirty = repo.status()?;
    if !dirty.is_empty() {
        return Err(Error::bundle(format!(
            "uncommitted changes in bundle working copy: {}",
            dirty.join(", ")
        )));
    }
    if repo.tags()?.contains_key(name) {
        return Err(Error::bundle(format!("there is already a release '{name}'")));
    }
    let branch = release_branch_name(branch_prefix, name);
    if repo.branches()?.contains(&branch) {
        return Err(Error::bundle(format!(
            "there is already a release branch '{branch}'"
        )));
    }
    Ok(state)
}

/// Record the rewritten manifests: release branch, commit, tag, close, go back.
pub fn commit_release(
    repo: &dyn Vcs,
    name: &str,
    branch_prefix: &str,
    initial: &WorkingState,
) -> Result<()> {
    let branch = release_branch_name(branch_prefix, name);
    tracing::info!(%branch, release = %name, "Committing release");
    repo.create_branch(&branch)?;
    repo.commit(MANIFEST_COMMIT_MESSAGE)?;
    repo.create_tag(name, TAG_MESSAGE)?;
    if !repo.close_branch(&branch)? {
        tracing::debug!(%branch, "Backend cannot close branches, leaving release branch open");
    }
    bundle::return_to(repo, initial)
}

/// Put the bundle working copy back after a failed release and hand back `err`.
///
/// A release branch already created stays behind.
fn rollback(repo: &dyn Vcs, initial: &WorkingState, err: Error) -> Error {
    tracing::error!(error = %err, "Release failed, reverting");
    let reverted = repo
        .revert_all()
        .map_err(Error::from)
        .and_then(|()| bundle::return_to(repo, initial));
    if let Err(revert) = reverted {
        tracing::error!(
            root = %repo.root().display(),
            error = %revert,
            "Cannot revert bundle working copy, fix it by hand"
        );
    }
    err
}

impl Bundle<'_> {
    /// Release the bundle under `name`.
    ///
    /// Any repository failure aborts before the manifest is touched.
    pub fn release(&mut self, name: &str, opts: &ReleaseOptions, mode: ReleaseMode) -> Result<Released> {
        let prefix = self.config().release.branch_prefix.clone();
        let initial = if mode.check || mode.commit {
            let repo = self.repo()?;
            Some(if mode.check {
                release_preflight(repo, name, &prefix)?
            } else {
                self.initial_state()?
            })
        } else {
            None
        };

        let released = self.release_repos(opts)?;
        self.pin_manifest(&released)?;
        self.write_manifest()?;

        if mode.commit
            && let Some(initial) = &initial
        {
            let repo = self.repo()?;
            commit_release(repo, name, &prefix, initial)
                .map_err(|err| rollback(repo, initial, err))?;
            self.reload()?;
        }
        Ok(released)
    }

    /// Release every branch repository and check every pinned one.
    fn release_repos(&self, opts: &ReleaseOptions) -> Result<Released> {
        let mut released = Released::new();
        for desc in self.descriptors() {
            match &desc.kind {
                RepoKind::Tag { name } => {
                    tracing::info!(repo = %desc.target, tag = %name, "Pinned to a tag, just checking");
                    let repo = desc.repo(self.provider())?;
                    let state = repo.working_state()?;
                    let tags = repo.tags()?;
                    check_pinned(name, &state.parents, tags.get(name))
                        .map_err(|reason| Error::release(&desc.target, reason))?;
                }
                RepoKind::Branch { .. } => {
                    if let Some(tag) = releaser::release_branch(desc, self.provider(), opts)? {
                        released.insert(desc.target.clone(), tag);
                    }
                }
            }
        }
        Ok(released)
    }

    /// Turn `branch` elements of released targets into `tag` elements.
    fn pin_manifest(&mut self, released: &Released) -> Result<()> {
        let document = self.document_mut();
        for server in document.root.elements_mut().filter(|e| e.name == names::SERVER) {
            for repo in server.elements_mut().filter(|e| e.name == names::BRANCH) {
                let target = element_target(repo)?;
                if let Some(tag) = released.get(&target) {
                    pin_element(repo, tag);
                }
            }
        }
        Ok(())
    }

    /// Discard uncommitted modifications of the bundle's working copy.
    pub fn release_abort(&self) -> Result<()> {
        let repo = self.repo()?;
        tracing::warn!(root = %repo.root().display(), "Reverting bundle working copy");
        repo.revert_all()?;
        Ok(())
    }

    /// Release one repository of the bundle on its own.
    ///
    /// A pinned repository is only checked.
    pub fn release_clone(&self, target: &str, opts: &ReleaseOptions) -> Result<Option<String>> {
        let desc = self.descriptor(target)?;
        match &desc.kind {
            RepoKind::Tag { name } => {
                let repo = desc.repo(self.provider())?;
                let state = repo.working_state()?;
                check_pinned(name, &state.parents, repo.tags()?.get(name))
                    .map_err(|reason| Error::release(target, reason))?;
                Ok(Some(name.clone()))
            }
            RepoKind::Branch { .. } => {
                let tag = releaser::release_branch(desc, self.provider(), opts)?;
                if let Some(tag) = &tag {
                    tracing::warn!(
                        repo = %desc.local_path_rel(),
                        %tag,
                        push = %desc.remote_push_url.as_deref().unwrap_or(&desc.remote_url),
                        "Release done, you may want to push"
                    );
                }
                Ok(tag)
            }
        }
    }
}

fn pin_element(element: &mut Element, tag: &str) {
    element.name = names::TAG.to_string();
    element.attributes.set(names::NAME, tag);
}

/// Release several bundles of one working copy as a single release.
///
/// Bundles are released in order. Targets released by a bundle are pulled
/// into the remaining bundles declaring them. On failure the working copy is
/// reverted and brought back to where it started.
pub fn release_multiple(
    dirs: &[PathBuf],
    name: &str,
    provider: &dyn VcsProvider,
    config: &BundlerConfig,
    opts: &ReleaseOptions,
) -> Result<BTreeMap<PathBuf, Released>> {
    let Some(first) = dirs.first() else {
        return Err(Error::bundle("no bundle to release"));
    };
    let shared = shared_root(dirs, provider)?;
    tracing::info!(root = %shared.root().display(), bundles = dirs.len(), "Releasing bundles together");
    let prefix = &config.release.branch_prefix;
    let initial = release_preflight(shared.as_ref(), name, prefix)?;

    let mut bundles = Vec::with_capacity(dirs.len());
    for dir in dirs {
        let bundle = Bundle::open(dir, provider, config.clone())?;
        bundle.make_clones()?;
        bundles.push(bundle);
    }

    let no_commit = ReleaseMode {
        check: false,
        commit: false,
    };
    let mut outcome = BTreeMap::new();
    let attempt = (|| -> Result<()> {
        for i in 0..bundles.len() {
            let released = bundles[i].release(name, opts, no_commit)?;
            let targets: Vec<&String> = released.keys().collect();
            for later in &bundles[i + 1..] {
                later.pull_clones(&bundles[i], &targets)?;
            }
            outcome.insert(bundles[i].dir().to_path_buf(), released);
        }
        Ok(())
    })();

    if let Err(err) = attempt {
        return Err(rollback(shared.as_ref(), &initial, err));
    }

    commit_release(shared.as_ref(), name, prefix, &initial)
        .map_err(|err| rollback(shared.as_ref(), &initial, err))?;
    tracing::info!(release = %name, first = %first.display(), "Multiple bundle release done");
    Ok(outcome)
}

/// Working copy enclosing every bundle directory.
fn shared_root(dirs: &[PathBuf], provider: &dyn VcsProvider) -> Result<Box<dyn Vcs>> {
    let mut shared: Option<Box<dyn Vcs>> = None;
    for dir in dirs {
        let repo = discover(dir, provider)?;
        match &shared {
            None => shared = Some(repo),
            Some(root) if root.root() == repo.root() => {}
            Some(root) => {
                return Err(Error::bundle(format!(
                    "{} and {} are not in the same repository",
                    root.root().display(),
                    repo.root().display()
                )));
            }
        }
    }
    shared.ok_or_else(|| Error::bundle("no bundle to release"))
}

fn discover(dir: &Path, provider: &dyn VcsProvider) -> Result<Box<dyn Vcs>> {
    provider.discover(dir).map_err(|e| match e {
        bundle_vcs::Error::RepoNotFound { path } => Error::RepoNotFound { path },
        other => other.into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::Attributes;

    #[test]
    fn release_branch_is_prefixed_and_sanitized() {
        assert_eq!(release_branch_name("bundler-release-", "TEST"), "bundler-release-TEST");
        assert!(!release_branch_name("bundler-release-", "my release").contains(' '));
    }

    #[test]
    fn pinning_keeps_other_attributes() {
        let mut element = Element::with_attributes(
            names::BRANCH,
            [("path", "products/Foo"), ("name", "stable"), ("target", "Foo")]
                .into_iter()
                .collect::<Attributes>(),
        );

        pin_element(&mut element, "1.3.0");

        assert_eq!(element.name, "tag");
        assert_eq!(element.attr("name"), Some("1.3.0"));
        assert_eq!(element.attr("path"), Some("products/Foo"));
        assert_eq!(element.attr("target"), Some("Foo"));
    }

    #[test]
    fn no_bundle_is_an_error() {
        let provider = bundle_vcs::GitProvider::new();
        let err = release_multiple(&[], "TEST", &provider, &BundlerConfig::default(), &ReleaseOptions::default())
            .unwrap_err();
        assert!(matches!(err, Error::BundleRelease { .. }));
    }
}
