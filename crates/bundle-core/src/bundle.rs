//! A bundle directory: its resolved manifest and its own working copy

use std::cell::OnceCell;
use std::path::{Path, PathBuf};

use bundle_fs::BundlePath;
use bundle_vcs::{Vcs, VcsProvider, WorkingState};
use serde::Serialize;

use crate::config::BundlerConfig;
use crate::descriptor::RepoDescriptor;
use crate::manifest::ManifestDoc;
use crate::resolver::{self, ResolvedBundle};
use crate::{Error, Result};

/// Outgoing changesets of one clone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Outgoing {
    pub path: String,
    pub changesets: usize,
}

/// A resolved bundle.
///
/// The working copy enclosing the bundle directory is opened on first use.
pub struct Bundle<'p> {
    dir: PathBuf,
    provider: &'p dyn VcsProvider,
    config: BundlerConfig,
    resolved: ResolvedBundle,
    repo: OnceCell<Box<dyn Vcs>>,
}

impl<'p> Bundle<'p> {
    /// Open and resolve the bundle in `dir`.
    pub fn open(dir: &Path, provider: &'p dyn VcsProvider, config: BundlerConfig) -> Result<Self> {
        if !BundlePath::Manifest.within(dir).is_file() {
            return Err(Error::NotABundle {
                path: dir.to_path_buf(),
            });
        }
        let dir = bundle_fs::canonical(dir)?;
        let resolved = resolver::resolve(&dir, provider)?;
        Ok(Self {
            dir,
            provider,
            config,
            resolved,
            repo: OnceCell::new(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn provider(&self) -> &'p dyn VcsProvider {
        self.provider
    }

    pub fn config(&self) -> &BundlerConfig {
        &self.config
    }

    pub fn manifest_path(&self) -> PathBuf {
        BundlePath::Manifest.within(&self.dir)
    }

    /// Deliverable repositories, in manifest order.
    pub fn descriptors(&self) -> &[RepoDescriptor] {
        &self.resolved.descriptors
    }

    /// Repositories of included bundles.
    pub fn sub_bundles(&self) -> &[RepoDescriptor] {
        &self.resolved.sub_bundles
    }

    /// Manifest with inclusions performed.
    pub fn document(&self) -> &ManifestDoc {
        &self.resolved.document
    }

    pub fn document_mut(&mut self) -> &mut ManifestDoc {
        &mut self.resolved.document
    }

    pub fn descriptor(&self, target: &str) -> Result<&RepoDescriptor> {
        self.find(target).ok_or_else(|| Error::TargetNotFound {
            target: target.to_string(),
        })
    }

    pub fn find(&self, target: &str) -> Option<&RepoDescriptor> {
        self.resolved.descriptors.iter().find(|d| d.target == target)
    }

    /// Resolve the manifest again, as currently on disk.
    pub fn reload(&mut self) -> Result<()> {
        self.resolved = resolver::resolve(&self.dir, self.provider)?;
        Ok(())
    }

    /// Write the in-memory manifest back to disk.
    pub fn write_manifest(&self) -> Result<()> {
        let path = self.manifest_path();
        tracing::debug!(path = %path.display(), "Writing manifest");
        self.resolved.document.save(&path)
    }

    /// Working copy holding the bundle itself.
    pub fn repo(&self) -> Result<&dyn Vcs> {
        if let Some(repo) = self.repo.get() {
            return Ok(repo.as_ref());
        }
        let opened = self.provider.discover(&self.dir).map_err(|e| match e {
            bundle_vcs::Error::RepoNotFound { path } => Error::RepoNotFound { path },
            other => other.into(),
        })?;
        tracing::info!(root = %opened.root().display(), "Found bundle repository");
        Ok(self.repo.get_or_init(|| opened).as_ref())
    }

    /// Current state of the bundle's working copy, outside any merge.
    pub fn initial_state(&self) -> Result<WorkingState> {
        let state = self.repo()?.working_state()?;
        if state.single_parent().is_none() {
            return Err(Error::bundle("bundle working copy has several parents (uncommitted merge?)"));
        }
        tracing::debug!(node = %state.node.short(), branch = ?state.branch, "Bundle working copy state");
        Ok(state)
    }

    /// Update the bundle's working copy to a bundle tag and resolve again.
    pub fn update_to_tag(&mut self, tag: &str) -> Result<()> {
        let repo = self.repo()?;
        let Some(node) = repo.tags()?.remove(tag) else {
            return Err(Error::NodeNotFound {
                name: tag.to_string(),
            });
        };
        tracing::info!(%tag, node = %node.short(), "Updating bundle to tag");
        repo.update_to(tag)?;
        self.reload()
    }

    /// Put the bundle's working copy back where `state` was taken.
    pub fn return_to(&mut self, state: &WorkingState) -> Result<()> {
        return_to(self.repo()?, state)?;
        self.reload()
    }

    /// Clone every repository that is missing, updating the new ones.
    /// Returns how many clones or links were created.
    pub fn make_clones(&self) -> Result<usize> {
        let mut created = 0;
        for desc in self.descriptors() {
            if desc.make_clone(self.provider)? {
                desc.update(self.provider)?;
                created += 1;
            }
        }
        Ok(created)
    }

    /// Update every clone to its tag or branch.
    pub fn update_clones(&self) -> Result<()> {
        for desc in self.descriptors() {
            desc.update(self.provider)?;
        }
        Ok(())
    }

    /// Rewrite remote URLs of every clone from the manifest.
    /// Returns how many clones changed.
    pub fn refresh_urls(&self) -> Result<usize> {
        let mut changed = 0;
        for desc in self.sub_bundles().iter().chain(self.descriptors()) {
            if desc.refresh_urls(self.provider)? {
                changed += 1;
            }
        }
        Ok(changed)
    }

    /// Paths of every clone relative to the bundle, included bundles first.
    pub fn clones_list(&self) -> Vec<String> {
        self.sub_bundles()
            .iter()
            .chain(self.descriptors())
            .map(|desc| self.relative(desc))
            .collect()
    }

    /// Local changesets missing from the remotes of branch clones.
    pub fn clones_out(&self) -> Result<Vec<Outgoing>> {
        let mut report = Vec::new();
        for desc in self.sub_bundles().iter().chain(self.descriptors()) {
            let Some(changesets) = desc.outgoing(self.provider)? else {
                continue;
            };
            let path = self.relative(desc);
            if changesets > 0 {
                tracing::warn!(%path, changesets, url = %desc.remote_url, "Changesets not pushed");
            } else {
                tracing::debug!(%path, "Nothing outgoing");
            }
            report.push(Outgoing { path, changesets });
        }
        Ok(report)
    }

    /// Pull `targets` from the same targets of `from`, then update.
    ///
    /// Targets this bundle does not declare are skipped.
    pub fn pull_clones<S: AsRef<str>>(&self, from: &Bundle<'_>, targets: &[S]) -> Result<()> {
        for target in targets {
            let target = target.as_ref();
            let Some(ours) = self.find(target) else {
                tracing::debug!(repo = %target, bundle = %self.dir.display(), "Target not in bundle");
                continue;
            };
            ours.pull_from(from.descriptor(target)?, self.provider)?;
        }
        Ok(())
    }

    fn relative(&self, desc: &RepoDescriptor) -> String {
        let local = desc.local_path();
        match local.strip_prefix(&self.dir) {
            Ok(rel) => rel.display().to_string(),
            Err(_) => local.display().to_string(),
        }
    }
}

pub(crate) fn return_to(repo: &dyn Vcs, state: &WorkingState) -> Result<()> {
    let rev = state.branch.as_deref().unwrap_or(state.node.as_str());
    tracing::info!(%rev, "Getting back to initial state");
    repo.update_to(rev)?;
    Ok(())
}
