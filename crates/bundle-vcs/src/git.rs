//! Git implementation of the backend traits

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use git2::{
    BranchType, DiffFormat, DiffOptions, ErrorCode, ObjectType, Repository, ResetType, Status,
    StatusOptions,
};

use crate::helpers;
use crate::{Error, Result, Revision, Vcs, VcsProvider, WorkingState};

/// Namespace holding branches fetched by [`Vcs::pull`].
const PULL_NAMESPACE: &str = "refs/remotes/bundler-pull";

/// Author recorded on commits and tags the bundler makes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub name: String,
    pub email: String,
}

/// One git working copy.
pub struct GitBackend {
    root: PathBuf,
    repo: Repository,
    identity: Option<Identity>,
}

impl GitBackend {
    /// Open the repository whose working tree is rooted at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        let repo = Repository::open(path).map_err(|e| not_found_or(e, path))?;
        Ok(Self::from_repository(repo, path))
    }

    /// Open the repository enclosing `path`.
    pub fn discover(path: &Path) -> Result<Self> {
        let repo = Repository::discover(path).map_err(|e| not_found_or(e, path))?;
        Ok(Self::from_repository(repo, path))
    }

    /// Clone `url` into `dest`.
    pub fn clone_from(url: &str, dest: &Path) -> Result<Self> {
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(|e| bundle_fs::Error::io(parent, e))?;
        }
        let repo = Repository::clone(url, dest).map_err(|e| Error::CloneFailed {
            url: url.to_string(),
            dest: dest.to_path_buf(),
            message: e.message().to_string(),
        })?;
        Ok(Self::from_repository(repo, dest))
    }

    /// Record commits and tags under this identity instead of git configuration.
    pub fn with_identity(mut self, identity: Option<Identity>) -> Self {
        self.identity = identity;
        self
    }

    fn from_repository(repo: Repository, fallback: &Path) -> Self {
        let root = repo
            .workdir()
            .map(canonical_or)
            .unwrap_or_else(|| fallback.to_path_buf());
        Self {
            root,
            repo,
            identity: None,
        }
    }

    fn signature(&self) -> Result<git2::Signature<'static>> {
        let identity = self
            .identity
            .as_ref()
            .map(|id| (id.name.as_str(), id.email.as_str()));
        helpers::signature(&self.repo, identity)
    }

    fn head_commit(&self) -> Result<git2::Commit<'_>> {
        let head = self.repo.head().map_err(|e| match e.code() {
            ErrorCode::UnbornBranch | ErrorCode::NotFound => Error::NoCheckout {
                path: self.root.clone(),
            },
            _ => Error::Git(e),
        })?;
        Ok(head.peel_to_commit()?)
    }
}

fn canonical_or(dir: &Path) -> PathBuf {
    bundle_fs::canonical(dir).unwrap_or_else(|_| dir.to_path_buf())
}

fn not_found_or(e: git2::Error, path: &Path) -> Error {
    if e.code() == ErrorCode::NotFound {
        Error::RepoNotFound {
            path: path.to_path_buf(),
        }
    } else {
        Error::Git(e)
    }
}

impl Vcs for GitBackend {
    fn root(&self) -> &Path {
        &self.root
    }

    fn working_state(&self) -> Result<WorkingState> {
        let head = self.repo.head().map_err(|_| Error::NoCheckout {
            path: self.root.clone(),
        })?;
        let node = Revision::from(head.peel_to_commit()?.id());
        let branch = if head.is_branch() {
            head.shorthand().map(String::from)
        } else {
            None
        };
        let mut parents = vec![node.clone()];
        parents.extend(helpers::merge_heads(&self.repo)?);
        Ok(WorkingState {
            node,
            parents,
            branch,
        })
    }

    fn status(&self) -> Result<Vec<String>> {
        let mut opts = StatusOptions::new();
        opts.include_untracked(false)
            .include_ignored(false)
            .exclude_submodules(true);
        let statuses = self.repo.statuses(Some(&mut opts))?;
        Ok(statuses
            .iter()
            .filter(|entry| {
                let status = entry.status();
                !status.is_empty() && !status.intersects(Status::IGNORED | Status::WT_NEW)
            })
            .filter_map(|entry| entry.path().map(String::from))
            .collect())
    }

    fn tags(&self) -> Result<BTreeMap<String, Revision>> {
        let mut tags = BTreeMap::new();
        for name in self.repo.tag_names(None)?.iter().flatten() {
            let reference = self.repo.find_reference(&format!("refs/tags/{name}"))?;
            match reference.peel_to_commit() {
                Ok(commit) => {
                    tags.insert(name.to_string(), Revision::from(commit.id()));
                }
                Err(e) => tracing::debug!(tag = %name, error = %e, "Skipping tag not pointing to a commit"),
            }
        }
        Ok(tags)
    }

    fn branches(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in self.repo.branches(None)? {
            let (branch, kind) = entry?;
            let Some(name) = branch.name()? else {
                continue;
            };
            let name = match kind {
                BranchType::Local => name.to_string(),
                BranchType::Remote => match name.split_once('/') {
                    Some((_, rest)) if rest != "HEAD" && !name.starts_with("bundler-pull/") => {
                        rest.to_string()
                    }
                    _ => continue,
                },
            };
            names.push(name);
        }
        names.sort();
        names.dedup();
        Ok(names)
    }

    fn default_branch(&self) -> Result<Option<String>> {
        if let Ok(reference) = self.repo.find_reference("refs/remotes/origin/HEAD")
            && let Some(target) = reference.symbolic_target()
            && let Some(name) = target.strip_prefix("refs/remotes/origin/")
        {
            return Ok(Some(name.to_string()));
        }
        match self.repo.head() {
            Ok(head) if head.is_branch() => Ok(head.shorthand().map(String::from)),
            _ => Ok(None),
        }
    }

    fn branch_heads(&self, name: &str) -> Result<Vec<Revision>> {
        let found = self
            .repo
            .find_branch(name, BranchType::Local)
            .or_else(|_| {
                self.repo
                    .find_branch(&format!("origin/{name}"), BranchType::Remote)
            });
        match found {
            Ok(branch) => Ok(vec![Revision::from(branch.get().peel_to_commit()?.id())]),
            Err(_) => Ok(Vec::new()),
        }
    }

    fn children(&self, rev: &Revision) -> Result<Vec<Revision>> {
        let parent = git2::Oid::from_str(rev.as_str())?;
        let mut walk = self.repo.revwalk()?;
        walk.push_glob("refs/heads/*")?;
        walk.push_glob("refs/remotes/*")?;
        walk.hide(parent)?;

        let mut children = Vec::new();
        for oid in walk {
            let commit = self.repo.find_commit(oid?)?;
            if commit.parent_ids().any(|id| id == parent) {
                children.push(Revision::from(commit.id()));
            }
        }
        children.sort();
        Ok(children)
    }

    fn summary(&self, rev: &Revision) -> Result<String> {
        let commit = helpers::peel_revision(&self.repo, rev.as_str())?;
        Ok(commit.summary().unwrap_or_default().to_string())
    }

    fn update_to(&self, rev: &str) -> Result<()> {
        if self.repo.find_branch(rev, BranchType::Local).is_ok()
            || helpers::track_remote_branch(&self.repo, rev)?
        {
            tracing::debug!(root = %self.root.display(), branch = %rev, "Switching branch");
            return helpers::switch_to_branch(&self.repo, rev);
        }

        let commit = helpers::peel_revision(&self.repo, rev)?;
        tracing::debug!(root = %self.root.display(), rev = %rev, "Detached checkout");
        self.repo
            .checkout_tree(commit.as_object(), Some(&mut helpers::safe_checkout()))?;
        self.repo.set_head_detached(commit.id())?;
        Ok(())
    }

    fn pull(&self, source: &Path) -> Result<()> {
        let url = source.to_string_lossy();
        let mut remote = self.repo.remote_anonymous(&url)?;
        let heads = format!("+refs/heads/*:{PULL_NAMESPACE}/*");
        remote.fetch(&[heads.as_str(), "+refs/tags/*:refs/tags/*"], None, None)?;

        let prefix = format!("{PULL_NAMESPACE}/");
        let mut pulled = Vec::new();
        for reference in self.repo.references_glob(&format!("{PULL_NAMESPACE}/*"))? {
            let reference = reference?;
            if let (Some(name), Some(target)) = (reference.name(), reference.target())
                && let Some(branch) = name.strip_prefix(&prefix)
            {
                pulled.push((branch.to_string(), target));
            }
        }

        for (branch, target) in pulled {
            if helpers::fast_forward(&self.repo, &branch, target)? {
                tracing::debug!(branch = %branch, rev = %target, "Fast-forwarded after pull");
            }
        }
        Ok(())
    }

    fn add(&self, paths: &[&str]) -> Result<()> {
        let mut index = self.repo.index()?;
        for path in paths {
            index.add_path(Path::new(path))?;
        }
        index.write()?;
        Ok(())
    }

    fn commit(&self, message: &str) -> Result<Revision> {
        let mut index = self.repo.index()?;
        index.update_all(["*"], None)?;
        index.write()?;
        let tree = self.repo.find_tree(index.write_tree()?)?;
        let sig = self.signature()?;

        let parent = self.head_commit()?;
        let oid = self
            .repo
            .commit(Some("HEAD"), &sig, &sig, message, &tree, &[&parent])?;
        tracing::debug!(root = %self.root.display(), rev = %oid, "Committed");
        Ok(Revision::from(oid))
    }

    fn create_tag(&self, name: &str, message: &str) -> Result<()> {
        let target = self.repo.head()?.peel(ObjectType::Commit)?;
        let sig = self.signature()?;
        self.repo.tag(name, &target, &sig, message, false)?;
        Ok(())
    }

    fn create_branch(&self, name: &str) -> Result<()> {
        let commit = self.head_commit()?;
        self.repo.branch(name, &commit, false)?;
        self.repo.set_head(&format!("refs/heads/{name}"))?;
        Ok(())
    }

    fn close_branch(&self, name: &str) -> Result<bool> {
        tracing::debug!(branch = %name, "git branches cannot be closed, leaving it open");
        Ok(false)
    }

    fn revert_all(&self) -> Result<()> {
        let head = self.repo.head()?.peel(ObjectType::Commit)?;
        self.repo.reset(&head, ResetType::Hard, None)?;
        Ok(())
    }

    fn diff(&self, from: &str, to: &str, path: &str) -> Result<Vec<String>> {
        let old = helpers::peel_revision(&self.repo, from)?.tree()?;
        let new = helpers::peel_revision(&self.repo, to)?.tree()?;
        let mut opts = DiffOptions::new();
        opts.pathspec(path);
        let diff = self
            .repo
            .diff_tree_to_tree(Some(&old), Some(&new), Some(&mut opts))?;

        let mut lines = Vec::new();
        diff.print(DiffFormat::Patch, |_delta, _hunk, line| {
            let content = String::from_utf8_lossy(line.content());
            match line.origin() {
                origin @ ('+' | '-' | ' ') => {
                    lines.push(format!("{origin}{}", content.trim_end_matches(['\r', '\n'])));
                }
                _ => lines.extend(content.lines().map(String::from)),
            }
            true
        })?;
        Ok(lines)
    }

    fn archive_to(&self, dest: &Path, rev: &str) -> Result<()> {
        let commit = helpers::peel_revision(&self.repo, rev)?;
        fs::create_dir_all(dest).map_err(|e| bundle_fs::Error::io(dest, e))?;
        let written = helpers::export_tree(&self.repo, &commit, dest)?;

        let metadata = format!(
            "repo: {}\nnode: {}\n",
            self.root.display(),
            commit.id()
        );
        bundle_fs::write_text(
            &bundle_fs::BundlePath::ArchivalMetadata.within(dest),
            &metadata,
        )?;
        tracing::debug!(dest = %dest.display(), rev = %rev, written, "Archived");
        Ok(())
    }

    fn set_remote_urls(&self, url: &str, push_url: Option<&str>) -> Result<bool> {
        let mut changed = false;
        let (current_url, current_push) = match self.repo.find_remote("origin") {
            Ok(remote) => (
                remote.url().map(String::from),
                remote.pushurl().map(String::from),
            ),
            Err(_) => {
                self.repo.remote("origin", url)?;
                changed = true;
                (Some(url.to_string()), None)
            }
        };
        if current_url.as_deref() != Some(url) {
            self.repo.remote_set_url("origin", url)?;
            changed = true;
        }
        if current_push.as_deref() != push_url {
            self.repo.remote_set_pushurl("origin", push_url)?;
            changed = true;
        }
        Ok(changed)
    }

    fn outgoing(&self, branch: &str) -> Result<usize> {
        let Ok(local) = self.repo.find_branch(branch, BranchType::Local) else {
            return Ok(0);
        };
        let Some(tip) = local.get().target() else {
            return Ok(0);
        };
        let mut walk = self.repo.revwalk()?;
        walk.push(tip)?;
        if let Ok(remote) = self
            .repo
            .find_branch(&format!("origin/{branch}"), BranchType::Remote)
            && let Some(remote_tip) = remote.get().target()
        {
            walk.hide(remote_tip)?;
        }
        let mut count = 0;
        for oid in walk {
            oid?;
            count += 1;
        }
        Ok(count)
    }
}

/// Hands out [`GitBackend`]s sharing one commit identity.
#[derive(Debug, Clone, Default)]
pub struct GitProvider {
    identity: Option<Identity>,
}

impl GitProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_identity(identity: Option<Identity>) -> Self {
        Self { identity }
    }
}

impl VcsProvider for GitProvider {
    fn open(&self, path: &Path) -> Result<Box<dyn Vcs>> {
        Ok(Box::new(
            GitBackend::open(path)?.with_identity(self.identity.clone()),
        ))
    }

    fn discover(&self, path: &Path) -> Result<Box<dyn Vcs>> {
        Ok(Box::new(
            GitBackend::discover(path)?.with_identity(self.identity.clone()),
        ))
    }

    fn clone_repo(&self, url: &str, dest: &Path) -> Result<Box<dyn Vcs>> {
        tracing::info!(url = %url, dest = %dest.display(), "Cloning");
        Ok(Box::new(
            GitBackend::clone_from(url, dest)?.with_identity(self.identity.clone()),
        ))
    }
}
