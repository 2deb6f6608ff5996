//! Resolved repository entries of a bundle
//!
//! A [`RepoDescriptor`] is rebuilt on every resolution. Its only state is a
//! lazily opened handle on the working copy.

use std::cell::OnceCell;
use std::fmt;
use std::path::{Path, PathBuf};

use bundle_fs::BundlePath;
use bundle_vcs::{Revision, Vcs, VcsProvider};

use crate::manifest::{Attributes, Element, names};
use crate::server::Server;
use crate::{Error, Result};

/// Branch assumed when a working copy knows none.
pub const FALLBACK_BRANCH: &str = "default";

/// Pinned or tracking reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepoKind {
    /// Pinned to a tag
    Tag { name: String },
    /// Tracking a branch, inferred from the working copy when unnamed
    Branch { name: Option<String> },
}

/// Extraction of a sub-directory of a shared clone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubRepo {
    /// Directory inside the shared clone
    pub subpath: String,
    /// Name of the shared clone under the aside directory
    pub clone_name: String,
}

/// One repository entry of a resolved bundle.
pub struct RepoDescriptor {
    pub kind: RepoKind,
    pub remote_url: String,
    pub remote_push_url: Option<String>,
    /// Bundle-relative path, unique in a resolved bundle
    pub target: String,
    pub bundle_dir: PathBuf,
    /// Attributes of the manifest element, for writing it back
    pub attributes: Attributes,
    pub sub: Option<SubRepo>,
    pub from_include: bool,
    repo: OnceCell<Box<dyn Vcs>>,
    inferred_branch: OnceCell<String>,
}

impl fmt::Debug for RepoDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RepoDescriptor")
            .field("kind", &self.kind)
            .field("target", &self.target)
            .field("remote_url", &self.remote_url)
            .field("sub", &self.sub)
            .field("from_include", &self.from_include)
            .finish_non_exhaustive()
    }
}

impl RepoDescriptor {
    /// Build from a `tag` or `branch` element below `server`.
    pub fn from_element(server: &Server, element: &Element, bundle_dir: &Path) -> Result<Self> {
        let name = element.attr(names::NAME).map(String::from);
        let kind = match element.name.as_str() {
            names::TAG => RepoKind::Tag {
                name: name.ok_or_else(|| {
                    Error::conflict(format!(
                        "tag element without name for path {}",
                        element.attr(names::PATH).unwrap_or("<none>")
                    ))
                })?,
            },
            names::BRANCH => RepoKind::Branch { name },
            other => {
                return Err(Error::conflict(format!(
                    "unknown repository element '{other}'"
                )));
            }
        };

        let target = element_target(element)?;
        let path = element.attr(names::PATH).unwrap_or_default();
        let (remote_url, remote_push_url) = server.repo_urls(path);
        let sub = element.attr(names::SUBPATH).map(|subpath| SubRepo {
            subpath: subpath.trim_matches('/').to_string(),
            clone_name: last_segment(&remote_url).to_string(),
        });

        Ok(Self {
            kind,
            remote_url,
            remote_push_url,
            target,
            bundle_dir: bundle_dir.to_path_buf(),
            attributes: element.attributes.clone(),
            sub,
            from_include: server.from_include,
            repo: OnceCell::new(),
            inferred_branch: OnceCell::new(),
        })
    }

    pub fn is_tag(&self) -> bool {
        matches!(self.kind, RepoKind::Tag { .. })
    }

    /// Declared tag or branch name.
    pub fn declared_name(&self) -> Option<&str> {
        match &self.kind {
            RepoKind::Tag { name } => Some(name.as_str()),
            RepoKind::Branch { name } => name.as_deref(),
        }
    }

    /// Working copy path relative to the bundle directory.
    pub fn local_path_rel(&self) -> String {
        match &self.sub {
            Some(sub) => format!("{}/{}", BundlePath::AsideDir, sub.clone_name),
            None => self.target.clone(),
        }
    }

    pub fn local_path(&self) -> PathBuf {
        self.bundle_dir.join(self.local_path_rel())
    }

    /// Directory holding the product files: the working copy, or the
    /// extracted sub-directory of a shared clone.
    pub fn product_dir(&self) -> PathBuf {
        match &self.sub {
            Some(sub) => self.local_path().join(&sub.subpath),
            None => self.local_path(),
        }
    }

    /// Path of a product file relative to the working copy root.
    pub fn product_file(&self, file: &str) -> String {
        match &self.sub {
            Some(sub) => format!("{}/{file}", sub.subpath),
            None => file.to_string(),
        }
    }

    /// Relative link pointer placed at the target of a sub-repository.
    pub fn link_source(&self) -> Option<PathBuf> {
        self.sub.as_ref().map(|sub| {
            PathBuf::from(format!(
                "{}{}/{}/{}",
                bundle_fs::relative_prefix(&self.target),
                BundlePath::AsideDir,
                sub.clone_name,
                sub.subpath
            ))
        })
    }

    /// Handle on the working copy, opened on first use.
    pub fn repo(&self, provider: &dyn VcsProvider) -> Result<&dyn Vcs> {
        if let Some(repo) = self.repo.get() {
            return Ok(repo.as_ref());
        }
        let opened = provider.open(&self.local_path())?;
        Ok(self.repo.get_or_init(|| opened).as_ref())
    }

    /// Clone if missing and create the sub-repository link.
    /// Returns whether anything was created.
    pub fn make_clone(&self, provider: &dyn VcsProvider) -> Result<bool> {
        let local = self.local_path();
        let mut created = false;

        if local.exists() {
            tracing::debug!(repo = %self.target, path = %local.display(), "Ignoring existing clone");
        } else {
            let repo = provider.clone_repo(&self.remote_url, &local)?;
            if let Some(push) = &self.remote_push_url {
                repo.set_remote_urls(&self.remote_url, Some(push))?;
            }
            let _ = self.repo.set(repo);
            created = true;
        }

        if let Some(src) = self.link_source() {
            let dest = self.bundle_dir.join(&self.target);
            if std::fs::symlink_metadata(&dest).is_ok() {
                tracing::debug!(repo = %self.target, "Ignoring existing link");
            } else {
                tracing::info!(repo = %self.target, src = %src.display(), "Linking sub-repository");
                bundle_fs::link_dir(&src, &dest)?;
                created = true;
            }
        }
        Ok(created)
    }

    /// Branch tracked by this descriptor, inferring it when unnamed.
    ///
    /// A working copy with a single branch tracks that one, otherwise its
    /// default branch.
    pub fn branch_name(&self, provider: &dyn VcsProvider) -> Result<String> {
        match &self.kind {
            RepoKind::Branch { name: Some(name) } => return Ok(name.clone()),
            RepoKind::Tag { name } => return Ok(name.clone()),
            RepoKind::Branch { name: None } => {}
        }
        if let Some(name) = self.inferred_branch.get() {
            return Ok(name.clone());
        }

        let repo = self.repo(provider)?;
        let branches = repo.branches()?;
        let name = match branches.as_slice() {
            [only] => only.clone(),
            _ => repo
                .default_branch()?
                .unwrap_or_else(|| FALLBACK_BRANCH.to_string()),
        };
        if !branches.contains(&name) {
            return Err(Error::BranchNotFound {
                name,
                target: self.target.clone(),
            });
        }
        tracing::debug!(repo = %self.target, branch = %name, "Inferred branch");
        Ok(self.inferred_branch.get_or_init(|| name).clone())
    }

    /// Changeset the descriptor designates: the tag, or the branch tip.
    pub fn tip(&self, provider: &dyn VcsProvider) -> Result<Revision> {
        let repo = self.repo(provider)?;
        match &self.kind {
            RepoKind::Tag { name } => repo
                .tags()?
                .remove(name)
                .ok_or_else(|| Error::NodeNotFound { name: name.clone() }),
            RepoKind::Branch { .. } => {
                let branch = self.branch_name(provider)?;
                repo.branch_heads(&branch)?
                    .into_iter()
                    .next()
                    .ok_or_else(|| Error::BranchNotFound {
                        name: branch,
                        target: self.target.clone(),
                    })
            }
        }
    }

    /// Move the working copy to the tag or branch.
    pub fn update(&self, provider: &dyn VcsProvider) -> Result<()> {
        let name = self.branch_name(provider)?;
        tracing::info!(repo = %self.local_path_rel(), to = %name, "Updating");
        self.repo(provider)?.update_to(&name)?;
        Ok(())
    }

    /// Rewrite the working copy's remote URLs from the manifest.
    pub fn refresh_urls(&self, provider: &dyn VcsProvider) -> Result<bool> {
        let changed = self
            .repo(provider)?
            .set_remote_urls(&self.remote_url, self.remote_push_url.as_deref())?;
        if changed {
            tracing::info!(repo = %self.local_path_rel(), url = %self.remote_url, "Updated remote URLs");
        }
        Ok(changed)
    }

    /// Local changesets missing from the remote, `None` for pinned entries.
    pub fn outgoing(&self, provider: &dyn VcsProvider) -> Result<Option<usize>> {
        if self.is_tag() {
            return Ok(None);
        }
        let branch = self.branch_name(provider)?;
        Ok(Some(self.repo(provider)?.outgoing(&branch)?))
    }

    /// Pull released changesets from the same target in another bundle and update.
    pub fn pull_from(&self, other: &RepoDescriptor, provider: &dyn VcsProvider) -> Result<()> {
        tracing::info!(repo = %self.target, from = %other.local_path().display(), "Pulling released changesets");
        self.repo(provider)?.pull(&other.local_path())?;
        self.update(provider)
    }
}

/// Target declared by a repository element: the `target` attribute, else the
/// last segment of its `path`.
pub fn element_target(element: &Element) -> Result<String> {
    let path = element
        .attr(names::PATH)
        .ok_or_else(|| Error::conflict(format!("{} element without path", element.name)))?;
    let target = match element.attr(names::TARGET) {
        Some(target) => target.trim_matches('/'),
        None => last_segment(path),
    };
    if target.is_empty() {
        return Err(Error::conflict(format!("empty target for path '{path}'")));
    }
    Ok(target.to_string())
}

fn last_segment(path: &str) -> &str {
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn server() -> Server {
        Server {
            name: Some("main".into()),
            url: "http://hg.example.org".into(),
            push_url: Some("ssh://hg.example.org".into()),
            from_include: false,
        }
    }

    fn element(name: &str, attrs: &[(&str, &str)]) -> Element {
        Element::with_attributes(name, attrs.iter().copied().collect())
    }

    #[test]
    fn target_defaults_to_last_path_segment() {
        let desc = RepoDescriptor::from_element(
            &server(),
            &element("branch", &[("path", "products/Foo/")]),
            Path::new("/b"),
        )
        .unwrap();

        assert_eq!(desc.target, "Foo");
        assert_eq!(desc.remote_url, "http://hg.example.org/products/Foo/");
        assert_eq!(
            desc.remote_push_url.as_deref(),
            Some("ssh://hg.example.org/products/Foo/")
        );
        assert_eq!(desc.kind, RepoKind::Branch { name: None });
        assert_eq!(desc.local_path(), PathBuf::from("/b/Foo"));
    }

    #[test]
    fn sub_repository_lives_aside() {
        let desc = RepoDescriptor::from_element(
            &server(),
            &element(
                "tag",
                &[("path", "mono"), ("name", "1.0"), ("subpath", "libs/core"), ("target", "deps/core")],
            ),
            Path::new("/b"),
        )
        .unwrap();

        let sub = desc.sub.as_ref().unwrap();
        assert_eq!(sub.clone_name, "mono");
        assert_eq!(desc.local_path_rel(), ".bundle_aside/mono");
        assert_eq!(desc.product_dir(), PathBuf::from("/b/.bundle_aside/mono/libs/core"));
        assert_eq!(desc.product_file("CHANGES"), "libs/core/CHANGES");
        assert_eq!(
            desc.link_source(),
            Some(PathBuf::from("../.bundle_aside/mono/libs/core"))
        );
    }

    #[test]
    fn tag_without_name_is_rejected() {
        let result = RepoDescriptor::from_element(
            &server(),
            &element("tag", &[("path", "Foo")]),
            Path::new("/b"),
        );
        assert!(matches!(result, Err(Error::ManifestConflict { .. })));
    }

    #[test]
    fn unknown_element_is_rejected() {
        let result = RepoDescriptor::from_element(
            &server(),
            &element("trunk", &[("path", "Foo")]),
            Path::new("/b"),
        );
        assert!(matches!(result, Err(Error::ManifestConflict { .. })));
    }

    #[test]
    fn explicit_target_is_trimmed() {
        let el = element("branch", &[("path", "products/Foo"), ("target", "/libs/foo/")]);
        assert_eq!(element_target(&el).unwrap(), "libs/foo");
        assert!(element_target(&element("branch", &[("name", "x")])).is_err());
    }
}
