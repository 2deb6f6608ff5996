//! Manifest resolution
//!
//! Resolution happens in two phases. Expansion builds a new document in
//! which every `include-bundles` element is replaced by the servers of the
//! included manifests, followed by an inert `already-included-bundles`
//! marker. [`collect`] then turns the top-level servers of that document into
//! an ordered, duplicate-free list of descriptors.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use bundle_fs::BundlePath;
use bundle_vcs::VcsProvider;

use crate::descriptor::{RepoDescriptor, element_target};
use crate::manifest::{Element, ManifestDoc, Node, names};
use crate::server::Server;
use crate::{Error, Result};

/// Outcome of resolving a bundle's manifest.
#[derive(Debug)]
pub struct ResolvedBundle {
    /// Manifest with every inclusion performed
    pub document: ManifestDoc,
    /// Deliverable repositories, in document order
    pub descriptors: Vec<RepoDescriptor>,
    /// Repositories of the included bundles themselves
    pub sub_bundles: Vec<RepoDescriptor>,
}

/// Resolve the manifest of the bundle in `bundle_dir`.
///
/// Bundles listed in `include-bundles` elements are cloned or updated on the way.
pub fn resolve(bundle_dir: &Path, provider: &dyn VcsProvider) -> Result<ResolvedBundle> {
    let manifest_path = manifest_of(bundle_dir)?;
    let document = ManifestDoc::load(&manifest_path)?;

    let mut inclusion = Inclusion {
        provider,
        stack: Vec::new(),
        sub_bundles: Vec::new(),
    };
    let root = inclusion.expand(&document.root, bundle_dir)?;
    let document = ManifestDoc::new(root);
    let descriptors = collect(&document, bundle_dir)?;

    tracing::debug!(
        bundle = %bundle_dir.display(),
        repos = descriptors.len(),
        included = inclusion.sub_bundles.len(),
        "Resolved manifest"
    );
    Ok(ResolvedBundle {
        document,
        descriptors,
        sub_bundles: inclusion.sub_bundles,
    })
}

fn manifest_of(bundle_dir: &Path) -> Result<PathBuf> {
    let path = BundlePath::Manifest.within(bundle_dir);
    if !path.is_file() {
        return Err(Error::NotABundle {
            path: bundle_dir.to_path_buf(),
        });
    }
    Ok(path)
}

/// Accumulator of one expansion pass.
struct Inclusion<'a> {
    provider: &'a dyn VcsProvider,
    /// Remote URLs of the bundles being included, outermost first
    stack: Vec<String>,
    sub_bundles: Vec<RepoDescriptor>,
}

impl Inclusion<'_> {
    /// Copy of `root` with its `include-bundles` performed.
    fn expand(&mut self, root: &Element, bundle_dir: &Path) -> Result<Element> {
        let mut expanded = Element::with_attributes(root.name.clone(), root.attributes.clone());

        for node in &root.children {
            let Node::Element(element) = node else {
                expanded.children.push(node.clone());
                continue;
            };
            match element.name.as_str() {
                names::SERVER => expanded.push(element.clone()),
                names::INCLUDED_MARKER => {
                    let (_, bundles) = include_entries(element, bundle_dir)?;
                    self.sub_bundles.extend(bundles);
                    expanded.push(element.clone());
                }
                names::INCLUDE_BUNDLES => {
                    let (excluded, bundles) = include_entries(element, bundle_dir)?;
                    for bundle in &bundles {
                        bundle.make_clone(self.provider)?;
                        bundle.update(self.provider)?;
                        for server in self.included_servers(bundle, &excluded)? {
                            expanded.push(server);
                        }
                    }
                    self.sub_bundles.extend(bundles);

                    let mut marker = element.clone();
                    marker.name = names::INCLUDED_MARKER.to_string();
                    expanded.push(marker);
                }
                other => {
                    return Err(Error::conflict(format!(
                        "unknown manifest element '{other}'"
                    )));
                }
            }
        }
        Ok(expanded)
    }

    /// Servers of the bundle checked out for `include`, marked as included
    /// and without the excluded targets.
    fn included_servers(
        &mut self,
        include: &RepoDescriptor,
        excluded: &BTreeSet<String>,
    ) -> Result<Vec<Element>> {
        if self.stack.contains(&include.remote_url) {
            return Err(Error::conflict(format!(
                "include cycle through bundle '{}' ({})",
                include.target, include.remote_url
            )));
        }
        let dir = include.bundle_dir.join(&include.target);
        let manifest_path = manifest_of(&dir)?;

        tracing::info!(bundle = %include.target, "Including bundle");
        self.stack.push(include.remote_url.clone());
        let document = ManifestDoc::load(&manifest_path)?;
        let root = self.expand(&document.root, &dir);
        self.stack.pop();
        let root = root?;

        let mut servers = Vec::new();
        for server in root.elements().filter(|e| e.name == names::SERVER) {
            let mut spliced = Element::with_attributes(server.name.clone(), server.attributes.clone());
            spliced.attributes.set(names::FROM_INCLUDE, "true");
            for node in &server.children {
                if let Node::Element(repo) = node
                    && is_repo_element(repo)
                {
                    let target = element_target(repo)?;
                    if excluded.contains(&target) {
                        tracing::info!(bundle = %include.target, repo = %target, "Excluding target from included bundle");
                        continue;
                    }
                }
                spliced.children.push(node.clone());
            }
            servers.push(spliced);
        }
        Ok(servers)
    }
}

fn is_repo_element(element: &Element) -> bool {
    element.name == names::TAG || element.name == names::BRANCH
}

/// Excluded targets and included bundle repositories of an
/// `include-bundles` (or marker) element.
fn include_entries(
    element: &Element,
    bundle_dir: &Path,
) -> Result<(BTreeSet<String>, Vec<RepoDescriptor>)> {
    let server = Server::from_attributes(&element.attributes)?;
    let mut excluded = BTreeSet::new();
    let mut bundles = Vec::new();
    for child in element.elements() {
        if child.name == names::EXCLUDE {
            let target = child.attr(names::TARGET).ok_or_else(|| {
                Error::conflict("exclude element without target")
            })?;
            excluded.insert(target.trim_matches('/').to_string());
        } else {
            bundles.push(RepoDescriptor::from_element(&server, child, bundle_dir)?);
        }
    }
    Ok((excluded, bundles))
}

/// Descriptors of the top-level servers of an expanded document.
///
/// Remaining `include-bundles` elements are ignored.
pub fn collect(document: &ManifestDoc, bundle_dir: &Path) -> Result<Vec<RepoDescriptor>> {
    let mut found = Vec::new();
    for element in document.root.elements() {
        match element.name.as_str() {
            names::SERVER => {
                let server = Server::from_attributes(&element.attributes)?;
                for repo in element.elements() {
                    found.push(RepoDescriptor::from_element(&server, repo, bundle_dir)?);
                }
            }
            names::INCLUDE_BUNDLES | names::INCLUDED_MARKER => {}
            other => {
                return Err(Error::conflict(format!(
                    "unknown manifest element '{other}'"
                )));
            }
        }
    }
    merge_descriptors(found)
}

/// Keep one descriptor per target.
///
/// A top-level declaration beats an included one: an included duplicate
/// arriving later is dropped, and a top-level one arriving later replaces
/// the included one at its own position. Same provenance is a conflict.
pub fn merge_descriptors(descriptors: Vec<RepoDescriptor>) -> Result<Vec<RepoDescriptor>> {
    let mut slots: Vec<Option<RepoDescriptor>> = Vec::with_capacity(descriptors.len());
    let mut positions: HashMap<String, usize> = HashMap::new();

    for desc in descriptors {
        let Some(&at) = positions.get(&desc.target) else {
            positions.insert(desc.target.clone(), slots.len());
            slots.push(Some(desc));
            continue;
        };
        let existing_included = slots[at].as_ref().is_some_and(|e| e.from_include);
        match (existing_included, desc.from_include) {
            (false, true) => {
                tracing::debug!(repo = %desc.target, "Top-level declaration wins over include");
            }
            (true, false) => {
                tracing::debug!(repo = %desc.target, "Top-level declaration replaces included one");
                slots[at] = None;
                positions.insert(desc.target.clone(), slots.len());
                slots.push(Some(desc));
            }
            _ => {
                return Err(Error::conflict(format!(
                    "target '{}' declared more than once",
                    desc.target
                )));
            }
        }
    }
    Ok(slots.into_iter().flatten().collect())
}
