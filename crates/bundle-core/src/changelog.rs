//! Changelog between two releases of a bundle

use std::collections::BTreeMap;
use std::fmt::Write as _;

use bundle_fs::BundlePath;

use crate::bundle::Bundle;
use crate::descriptor::RepoKind;
use crate::version::{ChangeCategories, Section};
use crate::Result;

/// A product pinned to different tags by the two releases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangedProduct {
    pub target: String,
    pub from: String,
    pub to: String,
}

/// Differences between two bundle releases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleChangelog {
    pub from_tag: String,
    pub to_tag: String,
    pub new_products: Vec<String>,
    pub removed_products: Vec<String>,
    pub changed_products: Vec<ChangedProduct>,
    /// History entries of changed products, prefixed by their target
    pub changes: ChangeCategories,
}

/// Pinned tag of every target, `None` for branch entries.
type Snapshot = Vec<(String, Option<String>)>;

impl Bundle<'_> {
    /// Compare the releases `from_tag` and `to_tag` of this bundle.
    ///
    /// The bundle working copy is brought back to its initial state afterwards.
    pub fn changelog(&mut self, from_tag: &str, to_tag: &str) -> Result<BundleChangelog> {
        let initial = self.initial_state()?;
        let compared = self.compare(from_tag, to_tag);
        let restored = self.return_to(&initial);
        let compared = compared?;
        restored?;
        Ok(compared)
    }

    fn compare(&mut self, from_tag: &str, to_tag: &str) -> Result<BundleChangelog> {
        self.update_to_tag(from_tag)?;
        let before = self.snapshot();
        self.update_to_tag(to_tag)?;
        let after = self.snapshot();

        let before_map: BTreeMap<&str, Option<&str>> = before
            .iter()
            .map(|(target, tag)| (target.as_str(), tag.as_deref()))
            .collect();
        let after_map: BTreeMap<&str, Option<&str>> = after
            .iter()
            .map(|(target, tag)| (target.as_str(), tag.as_deref()))
            .collect();

        let mut log = BundleChangelog {
            from_tag: from_tag.to_string(),
            to_tag: to_tag.to_string(),
            new_products: Vec::new(),
            removed_products: before
                .iter()
                .filter(|(target, _)| !after_map.contains_key(target.as_str()))
                .map(|(target, _)| target.clone())
                .collect(),
            changed_products: Vec::new(),
            changes: ChangeCategories::default(),
        };

        for (target, tag) in &after {
            let Some(previous) = before_map.get(target.as_str()) else {
                log.new_products.push(target.clone());
                continue;
            };
            let (Some(from), Some(to)) = (*previous, tag.as_deref()) else {
                tracing::info!(repo = %target, "Not pinned in both releases, skipping");
                continue;
            };
            if from == to {
                tracing::debug!(repo = %target, "Unchanged");
                continue;
            }
            log.changes
                .extend(self.history_between(target, from, to)?.prefixed(target));
            log.changed_products.push(ChangedProduct {
                target: target.clone(),
                from: from.to_string(),
                to: to.to_string(),
            });
        }
        Ok(log)
    }

    fn snapshot(&self) -> Snapshot {
        self.descriptors()
            .iter()
            .map(|desc| {
                let tag = match &desc.kind {
                    RepoKind::Tag { name } => Some(name.clone()),
                    RepoKind::Branch { .. } => None,
                };
                (desc.target.clone(), tag)
            })
            .collect()
    }

    /// Changelog entries added to `HISTORY` between two product tags.
    fn history_between(&self, target: &str, from: &str, to: &str) -> Result<ChangeCategories> {
        let desc = self.descriptor(target)?;
        if desc.make_clone(self.provider())? {
            desc.update(self.provider())?;
        }
        let history = desc.product_file(BundlePath::History.as_str());
        let patch = desc.repo(self.provider())?.diff(from, to, &history)?;
        let added: Vec<&str> = patch
            .iter()
            .filter(|line| line.starts_with('+') && !line.starts_with("++"))
            .map(|line| &line[1..])
            .collect();
        Ok(ChangeCategories::parse(&added.join("\n")))
    }
}

impl BundleChangelog {
    /// reStructuredText rendering.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let title = format!(
            "CHANGELOG between bundles tags {} and {}",
            self.from_tag, self.to_tag
        );
        let rule = "=".repeat(title.len());
        let _ = writeln!(out, "{rule}\n{title}\n{rule}\n");
        let _ = writeln!(out, "New tag: {}", self.to_tag);
        let _ = writeln!(out, "Old tag: {}", self.from_tag);

        if !self.new_products.is_empty() {
            section(&mut out, "New products", '-');
            for target in &self.new_products {
                let _ = writeln!(out, "* {target}");
            }
        }
        if !self.removed_products.is_empty() {
            section(&mut out, "Removed products", '-');
            for target in &self.removed_products {
                let _ = writeln!(out, "* {target}");
            }
        }
        if !self.changed_products.is_empty() {
            section(&mut out, "Changed products", '-');
            for product in &self.changed_products {
                let _ = writeln!(out, "* {} {} -> {}", product.target, product.from, product.to);
            }
        }
        for bucket in Section::ALL {
            let entries = self.changes.bucket(bucket);
            if entries.is_empty() {
                continue;
            }
            section(&mut out, bucket.title(), '~');
            for entry in entries {
                let _ = writeln!(out, "* {entry}");
            }
        }
        out
    }
}

fn section(out: &mut String, title: &str, underline: char) {
    let _ = writeln!(
        out,
        "\n{title}\n{}\n",
        underline.to_string().repeat(title.len())
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_only_non_empty_sections() {
        let log = BundleChangelog {
            from_tag: "R1".into(),
            to_tag: "R2".into(),
            new_products: vec!["Baz".into()],
            removed_products: Vec::new(),
            changed_products: vec![ChangedProduct {
                target: "Foo".into(),
                from: "1.2.3".into(),
                to: "1.3.0".into(),
            }],
            changes: ChangeCategories {
                features: vec!["[Foo] Shiny".into()],
                ..Default::default()
            },
        };

        let text = log.render();

        assert!(text.starts_with("====="));
        assert!(text.contains("New tag: R2\nOld tag: R1\n"));
        assert!(text.contains("New products\n------------\n\n* Baz\n"));
        assert!(!text.contains("Removed products"));
        assert!(text.contains("* Foo 1.2.3 -> 1.3.0"));
        assert!(text.contains("* [Foo] Shiny"));
        assert!(!text.contains("Bug fixes"));
        assert!(text.contains("New features\n~~~~~~~~~~~~\n\n* [Foo] Shiny\n"));
    }
}
