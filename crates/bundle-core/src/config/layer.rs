//! One configuration file
//!
//! Every key is optional so a layer only overrides what it sets. Layers from
//! different sources (global, bundle, local) are merged into a
//! [`BundlerConfig`](super::BundlerConfig).

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::TagNaming;
use crate::{Error, Result};

/// `[release]` section
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReleaseLayer {
    pub tag_naming: Option<TagNaming>,
    pub allow_multiple_heads: Option<bool>,
    pub increment_major: Option<bool>,
    pub release_again: Option<bool>,
    pub branch_prefix: Option<String>,
}

/// `[identity]` section
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IdentityLayer {
    pub name: Option<String>,
    pub email: Option<String>,
}

/// Parsed content of a single `bundler.toml`-style file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigLayer {
    #[serde(default)]
    pub release: ReleaseLayer,

    #[serde(default)]
    pub identity: IdentityLayer,
}

impl ConfigLayer {
    /// Parse a layer from TOML content
    ///
    /// # Example
    ///
    /// ```
    /// use bundle_core::config::ConfigLayer;
    ///
    /// let layer = ConfigLayer::parse(r#"
    /// [release]
    /// tag_naming = "version-release"
    /// "#, std::path::Path::new("bundler.toml")).unwrap();
    /// assert!(layer.release.tag_naming.is_some());
    /// ```
    pub fn parse(content: &str, origin: &Path) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config {
            path: origin.to_path_buf(),
            message: e.message().to_string(),
        })
    }

    /// Overlay `other` on top of this layer.
    pub fn merge(&mut self, other: &ConfigLayer) {
        let release = &other.release;
        if release.tag_naming.is_some() {
            self.release.tag_naming = release.tag_naming;
        }
        if release.allow_multiple_heads.is_some() {
            self.release.allow_multiple_heads = release.allow_multiple_heads;
        }
        if release.increment_major.is_some() {
            self.release.increment_major = release.increment_major;
        }
        if release.release_again.is_some() {
            self.release.release_again = release.release_again;
        }
        if release.branch_prefix.is_some() {
            self.release.branch_prefix = release.branch_prefix.clone();
        }
        if other.identity.name.is_some() {
            self.identity.name = other.identity.name.clone();
        }
        if other.identity.email.is_some() {
            self.identity.email = other.identity.email.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn later_layer_overrides_only_what_it_sets() {
        let mut base = ConfigLayer::parse(
            "[release]\nallow_multiple_heads = true\nbranch_prefix = \"rel-\"\n",
            Path::new("global"),
        )
        .unwrap();
        let local = ConfigLayer::parse("[release]\nbranch_prefix = \"local-\"\n", Path::new("local")).unwrap();

        base.merge(&local);

        assert_eq!(base.release.allow_multiple_heads, Some(true));
        assert_eq!(base.release.branch_prefix.as_deref(), Some("local-"));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let result = ConfigLayer::parse("[release]\ntag_nameing = \"version\"\n", Path::new("typo"));
        assert!(matches!(result, Err(Error::Config { .. })));
    }
}
