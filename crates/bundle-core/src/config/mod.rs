//! Bundler configuration
//!
//! Settings come from layered TOML files resolved by [`ConfigResolver`].
//! Command-line flags are applied on top by the caller.

mod layer;
mod resolver;

use serde::{Deserialize, Serialize};

use bundle_vcs::Identity;

pub use layer::{ConfigLayer, IdentityLayer, ReleaseLayer};
pub use resolver::ConfigResolver;

/// Default prefix of the branch a bundle release is committed on.
pub const DEFAULT_BRANCH_PREFIX: &str = "bundler-release-";

/// How product release tags are named.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TagNaming {
    /// `1.2.3`, with `-N` appended for re-releases of the same version
    #[default]
    Version,
    /// Always `1.2.3-N`
    VersionRelease,
}

impl TagNaming {
    pub fn tag_name(self, version: &str, release: u32) -> String {
        match self {
            Self::Version if release <= 1 => version.to_string(),
            Self::Version | Self::VersionRelease => format!("{version}-{release}"),
        }
    }
}

impl std::str::FromStr for TagNaming {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "version" => Ok(Self::Version),
            "version-release" => Ok(Self::VersionRelease),
            other => Err(format!(
                "unknown tag naming '{other}' (expected 'version' or 'version-release')"
            )),
        }
    }
}

/// Release behaviour
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseSettings {
    pub tag_naming: TagNaming,
    pub allow_multiple_heads: bool,
    pub increment_major: bool,
    pub release_again: bool,
    pub branch_prefix: String,
}

impl Default for ReleaseSettings {
    fn default() -> Self {
        Self {
            tag_naming: TagNaming::default(),
            allow_multiple_heads: false,
            increment_major: false,
            release_again: false,
            branch_prefix: DEFAULT_BRANCH_PREFIX.to_string(),
        }
    }
}

/// Fully resolved configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BundlerConfig {
    pub release: ReleaseSettings,
    /// Author of bookkeeping commits, the repository's own settings when `None`
    pub identity: Option<Identity>,
}

impl From<ConfigLayer> for BundlerConfig {
    fn from(layer: ConfigLayer) -> Self {
        let defaults = ReleaseSettings::default();
        let release = ReleaseSettings {
            tag_naming: layer.release.tag_naming.unwrap_or(defaults.tag_naming),
            allow_multiple_heads: layer
                .release
                .allow_multiple_heads
                .unwrap_or(defaults.allow_multiple_heads),
            increment_major: layer.release.increment_major.unwrap_or(defaults.increment_major),
            release_again: layer.release.release_again.unwrap_or(defaults.release_again),
            branch_prefix: layer.release.branch_prefix.unwrap_or(defaults.branch_prefix),
        };
        let identity = match (layer.identity.name, layer.identity.email) {
            (Some(name), Some(email)) => Some(Identity { name, email }),
            (Some(name), None) => {
                tracing::warn!(%name, "Identity without email ignored");
                None
            }
            (None, Some(_)) => {
                tracing::warn!("Identity without name ignored");
                None
            }
            (None, None) => None,
        };
        Self { release, identity }
    }
}
