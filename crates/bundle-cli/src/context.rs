//! Bundle context shared by commands
//!
//! Resolves the configuration of a bundle directory, applies the command-line
//! overrides and hands out the git provider committing under the configured
//! identity.

use std::path::{Path, PathBuf};

use bundle_core::{Bundle, BundlerConfig, ConfigResolver, ReleaseOptions};
use bundle_vcs::GitProvider;

use crate::cli::ReleaseFlags;
use crate::error::Result;

pub struct Context {
    pub bundle_dir: PathBuf,
    pub config: BundlerConfig,
    pub provider: GitProvider,
}

impl Context {
    /// Load the configuration of `bundle_dir` and apply `flags` on top.
    pub fn load(bundle_dir: &Path, flags: &ReleaseFlags) -> Result<Self> {
        let mut config = ConfigResolver::new(bundle_dir).resolve()?;
        apply_flags(&mut config, flags);
        tracing::debug!(dir = %bundle_dir.display(), ?config, "Resolved configuration");
        let provider = GitProvider::with_identity(config.identity.clone());
        Ok(Self {
            bundle_dir: bundle_dir.to_path_buf(),
            config,
            provider,
        })
    }

    /// Open and resolve the bundle.
    pub fn open_bundle(&self) -> Result<Bundle<'_>> {
        Ok(Bundle::open(&self.bundle_dir, &self.provider, self.config.clone())?)
    }

    pub fn release_options(&self) -> ReleaseOptions {
        ReleaseOptions::from(&self.config.release)
    }
}

/// Flags only ever switch settings on; an absent flag keeps the configured value.
fn apply_flags(config: &mut BundlerConfig, flags: &ReleaseFlags) {
    let release = &mut config.release;
    release.allow_multiple_heads |= flags.allow_multiple_heads;
    release.release_again |= flags.release_again;
    release.increment_major |= flags.increment_major;
    if let Some(naming) = flags.tag_naming {
        release.tag_naming = naming.into();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::TagNamingArg;
    use bundle_core::TagNaming;

    #[test]
    fn flags_override_configuration() {
        let mut config = BundlerConfig::default();
        let flags = ReleaseFlags {
            release_again: true,
            tag_naming: Some(TagNamingArg::VersionRelease),
            ..Default::default()
        };

        apply_flags(&mut config, &flags);

        assert!(config.release.release_again);
        assert!(!config.release.allow_multiple_heads);
        assert_eq!(config.release.tag_naming, TagNaming::VersionRelease);
    }

    #[test]
    fn absent_flags_keep_configuration() {
        let mut config = BundlerConfig::default();
        config.release.increment_major = true;

        apply_flags(&mut config, &ReleaseFlags::default());

        assert!(config.release.increment_major);
        assert_eq!(config.release.tag_naming, TagNaming::Version);
    }
}
