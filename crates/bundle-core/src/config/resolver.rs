//! Configuration resolution with layered overrides
//!
//! The `ConfigResolver` loads configuration from several files, later files
//! overriding earlier ones.

use std::path::{Path, PathBuf};

use bundle_fs::BundlePath;

use super::{BundlerConfig, ConfigLayer};
use crate::Result;

/// Resolves configuration for a bundle
///
/// Sources, in order:
/// 1. Global defaults (`<config_dir>/bundler/config.toml`)
/// 2. Bundle config (`<bundle>/bundler.toml`)
/// 3. Local overrides (`<bundle>/bundler.local.toml`), usually not versioned
pub struct ConfigResolver {
    bundle_dir: PathBuf,

    /// Override for the global config directory (used for testing).
    /// When `None`, the platform-appropriate directory is used via `dirs::config_dir()`.
    global_config_dir_override: Option<PathBuf>,
}

impl ConfigResolver {
    /// Create a resolver for the bundle at `bundle_dir`.
    ///
    /// The global config directory is platform dependent:
    /// - Linux: `~/.config/bundler/`
    /// - macOS: `~/Library/Application Support/bundler/`
    /// - Windows: `%APPDATA%\bundler\`
    pub fn new(bundle_dir: impl Into<PathBuf>) -> Self {
        Self {
            bundle_dir: bundle_dir.into(),
            global_config_dir_override: None,
        }
    }

    /// Create a resolver with a custom global config directory.
    pub fn with_global_config_dir(bundle_dir: impl Into<PathBuf>, global_config_dir: PathBuf) -> Self {
        Self {
            bundle_dir: bundle_dir.into(),
            global_config_dir_override: Some(global_config_dir),
        }
    }

    fn global_config_dir(&self) -> Option<PathBuf> {
        if let Some(ref override_dir) = self.global_config_dir_override {
            return Some(override_dir.clone());
        }
        dirs::config_dir().map(|d| d.join("bundler"))
    }

    /// Resolve the configuration by merging all sources
    ///
    /// Missing layers are skipped. Invalid TOML in any layer is an error.
    pub fn resolve(&self) -> Result<BundlerConfig> {
        let mut merged = ConfigLayer::default();

        if let Some(global_dir) = self.global_config_dir() {
            load_layer(&global_dir.join("config.toml"), "global", &mut merged)?;
        }
        load_layer(&BundlePath::Config.within(&self.bundle_dir), "bundle", &mut merged)?;
        load_layer(&BundlePath::LocalConfig.within(&self.bundle_dir), "local", &mut merged)?;

        Ok(BundlerConfig::from(merged))
    }

    pub fn bundle_dir(&self) -> &Path {
        &self.bundle_dir
    }
}

fn load_layer(path: &Path, layer: &str, merged: &mut ConfigLayer) -> Result<()> {
    if !path.is_file() {
        tracing::debug!(path = %path.display(), layer, "No config found, skipping");
        return Ok(());
    }
    tracing::debug!(path = %path.display(), layer, "Loading config");
    let content = bundle_fs::read_text(path)?;
    merged.merge(&ConfigLayer::parse(&content, path)?);
    Ok(())
}
