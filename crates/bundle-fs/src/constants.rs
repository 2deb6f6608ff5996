//! Conventional file and directory names inside bundles and product clones.

use std::path::Path;

/// Well-known names the bundler reads or writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BundlePath {
    /// The bundle manifest at the root of every bundle directory
    Manifest,
    /// Hidden directory holding the shared clones of sub-path repositories
    AsideDir,
    /// Marker file flagging a repository as released by this tool
    ManagedMarker,
    /// Pending changelog of a product repository
    Changes,
    /// Accumulated release history of a product repository
    History,
    /// Changelog name used inside archives
    ArchivedChangelog,
    /// Plain version file, also written into archives
    VersionText,
    /// Archive provenance metadata written next to each archived clone
    ArchivalMetadata,
    /// Bundle-level configuration
    Config,
    /// Bundle-level configuration overrides, usually not versioned
    LocalConfig,
}

impl BundlePath {
    /// Get the string representation of the path.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Manifest => "BUNDLE_MANIFEST.xml",
            Self::AsideDir => ".bundle_aside",
            Self::ManagedMarker => ".bundler_managed",
            Self::Changes => "CHANGES",
            Self::History => "HISTORY",
            Self::ArchivedChangelog => "CHANGELOG.txt",
            Self::VersionText => "version.txt",
            Self::ArchivalMetadata => ".archival.txt",
            Self::Config => "bundler.toml",
            Self::LocalConfig => "bundler.local.toml",
        }
    }

    /// Join this name onto `dir`.
    pub fn within(&self, dir: &Path) -> std::path::PathBuf {
        dir.join(self.as_str())
    }
}

impl AsRef<Path> for BundlePath {
    fn as_ref(&self) -> &Path {
        Path::new(self.as_str())
    }
}

impl AsRef<str> for BundlePath {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl std::fmt::Display for BundlePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
