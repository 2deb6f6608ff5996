//! Version state of a product: marker file plus pending changelog

mod changes;
mod history;
mod marker;

use std::path::Path;
use std::sync::LazyLock;

use bundle_fs::BundlePath;
use regex::Regex;
use semver::Version;

use crate::error::ReleaseFailure;

pub use changes::{ChangeCategories, Section};
pub use history::history_section;
pub use marker::{MarkerFormat, VersionMarker};

/// Everything a release decision reads from a product directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionState {
    pub marker: VersionMarker,
    /// Parsed `major.minor.patch`, `None` when the version is free-form
    pub triple: Option<Version>,
    pub changes: ChangeCategories,
}

impl VersionState {
    /// Read the marker and `CHANGES` of a product directory.
    pub fn load(dir: &Path) -> Result<Self, ReleaseFailure> {
        let marker = VersionMarker::find(dir)?.ok_or_else(|| ReleaseFailure::MissingFile {
            file: "version marker (VERSION, version.toml or version.txt)".to_string(),
        })?;
        let changes_path = BundlePath::Changes.within(dir);
        let changes = std::fs::read_to_string(&changes_path).map_err(|_| {
            ReleaseFailure::MissingFile {
                file: BundlePath::Changes.to_string(),
            }
        })?;
        Ok(Self::new(marker, ChangeCategories::parse(&changes)))
    }

    pub fn new(marker: VersionMarker, changes: ChangeCategories) -> Self {
        let triple = parse_triple(&marker.version);
        Self {
            marker,
            triple,
            changes,
        }
    }

    pub fn version(&self) -> &str {
        &self.marker.version
    }

    pub fn release(&self) -> u32 {
        self.marker.release
    }
}

static TRIPLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)\.(\d+)\.(\d+)(?:-(.+))?$").unwrap());

/// Numeric `major.minor.patch` of a version string, ignoring a branch suffix.
pub fn parse_triple(version: &str) -> Option<Version> {
    let captures = TRIPLE.captures(version.trim())?;
    let number = |i: usize| captures.get(i)?.as_str().parse::<u64>().ok();
    Some(Version::new(number(1)?, number(2)?, number(3)?))
}

/// Version string for `triple`, with the branch name appended off the default branch.
pub fn compose_version(triple: &Version, branch_suffix: Option<&str>) -> String {
    let base = format!("{}.{}.{}", triple.major, triple.minor, triple.patch);
    match branch_suffix {
        Some(branch) => format!("{base}-{branch}"),
        None => base,
    }
}
