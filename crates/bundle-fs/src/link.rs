//! Relative directory links used to materialise sub-path repositories.

use std::fs;
use std::path::Path;

use crate::{Error, Result};

/// Prefix climbing from the directory containing `target` back to the bundle root.
///
/// `target` is a bundle-relative path using `/` separators; `"a/b/c"` yields
/// `"../../"`, a top-level target yields an empty prefix.
pub fn relative_prefix(target: &str) -> String {
    let depth = target
        .trim_matches('/')
        .split('/')
        .filter(|segment| !segment.is_empty())
        .count();
    "../".repeat(depth.saturating_sub(1))
}

/// Create a directory symlink at `dest` pointing to `src`.
///
/// `src` is stored verbatim, so relative pointers stay relative. Missing
/// parents of `dest` are created.
pub fn link_dir(src: &Path, dest: &Path) -> Result<()> {
    if fs::symlink_metadata(dest).is_ok() {
        return Err(Error::LinkExists {
            dest: dest.to_path_buf(),
        });
    }
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }
    tracing::debug!(src = %src.display(), dest = %dest.display(), "Creating link");
    symlink(src, dest).map_err(|e| Error::io(dest, e))
}

#[cfg(unix)]
fn symlink(src: &Path, dest: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(src, dest)
}

#[cfg(windows)]
fn symlink(src: &Path, dest: &Path) -> std::io::Result<()> {
    std::os::windows::fs::symlink_dir(src, dest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("Repo", "")]
    #[case("products/Repo", "../")]
    #[case("a/b/c", "../../")]
    #[case("/a/b/", "../")]
    fn prefix_climbs_to_bundle_root(#[case] target: &str, #[case] expected: &str) {
        assert_eq!(relative_prefix(target), expected);
    }
}
