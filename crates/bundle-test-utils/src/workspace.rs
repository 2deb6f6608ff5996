//! [`TestWorkspace`] builder for bundle scenarios.
//!
//! Layout inside the temporary directory:
//!
//! ```text
//! origins/<Product>/     upstream product repositories
//! bundles/               shared outer working copy
//! bundles/<bundle>/      bundle directories with their manifests
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use git2::Repository;
use tempfile::TempDir;

use crate::git::{commit_all, init_repo};
use crate::product::create_product;

/// Placeholder replaced by the absolute origins path in manifests.
pub const ORIGINS_PLACEHOLDER: &str = "$ORIGINS";

/// A temporary directory holding product origins and bundles.
///
/// # Example
///
/// ```rust,no_run
/// use bundle_test_utils::product::BLANK_CHANGES;
/// use bundle_test_utils::workspace::TestWorkspace;
///
/// let ws = TestWorkspace::new();
/// ws.add_product("NeverReleased", "0.1.0", BLANK_CHANGES);
/// ws.write_bundle("bundle1", r#"<bundle><server url="$ORIGINS"><branch path="NeverReleased"/></server></bundle>"#);
/// ws.init_shared_root();
/// ```
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl Default for TestWorkspace {
    fn default() -> Self {
        Self::new()
    }
}

impl TestWorkspace {
    /// Create an empty temporary directory.
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().unwrap(),
        }
    }

    /// Return the root path of the temporary directory.
    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Directory holding the upstream product repositories.
    pub fn origins(&self) -> PathBuf {
        self.root().join("origins")
    }

    /// Create an upstream product repository.
    pub fn add_product(&self, name: &str, version: &str, changes: &str) -> PathBuf {
        let path = self.origins().join(name);
        create_product(&path, name, version, changes);
        path
    }

    /// Outer working copy holding every bundle.
    pub fn shared_root(&self) -> PathBuf {
        self.root().join("bundles")
    }

    /// Directory of the bundle called `name`.
    pub fn bundle_dir(&self, name: &str) -> PathBuf {
        self.shared_root().join(name)
    }

    /// Write a bundle manifest, expanding [`ORIGINS_PLACEHOLDER`].
    pub fn write_bundle(&self, name: &str, manifest: &str) -> PathBuf {
        let dir = self.bundle_dir(name);
        fs::create_dir_all(&dir).unwrap();
        let origins = self.origins().to_string_lossy().into_owned();
        fs::write(
            dir.join("BUNDLE_MANIFEST.xml"),
            manifest.replace(ORIGINS_PLACEHOLDER, &origins),
        )
        .unwrap();
        dir
    }

    /// Put the shared root under version control and commit every bundle.
    ///
    /// Call before cloning, nested clones must not be committed.
    pub fn init_shared_root(&self) -> Repository {
        let repo = init_repo(&self.shared_root());
        commit_all(&repo, "add bundles");
        repo
    }

    /// Assert that `path` (relative to the workspace root) exists.
    ///
    /// # Panics
    /// Panics with a descriptive message if the path does not exist.
    pub fn assert_exists(&self, path: &str) {
        let full_path = self.root().join(path);
        assert!(
            full_path.exists(),
            "Expected path to exist: {}",
            full_path.display()
        );
    }

    /// Assert that the file at `path` (relative to the workspace root) contains `content`.
    ///
    /// # Panics
    /// Panics if the file cannot be read or does not contain `content`.
    pub fn assert_file_contains(&self, path: &str, content: &str) {
        let full_path = self.root().join(path);
        let file_content = fs::read_to_string(&full_path)
            .unwrap_or_else(|_| panic!("Could not read file: {}", full_path.display()));
        assert!(
            file_content.contains(content),
            "File {} does not contain expected content.\nExpected: {}\nActual: {}",
            full_path.display(),
            content,
            file_content
        );
    }
}
