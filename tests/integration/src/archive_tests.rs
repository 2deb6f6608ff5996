//! Archives and changelogs of released bundles

use std::fs;
use std::path::PathBuf;

use bundle_core::{Bundle, BundlerConfig, Error, ReleaseMode, ReleaseOptions};
use bundle_test_utils::git::{commit_all, write_file};
use bundle_test_utils::product::{BLANK_CHANGES, changes_with_feature, changes_with_fix};
use bundle_test_utils::workspace::TestWorkspace;
use bundle_vcs::GitProvider;
use pretty_assertions::assert_eq;
use tempfile::TempDir;

const BUNDLE: &str = r#"<bundle>
  <server url="$ORIGINS">
    <branch path="NeverReleased"/>
    <branch path="ToRelease"/>
  </server>
</bundle>
"#;

fn released_workspace(provider: &GitProvider) -> (TestWorkspace, PathBuf) {
    let ws = TestWorkspace::new();
    ws.add_product("NeverReleased", "0.1.0", BLANK_CHANGES);
    ws.add_product("ToRelease", "1.2.3", &changes_with_feature("Shiny widget"));
    let dir = ws.write_bundle("bundle1", BUNDLE);
    ws.init_shared_root();

    let mut bundle = Bundle::open(&dir, provider, BundlerConfig::default()).unwrap();
    bundle.make_clones().unwrap();
    bundle
        .release("R1", &ReleaseOptions::default(), ReleaseMode::default())
        .unwrap();
    (ws, dir)
}

mod archive_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn archive_exports_products_with_version_files() {
        let provider = GitProvider::new();
        let (ws, dir) = released_workspace(&provider);
        let out = TempDir::new().unwrap();
        let output = out.path().join("bundle1-R1");
        let mut bundle = Bundle::open(&dir, &provider, BundlerConfig::default()).unwrap();

        let written = bundle.archive("R1", &output).unwrap();

        let version = fs::read_to_string(written.join("version.txt")).unwrap();
        assert!(version.starts_with("R1\n"));
        assert!(version.contains("bundle bundle1 tag R1"));

        let product = written.join("ToRelease");
        assert!(product.join("src/main.txt").is_file());
        assert!(product.join("CHANGELOG.txt").is_file());
        assert!(!product.join("CHANGES").exists());
        assert!(!product.join("HISTORY").exists());
        assert_eq!(
            fs::read_to_string(product.join("version.txt")).unwrap(),
            "1.3.0-1\n\n"
        );
        assert!(!product.join(".git").exists());

        // bundle working copy is back on its branch with the unpinned manifest
        ws.assert_file_contains("bundles/bundle1/BUNDLE_MANIFEST.xml", r#"<branch path="ToRelease"/>"#);
    }

    #[test]
    fn existing_output_is_refused() {
        let provider = GitProvider::new();
        let (_ws, dir) = released_workspace(&provider);
        let out = TempDir::new().unwrap();
        let mut bundle = Bundle::open(&dir, &provider, BundlerConfig::default()).unwrap();

        let err = bundle.archive("R1", out.path()).unwrap_err();

        assert!(matches!(err, Error::ArchiveExists { .. }));
    }

    #[test]
    fn unknown_release_is_a_missing_node() {
        let provider = GitProvider::new();
        let (_ws, dir) = released_workspace(&provider);
        let out = TempDir::new().unwrap();
        let mut bundle = Bundle::open(&dir, &provider, BundlerConfig::default()).unwrap();

        let err = bundle.archive("NOPE", &out.path().join("x")).unwrap_err();

        assert!(matches!(err, Error::NodeNotFound { ref name } if name == "NOPE"));
        assert!(!out.path().join("x").exists());
    }
}

mod changelog_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn changelog_collects_history_of_changed_products() {
        let provider = GitProvider::new();
        let (_ws, dir) = released_workspace(&provider);
        let clone = dir.join("ToRelease");
        write_file(&clone, "CHANGES", &changes_with_fix("Crash on empty input"));
        commit_all(&git2::Repository::open(&clone).unwrap(), "fix crash");
        let mut bundle = Bundle::open(&dir, &provider, BundlerConfig::default()).unwrap();
        bundle
            .release("R2", &ReleaseOptions::default(), ReleaseMode::default())
            .unwrap();

        let log = bundle.changelog("R1", "R2").unwrap();

        assert!(log.new_products.is_empty());
        assert!(log.removed_products.is_empty());
        assert_eq!(log.changed_products.len(), 1);
        assert_eq!(log.changed_products[0].target, "ToRelease");
        assert_eq!(log.changed_products[0].from, "1.3.0");
        assert_eq!(log.changed_products[0].to, "1.3.1");
        assert_eq!(log.changes.bug_fixes, vec!["[ToRelease] Crash on empty input"]);
        assert!(log.changes.features.is_empty());

        let text = log.render();
        assert!(text.contains("CHANGELOG between bundles tags R1 and R2"));
        assert!(text.contains("* ToRelease 1.3.0 -> 1.3.1"));
    }
}
