//! End-to-end bundle releases against real git repositories
//!
//! Every scenario builds upstream product repositories, one or more bundles
//! inside a shared working copy, clones the products and releases.

use std::path::{Path, PathBuf};

use bundle_core::manifest::{ManifestDoc, names};
use bundle_core::{
    Bundle, BundlerConfig, Error, ReleaseMode, ReleaseOptions, Released, release_multiple,
};
use bundle_test_utils::git::{dirty_paths, file_at, head_id, tag_head, tag_target};
use bundle_test_utils::product::{BLANK_CHANGES, changes_with_feature};
use bundle_test_utils::workspace::TestWorkspace;
use bundle_vcs::GitProvider;
use pretty_assertions::assert_eq;

const BUNDLE1: &str = r#"<bundle>
  <server name="origins" url="$ORIGINS">
    <branch path="NeverReleased"/>
    <branch path="AlreadyReleased"/>
    <branch path="ToRelease"/>
  </server>
</bundle>
"#;

const BUNDLE2: &str = r#"<bundle>
  <server name="origins" url="$ORIGINS">
    <branch path="ToRelease"/>
    <branch path="NeverReleased"/>
  </server>
</bundle>
"#;

/// Three products: never released, already tagged, and with a pending feature.
fn products(ws: &TestWorkspace) {
    ws.add_product("NeverReleased", "0.1.0", BLANK_CHANGES);
    let already = ws.add_product("AlreadyReleased", "1.0.0", BLANK_CHANGES);
    tag_head(&git2::Repository::open(already).unwrap(), "1.0.0");
    ws.add_product("ToRelease", "1.2.3", &changes_with_feature("Shiny widget"));
}

fn pinned(ws: &TestWorkspace, tag: &str, bundle: &str) -> Vec<(String, String)> {
    let recorded = file_at(
        &ws.shared_root(),
        tag,
        &format!("{bundle}/BUNDLE_MANIFEST.xml"),
    );
    let doc = ManifestDoc::parse(&recorded, Path::new("recorded.xml")).unwrap();
    doc.root
        .elements()
        .filter(|e| e.name == names::SERVER)
        .flat_map(|server| server.elements())
        .map(|e| {
            assert_eq!(e.name, names::TAG, "unpinned entry in release {tag}");
            (
                e.attr(names::PATH).unwrap_or_default().to_string(),
                e.attr(names::NAME).unwrap_or_default().to_string(),
            )
        })
        .collect()
}

fn pairs(entries: &[(&str, &str)]) -> Vec<(String, String)> {
    entries
        .iter()
        .map(|(a, b)| (a.to_string(), b.to_string()))
        .collect()
}

mod single_bundle {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn release_pins_every_product() {
        let ws = TestWorkspace::new();
        products(&ws);
        let dir = ws.write_bundle("bundle1", BUNDLE1);
        ws.init_shared_root();
        let provider = GitProvider::new();
        let mut bundle = Bundle::open(&dir, &provider, BundlerConfig::default()).unwrap();
        bundle.make_clones().unwrap();

        let released = bundle
            .release("TEST", &ReleaseOptions::default(), ReleaseMode::default())
            .unwrap();

        let expected: Released = [
            ("AlreadyReleased", "1.0.0"),
            ("NeverReleased", "0.1.0"),
            ("ToRelease", "1.3.0"),
        ]
        .into_iter()
        .map(|(t, tag)| (t.to_string(), tag.to_string()))
        .collect();
        assert_eq!(released, expected);
        assert_eq!(
            pinned(&ws, "TEST", "bundle1"),
            pairs(&[
                ("NeverReleased", "0.1.0"),
                ("AlreadyReleased", "1.0.0"),
                ("ToRelease", "1.3.0"),
            ])
        );
        assert!(dirty_paths(&ws.shared_root()).is_empty());
        assert_eq!(
            file_at(&dir.join("ToRelease"), "1.3.0", "VERSION"),
            "NAME=ToRelease\nVERSION=1.3.0\nRELEASE=1\n"
        );
    }

    #[test]
    fn later_release_reuses_unchanged_products() {
        let ws = TestWorkspace::new();
        products(&ws);
        let dir = ws.write_bundle("bundle1", BUNDLE1);
        ws.init_shared_root();
        let provider = GitProvider::new();
        let mut bundle = Bundle::open(&dir, &provider, BundlerConfig::default()).unwrap();
        bundle.make_clones().unwrap();
        let opts = ReleaseOptions::default();

        let first = bundle.release("R1", &opts, ReleaseMode::default()).unwrap();
        let second = bundle.release("R2", &opts, ReleaseMode::default()).unwrap();

        assert_eq!(first, second);
        assert_eq!(pinned(&ws, "R1", "bundle1"), pinned(&ws, "R2", "bundle1"));
    }

    #[test]
    fn uncommitted_bundle_changes_refuse_the_release() {
        let ws = TestWorkspace::new();
        products(&ws);
        let dir = ws.write_bundle("bundle1", BUNDLE1);
        ws.init_shared_root();
        let manifest = dir.join("BUNDLE_MANIFEST.xml");
        let edited = format!("{}<!-- half-finished edit -->\n", std::fs::read_to_string(&manifest).unwrap());
        std::fs::write(&manifest, &edited).unwrap();
        let provider = GitProvider::new();
        let mut bundle = Bundle::open(&dir, &provider, BundlerConfig::default()).unwrap();
        bundle.make_clones().unwrap();

        let err = bundle
            .release("R1", &ReleaseOptions::default(), ReleaseMode::default())
            .unwrap_err();

        assert!(matches!(err, Error::BundleRelease { .. }), "unexpected error: {err}");
        assert!(err.to_string().contains("bundle1/BUNDLE_MANIFEST.xml"));
        assert!(tag_target(&ws.shared_root(), "R1").is_none());
        assert!(tag_target(&dir.join("ToRelease"), "1.3.0").is_none());
        assert_eq!(std::fs::read_to_string(&manifest).unwrap(), edited);
    }

    #[test]
    fn failed_commit_returns_to_the_initial_branch() {
        let ws = TestWorkspace::new();
        products(&ws);
        let dir = ws.write_bundle("bundle1", BUNDLE1);
        let shared = ws.init_shared_root();
        tag_head(&shared, "TEST");
        let provider = GitProvider::new();
        let mut bundle = Bundle::open(&dir, &provider, BundlerConfig::default()).unwrap();
        bundle.make_clones().unwrap();
        let unchecked = ReleaseMode {
            check: false,
            commit: true,
        };

        bundle
            .release("TEST", &ReleaseOptions::default(), unchecked)
            .unwrap_err();

        let shared = git2::Repository::open(ws.shared_root()).unwrap();
        assert_eq!(shared.head().unwrap().shorthand(), Some("main"));
        assert!(dirty_paths(&ws.shared_root()).is_empty());
        ws.assert_file_contains("bundles/bundle1/BUNDLE_MANIFEST.xml", r#"<branch path="ToRelease"/>"#);
    }

    #[test]
    fn bundle_outside_a_working_copy_cannot_be_released() {
        let ws = TestWorkspace::new();
        products(&ws);
        let dir = ws.write_bundle("bundle1", BUNDLE1);
        let provider = GitProvider::new();
        let mut bundle = Bundle::open(&dir, &provider, BundlerConfig::default()).unwrap();

        let err = bundle
            .release("TEST", &ReleaseOptions::default(), ReleaseMode::default())
            .unwrap_err();

        assert!(matches!(err, Error::RepoNotFound { .. }), "unexpected error: {err}");
    }
}

mod multiple_bundles {
    use super::*;
    use pretty_assertions::assert_eq;

    fn two_bundles(ws: &TestWorkspace) -> Vec<PathBuf> {
        products(ws);
        let first = ws.write_bundle("bundle1", BUNDLE1);
        let second = ws.write_bundle("bundle2", BUNDLE2);
        ws.init_shared_root();
        vec![first, second]
    }

    #[test]
    fn shared_products_pin_identical_changesets() {
        let ws = TestWorkspace::new();
        let dirs = two_bundles(&ws);
        let provider = GitProvider::new();

        let outcome = release_multiple(
            &dirs,
            "TEST",
            &provider,
            &BundlerConfig::default(),
            &ReleaseOptions::default(),
        )
        .unwrap();

        assert_eq!(outcome.len(), 2);
        assert_eq!(
            pinned(&ws, "TEST", "bundle2"),
            pairs(&[("ToRelease", "1.3.0"), ("NeverReleased", "0.1.0")])
        );
        assert_eq!(
            head_id(&dirs[0].join("ToRelease")),
            head_id(&dirs[1].join("ToRelease"))
        );
        assert_eq!(
            tag_target(&dirs[0].join("ToRelease"), "1.3.0"),
            tag_target(&dirs[1].join("ToRelease"), "1.3.0")
        );
        assert!(dirty_paths(&ws.shared_root()).is_empty());
    }

    #[test]
    fn failure_in_a_later_bundle_rolls_everything_back() {
        let ws = TestWorkspace::new();
        let dirs = two_bundles(&ws);
        let provider = GitProvider::new();
        let second = Bundle::open(&dirs[1], &provider, BundlerConfig::default()).unwrap();
        second.make_clones().unwrap();
        std::fs::write(dirs[1].join("ToRelease/src/main.txt"), "work in progress\n").unwrap();
        let manifest_before = std::fs::read_to_string(dirs[0].join("BUNDLE_MANIFEST.xml")).unwrap();

        let err = release_multiple(
            &dirs,
            "TEST",
            &provider,
            &BundlerConfig::default(),
            &ReleaseOptions::default(),
        )
        .unwrap_err();

        match err {
            Error::RepoRelease { target, reason } => {
                assert_eq!(target, "ToRelease");
                assert_eq!(reason.label(), Some("local-changes"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(dirty_paths(&ws.shared_root()).is_empty());
        assert!(tag_target(&ws.shared_root(), "TEST").is_none());
        assert_eq!(
            std::fs::read_to_string(dirs[0].join("BUNDLE_MANIFEST.xml")).unwrap(),
            manifest_before
        );
    }

    #[test]
    fn uncommitted_change_in_one_bundle_fails_the_whole_release() {
        let ws = TestWorkspace::new();
        let dirs = two_bundles(&ws);
        let manifest = dirs[1].join("BUNDLE_MANIFEST.xml");
        let edited = format!("{}<!-- wip -->\n", std::fs::read_to_string(&manifest).unwrap());
        std::fs::write(&manifest, &edited).unwrap();
        let provider = GitProvider::new();

        let err = release_multiple(
            &dirs,
            "TEST",
            &provider,
            &BundlerConfig::default(),
            &ReleaseOptions::default(),
        )
        .unwrap_err();

        assert!(matches!(err, Error::BundleRelease { .. }), "unexpected error: {err}");
        assert!(tag_target(&ws.shared_root(), "TEST").is_none());
        assert_eq!(std::fs::read_to_string(&manifest).unwrap(), edited);
    }

    #[test]
    fn bundles_of_different_working_copies_are_refused() {
        let ws = TestWorkspace::new();
        let dirs = two_bundles(&ws);
        let outsider = TestWorkspace::new();
        products(&outsider);
        let foreign = outsider.write_bundle("bundle3", BUNDLE2);
        outsider.init_shared_root();
        let provider = GitProvider::new();

        let err = release_multiple(
            &[dirs[0].clone(), foreign],
            "TEST",
            &provider,
            &BundlerConfig::default(),
            &ReleaseOptions::default(),
        )
        .unwrap_err();

        assert!(matches!(err, Error::BundleRelease { .. }), "unexpected error: {err}");
    }
}
