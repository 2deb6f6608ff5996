//! Targets extracted from sub-directories of one shared clone

use std::fs;
use std::path::{Path, PathBuf};

use bundle_core::{Bundle, BundlerConfig, ReleaseMode, ReleaseOptions};
use bundle_test_utils::git::{commit_all, file_at, init_repo, write_file};
use bundle_test_utils::product::{BLANK_CHANGES, changes_with_feature, version_file};
use bundle_test_utils::workspace::TestWorkspace;
use bundle_vcs::GitProvider;
use pretty_assertions::assert_eq;
use tempfile::TempDir;

const BUNDLE: &str = r#"<bundle>
  <server url="$ORIGINS">
    <branch path="mono" subpath="libs/core" target="Core"/>
    <branch path="mono" subpath="libs/ui" target="Ui"/>
  </server>
</bundle>
"#;

/// One origin holding two products under `libs/`.
fn mono_workspace() -> (TestWorkspace, PathBuf) {
    let ws = TestWorkspace::new();
    let mono = ws.origins().join("mono");
    let repo = init_repo(&mono);
    write_file(&mono, "libs/core/VERSION", &version_file("Core", "2.0.0", 1));
    write_file(&mono, "libs/core/CHANGES", BLANK_CHANGES);
    write_file(&mono, "libs/core/src/core.txt", "core sources\n");
    write_file(&mono, "libs/ui/VERSION", &version_file("Ui", "0.5.0", 1));
    write_file(&mono, "libs/ui/CHANGES", &changes_with_feature("Dark theme"));
    write_file(&mono, "libs/ui/src/ui.txt", "ui sources\n");
    commit_all(&repo, "initial import");

    let dir = ws.write_bundle("bundle1", BUNDLE);
    ws.init_shared_root();
    (ws, dir)
}

fn is_link(path: &Path) -> bool {
    fs::symlink_metadata(path)
        .map(|meta| meta.file_type().is_symlink())
        .unwrap_or(false)
}

#[test]
fn targets_link_into_one_shared_clone() {
    let (_ws, dir) = mono_workspace();
    let provider = GitProvider::new();
    let bundle = Bundle::open(&dir, &provider, BundlerConfig::default()).unwrap();

    bundle.make_clones().unwrap();

    assert!(dir.join(".bundle_aside/mono/.git").exists());
    assert!(!dir.join("mono").exists());
    assert!(is_link(&dir.join("Core")));
    assert!(is_link(&dir.join("Ui")));
    assert_eq!(fs::read_to_string(dir.join("Core/src/core.txt")).unwrap(), "core sources\n");
    assert_eq!(fs::read_to_string(dir.join("Ui/src/ui.txt")).unwrap(), "ui sources\n");
}

#[test]
fn release_goes_through_the_shared_clone() {
    let (ws, dir) = mono_workspace();
    let provider = GitProvider::new();
    let mut bundle = Bundle::open(&dir, &provider, BundlerConfig::default()).unwrap();
    bundle.make_clones().unwrap();

    let released = bundle
        .release("R1", &ReleaseOptions::default(), ReleaseMode::default())
        .unwrap();

    assert_eq!(released.get("Core").map(String::as_str), Some("2.0.0"));
    assert_eq!(released.get("Ui").map(String::as_str), Some("0.6.0"));
    let clone = dir.join(".bundle_aside/mono");
    assert_eq!(
        file_at(&clone, "0.6.0", "libs/ui/VERSION"),
        version_file("Ui", "0.6.0", 1)
    );
    let recorded = file_at(&ws.shared_root(), "R1", "bundle1/BUNDLE_MANIFEST.xml");
    assert!(recorded.contains(r#"<tag path="mono" subpath="libs/core" target="Core" name="2.0.0"/>"#));
    assert!(recorded.contains(r#"<tag path="mono" subpath="libs/ui" target="Ui" name="0.6.0"/>"#));
}

#[test]
fn archive_extracts_each_target_at_its_own_tag() {
    let (ws, dir) = mono_workspace();
    let provider = GitProvider::new();
    let mut bundle = Bundle::open(&dir, &provider, BundlerConfig::default()).unwrap();
    bundle.make_clones().unwrap();
    bundle
        .release("R1", &ReleaseOptions::default(), ReleaseMode::default())
        .unwrap();
    let out = TempDir::new().unwrap();

    let written = bundle.archive("R1", &out.path().join("bundle1-R1")).unwrap();

    assert!(!written.join(".bundle_aside").exists());
    assert!(!is_link(&written.join("Core")));
    assert_eq!(
        fs::read_to_string(written.join("Core/src/core.txt")).unwrap(),
        "core sources\n"
    );
    assert_eq!(
        fs::read_to_string(written.join("Ui/version.txt")).unwrap(),
        "0.6.0-1\n\n"
    );
    assert!(written.join("Ui/CHANGELOG.txt").is_file());
    assert!(!written.join("Ui/CHANGES").exists());

    let origin = ws.origins().join("mono");
    let metadata = fs::read_to_string(written.join("Core/.archival.txt")).unwrap();
    assert!(metadata.starts_with(&format!("repo: {}\n", origin.display())));
    assert!(metadata.contains("\nsubpath: libs/core\n"));
    let metadata = fs::read_to_string(written.join("Ui/.archival.txt")).unwrap();
    assert!(metadata.contains("\nsubpath: libs/ui\n"));
}
