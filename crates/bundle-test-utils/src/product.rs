//! Product repositories: `VERSION` and `CHANGES` under git.

use std::path::Path;

use git2::Repository;

use crate::git::{commit_all, init_repo, write_file};

/// Changelog with every section holding only a placeholder.
pub const BLANK_CHANGES: &str = "\
Requires
~~~~~~~~
-
New features
~~~~~~~~~~~~
-
Bug fixes
~~~~~~~~~
-
New internal features
~~~~~~~~~~~~~~~~~~~~~
-
";

/// Changelog listing one new feature.
pub fn changes_with_feature(feature: &str) -> String {
    BLANK_CHANGES.replacen(
        "New features\n~~~~~~~~~~~~\n-\n",
        &format!("New features\n~~~~~~~~~~~~\n- {feature}\n"),
        1,
    )
}

/// Changelog listing one bug fix.
pub fn changes_with_fix(fix: &str) -> String {
    BLANK_CHANGES.replacen(
        "Bug fixes\n~~~~~~~~~\n-\n",
        &format!("Bug fixes\n~~~~~~~~~\n- {fix}\n"),
        1,
    )
}

/// `VERSION` file content in `KEY=VALUE` form.
pub fn version_file(name: &str, version: &str, release: u32) -> String {
    format!("NAME={name}\nVERSION={version}\nRELEASE={release}\n")
}

/// Creates a product repository at `path` with one commit holding
/// `VERSION`, `CHANGES` and a source file.
pub fn create_product(path: &Path, name: &str, version: &str, changes: &str) -> Repository {
    let repo = init_repo(path);
    write_file(path, "VERSION", &version_file(name, version, 1));
    write_file(path, "CHANGES", changes);
    write_file(path, "src/main.txt", &format!("{name} sources\n"));
    commit_all(&repo, "initial import");
    repo
}
