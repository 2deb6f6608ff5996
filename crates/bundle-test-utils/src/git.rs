//! Git repository fixtures built through `git2`, no `git` executable needed.

use std::fs;
use std::path::Path;

use git2::{IndexAddOption, Oid, Repository, RepositoryInitOptions, Signature, StatusOptions};

/// Initialises a repository on branch `main` with a configured identity.
///
/// # Panics
/// Panics if any git operation fails.
pub fn init_repo(path: &Path) -> Repository {
    fs::create_dir_all(path)
        .unwrap_or_else(|e| panic!("init_repo: failed to create {}: {e}", path.display()));
    let mut opts = RepositoryInitOptions::new();
    opts.initial_head("main");
    let repo = Repository::init_opts(path, &opts)
        .unwrap_or_else(|e| panic!("init_repo: failed to init {}: {e}", path.display()));
    {
        let mut config = repo.config().expect("init_repo: no config");
        config.set_str("user.name", "Test User").expect("user.name");
        config.set_str("user.email", "test@test.com").expect("user.email");
    }
    repo
}

/// Writes `content` to `relative` below `root`, creating parent directories.
pub fn write_file(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content)
        .unwrap_or_else(|e| panic!("write_file: failed to write {}: {e}", path.display()));
}

/// Stages every file of the working tree and commits on `HEAD`.
///
/// Only use before nested clones exist below `repo`.
pub fn commit_all(repo: &Repository, message: &str) -> Oid {
    let mut index = repo.index().unwrap();
    index
        .add_all(["*"], IndexAddOption::DEFAULT, None)
        .expect("commit_all: add_all failed");
    index.write().unwrap();
    commit_index(repo, message)
}

/// Stages the given paths and commits on `HEAD`.
pub fn commit_paths(repo: &Repository, paths: &[&str], message: &str) -> Oid {
    let mut index = repo.index().unwrap();
    for path in paths {
        index
            .add_path(Path::new(path))
            .unwrap_or_else(|e| panic!("commit_paths: cannot add {path}: {e}"));
    }
    index.write().unwrap();
    commit_index(repo, message)
}

fn commit_index(repo: &Repository, message: &str) -> Oid {
    let mut index = repo.index().unwrap();
    let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
    let sig = Signature::now("Test User", "test@test.com").unwrap();
    let parents: Vec<_> = match repo.head() {
        Ok(head) => vec![head.peel_to_commit().unwrap()],
        Err(_) => Vec::new(),
    };
    let parent_refs: Vec<_> = parents.iter().collect();
    repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parent_refs)
        .unwrap_or_else(|e| panic!("commit failed: {e}"))
}

/// Lightweight tag on the current `HEAD`.
pub fn tag_head(repo: &Repository, name: &str) -> Oid {
    let head = repo.head().unwrap().peel(git2::ObjectType::Commit).unwrap();
    repo.tag_lightweight(name, &head, false)
        .unwrap_or_else(|e| panic!("tag_head: cannot tag {name}: {e}"))
}

/// Id of the commit checked out in the repository at `path`.
pub fn head_id(path: &Path) -> Oid {
    let repo = Repository::open(path)
        .unwrap_or_else(|e| panic!("head_id: cannot open {}: {e}", path.display()));
    let id = repo.head().unwrap().peel_to_commit().unwrap().id();
    id
}

/// Commit a tag designates in the repository at `path`.
pub fn tag_target(path: &Path, tag: &str) -> Option<Oid> {
    let repo = Repository::open(path).ok()?;
    let reference = repo.find_reference(&format!("refs/tags/{tag}")).ok()?;
    let id = reference.peel_to_commit().ok()?.id();
    Some(id)
}

/// Tracked paths with uncommitted modifications in the repository at `path`.
pub fn dirty_paths(path: &Path) -> Vec<String> {
    let repo = Repository::open(path).unwrap();
    let mut opts = StatusOptions::new();
    opts.include_untracked(false);
    let statuses = repo.statuses(Some(&mut opts)).unwrap();
    statuses
        .iter()
        .filter(|entry| !entry.status().is_empty())
        .filter_map(|entry| entry.path().map(String::from))
        .collect()
}

/// Content of `file` as recorded at revision `rev` of the repository at `path`.
pub fn file_at(path: &Path, rev: &str, file: &str) -> String {
    let repo = Repository::open(path).unwrap();
    let object = repo
        .revparse_single(&format!("{rev}:{file}"))
        .unwrap_or_else(|e| panic!("file_at: {rev}:{file} not found: {e}"));
    let blob = object.peel_to_blob().unwrap();
    String::from_utf8_lossy(blob.content()).into_owned()
}

/// First line of the message of the commit checked out at `path`.
pub fn head_summary(path: &Path) -> String {
    let repo = Repository::open(path).unwrap();
    let commit = repo.head().unwrap().peel_to_commit().unwrap();
    commit.summary().unwrap_or_default().to_string()
}
