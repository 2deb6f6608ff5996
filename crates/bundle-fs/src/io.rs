//! Atomic writes and whole-tree operations

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use walkdir::WalkDir;

use crate::{Error, Result};

/// Write content atomically to a file with locking.
///
/// The content goes to a sibling temp file first, which is then renamed over
/// the destination, so readers never observe a partially written manifest.
pub fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }

    let temp_name = format!(
        ".{}.{}.tmp",
        path.file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default(),
        std::process::id()
    );
    let temp_path = path.with_file_name(&temp_name);

    let mut temp_file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&temp_path)
        .map_err(|e| Error::io(&temp_path, e))?;

    temp_file
        .lock_exclusive()
        .map_err(|_| Error::LockFailed { path: path.to_path_buf() })?;
    temp_file
        .write_all(content)
        .map_err(|e| Error::io(&temp_path, e))?;
    temp_file.sync_all().map_err(|e| Error::io(&temp_path, e))?;
    temp_file
        .unlock()
        .map_err(|_| Error::LockFailed { path: path.to_path_buf() })?;

    fs::rename(&temp_path, path).map_err(|e| Error::io(path, e))?;
    Ok(())
}

/// Read a whole text file.
pub fn read_text(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| Error::io(path, e))
}

/// Write a whole text file atomically.
pub fn write_text(path: &Path, content: &str) -> Result<()> {
    write_atomic(path, content.as_bytes())
}

/// Canonical absolute form of `path`, without the `\\?\` prefix on Windows.
pub fn canonical(path: &Path) -> Result<PathBuf> {
    dunce::canonicalize(path).map_err(|e| Error::io(path, e))
}

/// Recursively copy `src` into `dest`, creating `dest` if needed.
///
/// Symbolic links are recreated as links, not followed. Returns the number of
/// files copied.
pub fn copy_tree(src: &Path, dest: &Path) -> Result<usize> {
    let mut copied = 0;
    for entry in WalkDir::new(src).follow_links(false) {
        let entry = entry.map_err(|e| Error::Walk {
            path: src.to_path_buf(),
            message: e.to_string(),
        })?;
        let relative = entry.path().strip_prefix(src).unwrap_or(entry.path());
        let target = dest.join(relative);
        let file_type = entry.file_type();

        if file_type.is_dir() {
            fs::create_dir_all(&target).map_err(|e| Error::io(&target, e))?;
        } else if file_type.is_symlink() {
            let pointee = fs::read_link(entry.path()).map_err(|e| Error::io(entry.path(), e))?;
            crate::link::link_dir(&pointee, &target)?;
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
            }
            fs::copy(entry.path(), &target).map_err(|e| Error::io(&target, e))?;
            copied += 1;
        }
    }
    tracing::debug!(src = %src.display(), dest = %dest.display(), copied, "Copied tree");
    Ok(copied)
}

/// Remove a directory tree if it exists.
pub fn remove_tree(path: &Path) -> Result<()> {
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::io(path, e)),
    }
}
