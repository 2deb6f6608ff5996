//! Filesystem archives of a released bundle

use std::path::{Path, PathBuf};

use bundle_fs::BundlePath;

use crate::bundle::Bundle;
use crate::descriptor::RepoDescriptor;
use crate::version::VersionMarker;
use crate::{Error, Result};

impl Bundle<'_> {
    /// Export the bundle as released under `tag` into `output`, which must not exist.
    ///
    /// The bundle working copy is brought back to its initial state whether
    /// the export succeeds or not.
    pub fn archive(&mut self, tag: &str, output: &Path) -> Result<PathBuf> {
        if output.exists() {
            return Err(Error::ArchiveExists {
                path: output.to_path_buf(),
            });
        }
        let initial = self.initial_state()?;
        self.update_to_tag(tag)?;

        let exported = self.export(tag, output);
        let restored = self.return_to(&initial);
        let exported = exported?;
        restored?;
        Ok(exported)
    }

    fn export(&self, tag: &str, output: &Path) -> Result<PathBuf> {
        self.make_clones()?;

        tracing::info!(output = %output.display(), "Creating output directory");
        std::fs::create_dir_all(output).map_err(|e| bundle_fs::Error::io(output, e))?;
        let output = bundle_fs::canonical(output)?;

        let bundle_name = self
            .dir()
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        bundle_fs::write_text(
            &BundlePath::VersionText.within(&output),
            &format!("{tag}\nArchive produced by bundler from bundle {bundle_name} tag {tag}\n"),
        )?;

        let mut has_sub = false;
        for desc in self.descriptors() {
            has_sub |= desc.sub.is_some();
            self.archive_repo(desc, &output)?;
        }

        if has_sub {
            let aside = BundlePath::AsideDir.within(&output);
            tracing::info!(path = %aside.display(), "Removing extracted shared clones");
            bundle_fs::remove_tree(&aside)?;
        }
        Ok(output)
    }

    fn archive_repo(&self, desc: &RepoDescriptor, output: &Path) -> Result<()> {
        let rev = desc.tip(self.provider())?;
        let repo = desc.repo(self.provider())?;
        // targets of one shared clone may be pinned to different changesets
        let dest = match &desc.sub {
            Some(sub) => BundlePath::AsideDir
                .within(output)
                .join(format!("{}-{}", sub.clone_name, rev.short())),
            None => output.join(desc.local_path_rel()),
        };

        if desc.sub.is_some() && dest.exists() {
            tracing::debug!(repo = %desc.target, rev = %rev.short(), "Shared clone already exported");
        } else {
            tracing::info!(repo = %desc.local_path_rel(), rev = %rev.short(), dest = %dest.display(), "Exporting");
            repo.archive_to(&dest, rev.as_str())?;
        }

        let Some(sub) = &desc.sub else {
            return finish_version_files(&dest);
        };
        let src = dest.join(&sub.subpath);
        let target_dir = output.join(&desc.target);
        finish_version_files(&src)?;
        tracing::info!(repo = %desc.target, subpath = %sub.subpath, "Extracting sub-directory");
        bundle_fs::copy_tree(&src, &target_dir)?;
        bundle_fs::write_text(
            &BundlePath::ArchivalMetadata.within(&target_dir),
            &format!(
                "repo: {}\nnode: {}\nsubpath: {}\n",
                desc.remote_url, rev, sub.subpath
            ),
        )?;
        Ok(())
    }
}

/// Turn release bookkeeping files into their archive form.
///
/// `CHANGES` goes away, `HISTORY` becomes `CHANGELOG.txt` and the version
/// marker is summarized in `version.txt`. Directories without a changelog
/// were not released by the bundler and are left alone.
fn finish_version_files(dir: &Path) -> Result<()> {
    let changes = BundlePath::Changes.within(dir);
    let history = BundlePath::History.within(dir);
    if !changes.is_file() || !history.is_file() {
        tracing::debug!(path = %dir.display(), "No release bookkeeping files");
        return Ok(());
    }
    std::fs::remove_file(&changes).map_err(|e| bundle_fs::Error::io(&changes, e))?;
    let changelog = BundlePath::ArchivedChangelog.within(dir);
    std::fs::rename(&history, &changelog).map_err(|e| bundle_fs::Error::io(&history, e))?;

    match VersionMarker::find(dir) {
        Ok(Some(marker)) => {
            bundle_fs::write_text(
                &BundlePath::VersionText.within(dir),
                &format!("{}\n\n", marker.archive_label()),
            )?;
        }
        Ok(None) => {}
        Err(reason) => {
            tracing::warn!(path = %dir.display(), %reason, "Unreadable version marker left as is");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn bookkeeping_files_take_archive_form() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path();
        std::fs::write(dir.join("CHANGES"), "Requires\n~~~~~~~~\n-\n").unwrap();
        std::fs::write(dir.join("HISTORY"), "Package: Foo 1.3.0\n").unwrap();
        std::fs::write(dir.join("VERSION"), "NAME=Foo\nVERSION=1.3.0\nRELEASE=1\n").unwrap();

        finish_version_files(dir).unwrap();

        assert!(!dir.join("CHANGES").exists());
        assert!(!dir.join("HISTORY").exists());
        assert!(dir.join("CHANGELOG.txt").is_file());
        let version = std::fs::read_to_string(dir.join("version.txt")).unwrap();
        assert!(version.starts_with("1.3.0-1"));
    }

    #[test]
    fn unreleased_directories_are_untouched() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("CHANGES"), "").unwrap();

        finish_version_files(temp.path()).unwrap();

        assert!(temp.path().join("CHANGES").exists());
    }
}
