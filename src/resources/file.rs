//! The file installer: copies or links one declared file or directory into
//! place under a merge strategy and override policy.
use std::path::{Path, PathBuf};

use super::fs;
use crate::error::FileInstallError;
use crate::logging::Log;
use crate::modules::FileEntry;
use crate::options::MergeStrategy;

/// Installs files and directory trees.
#[derive(Debug, Clone, Copy)]
pub struct FileInstaller {
    strategy: MergeStrategy,
    allow_override: bool,
}

impl FileInstaller {
    /// Installer using `strategy` for directories; `allow_override` permits
    /// replacing existing destinations.
    #[must_use]
    pub const fn new(strategy: MergeStrategy, allow_override: bool) -> Self {
        Self {
            strategy,
            allow_override,
        }
    }

    /// Install `src` to `dest` as declared by `file`.
    ///
    /// Merging a directory into an existing directory walks the source tree
    /// with an explicit work stack, applying the same rules to every child.
    ///
    /// # Errors
    ///
    /// Returns a [`FileInstallError`] carrying `file` and the destination that
    /// failed. Entries installed before the failure are left in place.
    pub fn install(
        &self,
        file: &FileEntry,
        src: &Path,
        dest: &Path,
        log: &dyn Log,
    ) -> Result<(), FileInstallError> {
        let mut work: Vec<(PathBuf, PathBuf)> = vec![(src.to_path_buf(), dest.to_path_buf())];
        while let Some((src, dest)) = work.pop() {
            let children = self
                .install_one(file, &src, &dest, log)
                .map_err(|message| FileInstallError::new(file, &dest, message))?;
            // Reverse so entries are installed in sorted order.
            work.extend(children.into_iter().rev());
        }
        Ok(())
    }

    /// Install a single path. Returns the children still to be merged when
    /// `src` is a directory being spliced into an existing directory.
    fn install_one(
        &self,
        file: &FileEntry,
        src: &Path,
        dest: &Path,
        log: &dyn Log,
    ) -> Result<Vec<(PathBuf, PathBuf)>, String> {
        if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
            if parent.exists() && !parent.is_dir() {
                return Err(format!("can't install to non-directory {}", parent.display()));
            }
            fs::ensure_parent_dir(dest).map_err(|e| format!("{e:#}"))?;
        }

        if !src.exists() {
            return Err(format!("missing source file {}", src.display()));
        }
        let link_target = if file.is_symlink {
            Some(dunce::canonicalize(src).map_err(|e| {
                format!("cannot resolve {}: {e}", src.display())
            })?)
        } else {
            None
        };

        let existing = dest.symlink_metadata().ok();
        let dest_is_link = existing.as_ref().is_some_and(std::fs::Metadata::is_symlink);
        let dest_is_dir = existing.as_ref().is_some_and(std::fs::Metadata::is_dir);
        // A link is replaced without touching its target; anything else that
        // resolves to the source would be deleted before it is read.
        if existing.is_some() && !dest_is_link && fs::same_file(src, dest) {
            return Err("source and destination are the same file".to_string());
        }

        if src.is_dir() {
            if existing.is_some() && !dest_is_dir && !dest_is_link {
                return Err("destination exists and is not a directory".to_string());
            }
            if existing.is_some() && !self.allow_override {
                return Err("destination exists and --no-override specified".to_string());
            }
            let replace = self.strategy == MergeStrategy::Override
                || link_target.is_some()
                || dest_is_link
                || existing.is_none();
            if !replace {
                return merge_children(src, dest);
            }
        } else {
            if dest_is_dir {
                return Err("destination exists and is a directory".to_string());
            }
            if existing.is_some() && !self.allow_override {
                return Err("destination exists and --no-override specified".to_string());
            }
        }

        // Never write through an existing link or into a stale tree.
        fs::remove_existing(dest).map_err(|e| format!("{e:#}"))?;

        if let Some(target) = link_target {
            log.debug(&format!("link {} -> {}", dest.display(), target.display()));
            fs::create_symlink(&target, dest).map_err(|e| format!("{e:#}"))?;
        } else if src.is_dir() {
            log.debug(&format!("copy {} -> {}", src.display(), dest.display()));
            fs::copy_dir_recursive(src, dest).map_err(|e| format!("{e:#}"))?;
        } else {
            log.debug(&format!("copy {} -> {}", src.display(), dest.display()));
            std::fs::copy(src, dest)
                .map_err(|e| format!("copying {}: {e}", src.display()))?;
        }
        Ok(Vec::new())
    }
}

fn merge_children(src: &Path, dest: &Path) -> Result<Vec<(PathBuf, PathBuf)>, String> {
    let entries = std::fs::read_dir(src).map_err(|e| format!("reading {}: {e}", src.display()))?;
    let mut names = entries
        .map(|entry| entry.map(|e| e.file_name()))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| format!("reading {}: {e}", src.display()))?;
    names.sort();
    Ok(names
        .into_iter()
        .map(|name| (src.join(&name), dest.join(&name)))
        .collect())
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::logging::Logger;

    struct Fixture {
        _dir: tempfile::TempDir,
        src: PathBuf,
        dest: PathBuf,
        log: Logger,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("repo");
        let dest = dir.path().join("home");
        std::fs::create_dir_all(&src).unwrap();
        Fixture {
            src,
            dest,
            log: Logger::new("test"),
            _dir: dir,
        }
    }

    fn write(path: &Path, contents: &str) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }

    fn install(
        installer: FileInstaller,
        f: &Fixture,
        name: &str,
        dest: &str,
        symlink: bool,
    ) -> Result<(), FileInstallError> {
        let entry = FileEntry::new(name, dest, symlink);
        installer.install(&entry, &f.src.join(name), &f.dest.join(dest), &f.log)
    }

    fn default_installer() -> FileInstaller {
        FileInstaller::new(MergeStrategy::Merge, true)
    }

    #[test]
    fn copies_file_into_missing_directory() {
        let f = fixture();
        write(&f.src.join("filea"), "some contents");

        install(default_installer(), &f, "filea", "a/b/c/filea", false).unwrap();
        assert_eq!(
            std::fs::read_to_string(f.dest.join("a/b/c/filea")).unwrap(),
            "some contents"
        );
    }

    #[test]
    fn no_override_fails_and_leaves_destination_untouched() {
        let f = fixture();
        write(&f.src.join("filea"), "new");
        write(&f.dest.join("filea"), "old");

        let err = install(
            FileInstaller::new(MergeStrategy::Merge, false),
            &f,
            "filea",
            "filea",
            false,
        )
        .unwrap_err();
        assert_eq!(err.message, "destination exists and --no-override specified");
        assert_eq!(err.dest, f.dest.join("filea"));
        assert_eq!(std::fs::read_to_string(f.dest.join("filea")).unwrap(), "old");
    }

    #[test]
    fn overwrites_existing_file_by_default() {
        let f = fixture();
        write(&f.src.join("filea"), "new");
        write(&f.dest.join("filea"), "old");

        install(default_installer(), &f, "filea", "filea", false).unwrap();
        assert_eq!(std::fs::read_to_string(f.dest.join("filea")).unwrap(), "new");
    }

    #[test]
    fn missing_source_is_an_error() {
        let f = fixture();
        let err = install(default_installer(), &f, "nope", "nope", false).unwrap_err();
        assert!(err.message.starts_with("missing source file"));
        assert_eq!(err.file.src, PathBuf::from("nope"));
    }

    #[test]
    fn file_over_directory_is_an_error() {
        let f = fixture();
        write(&f.src.join("filea"), "x");
        std::fs::create_dir_all(f.dest.join("filea")).unwrap();

        let err = install(default_installer(), &f, "filea", "filea", false).unwrap_err();
        assert_eq!(err.message, "destination exists and is a directory");
    }

    #[test]
    fn directory_over_file_is_an_error() {
        let f = fixture();
        write(&f.src.join("dir/x"), "x");
        write(&f.dest.join("dir"), "a file");

        let err = install(default_installer(), &f, "dir", "dir", false).unwrap_err();
        assert_eq!(err.message, "destination exists and is not a directory");
    }

    #[test]
    fn parent_that_is_a_file_is_an_error() {
        let f = fixture();
        write(&f.src.join("filea"), "x");
        write(&f.dest.join("blocker"), "x");

        let err = install(default_installer(), &f, "filea", "blocker/filea", false).unwrap_err();
        assert!(err.message.starts_with("can't install to non-directory"));
    }

    #[test]
    fn merge_preserves_unrelated_entries() {
        let f = fixture();
        write(&f.src.join("dir/a"), "new a");
        write(&f.src.join("dir/sub/b"), "new b");
        write(&f.dest.join("dir/a"), "old a");
        write(&f.dest.join("dir/keep"), "keep");
        write(&f.dest.join("dir/sub/keep"), "keep");

        install(default_installer(), &f, "dir", "dir", false).unwrap();
        assert_eq!(std::fs::read_to_string(f.dest.join("dir/a")).unwrap(), "new a");
        assert_eq!(std::fs::read_to_string(f.dest.join("dir/sub/b")).unwrap(), "new b");
        assert!(f.dest.join("dir/keep").exists());
        assert!(f.dest.join("dir/sub/keep").exists());
    }

    #[test]
    fn override_replaces_directory_wholesale() {
        let f = fixture();
        write(&f.src.join("dir/a"), "new a");
        write(&f.dest.join("dir/keep"), "keep");

        install(
            FileInstaller::new(MergeStrategy::Override, true),
            &f,
            "dir",
            "dir",
            false,
        )
        .unwrap();
        assert_eq!(std::fs::read_to_string(f.dest.join("dir/a")).unwrap(), "new a");
        assert!(!f.dest.join("dir/keep").exists());
    }

    #[test]
    fn existing_directory_with_no_override_is_an_error() {
        let f = fixture();
        write(&f.src.join("dir/a"), "a");
        std::fs::create_dir_all(f.dest.join("dir")).unwrap();

        let err = install(
            FileInstaller::new(MergeStrategy::Merge, false),
            &f,
            "dir",
            "dir",
            false,
        )
        .unwrap_err();
        assert_eq!(err.message, "destination exists and --no-override specified");
    }

    #[cfg(unix)]
    #[test]
    fn symlink_points_at_absolute_source() {
        let f = fixture();
        write(&f.src.join("useful_cmd"), "#!/bin/sh");

        install(default_installer(), &f, "useful_cmd", ".bin/useful_cmd", true).unwrap();
        let link = f.dest.join(".bin/useful_cmd");
        assert!(link.symlink_metadata().unwrap().is_symlink());
        let target = std::fs::read_link(&link).unwrap();
        assert!(target.is_absolute());
        assert_eq!(target, dunce::canonicalize(f.src.join("useful_cmd")).unwrap());
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_directory_replaces_existing_tree() {
        let f = fixture();
        write(&f.src.join("nvim/init.lua"), "-- config");
        write(&f.dest.join(".config/nvim/stale"), "x");

        install(default_installer(), &f, "nvim", ".config/nvim", true).unwrap();
        let link = f.dest.join(".config/nvim");
        assert!(link.symlink_metadata().unwrap().is_symlink());
        assert!(link.join("init.lua").exists());
        assert!(!f.src.join("nvim/stale").exists());
    }

    #[cfg(unix)]
    #[test]
    fn copy_replaces_symlink_instead_of_writing_through_it() {
        let f = fixture();
        write(&f.src.join("conf"), "repo");
        let elsewhere = f.src.join("elsewhere");
        write(&elsewhere, "untouched");
        std::fs::create_dir_all(&f.dest).unwrap();
        fs::create_symlink(&elsewhere, &f.dest.join("conf")).unwrap();

        install(default_installer(), &f, "conf", "conf", false).unwrap();
        assert!(!f.dest.join("conf").symlink_metadata().unwrap().is_symlink());
        assert_eq!(std::fs::read_to_string(f.dest.join("conf")).unwrap(), "repo");
        assert_eq!(std::fs::read_to_string(&elsewhere).unwrap(), "untouched");
    }

    #[test]
    fn installing_a_file_onto_itself_keeps_it() {
        let f = fixture();
        let zshrc = f.src.join(".zshrc");
        write(&zshrc, "export EDITOR=vim");

        let entry = FileEntry::new(".zshrc", ".zshrc", false);
        let err = default_installer()
            .install(&entry, &zshrc, &f.src.join(".").join(".zshrc"), &f.log)
            .unwrap_err();
        assert!(err.message.contains("same file"), "{err}");
        assert_eq!(std::fs::read_to_string(&zshrc).unwrap(), "export EDITOR=vim");
    }

    #[test]
    fn merging_a_directory_into_itself_keeps_it() {
        let f = fixture();
        write(&f.src.join("nvim/init.lua"), "-- config");

        let entry = FileEntry::new("nvim", "nvim", false);
        let err = default_installer()
            .install(&entry, &f.src.join("nvim"), &f.src.join("nvim"), &f.log)
            .unwrap_err();
        assert!(err.message.contains("same file"), "{err}");
        assert!(f.src.join("nvim/init.lua").exists());
    }

    #[cfg(unix)]
    #[test]
    fn symlink_onto_its_own_source_keeps_it() {
        let f = fixture();
        write(&f.src.join("conf"), "repo");

        let entry = FileEntry::new("conf", "conf", true);
        assert!(
            default_installer()
                .install(&entry, &f.src.join("conf"), &f.src.join("conf"), &f.log)
                .is_err()
        );
        assert_eq!(std::fs::read_to_string(f.src.join("conf")).unwrap(), "repo");
    }
}
