//! Filesystem primitives shared by the file installer, uninstall, and refresh.
use anyhow::{Context as _, Result};
use std::path::{Path, PathBuf};

/// Ensure the parent directory of `path` exists, creating it (and any
/// ancestors) if necessary.
///
/// # Errors
///
/// Returns an error if the directory cannot be created.
pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create parent: {}", parent.display()))?;
    }
    Ok(())
}

/// Remove whatever is at `path`: a file, a symlink (broken or not, without
/// following it), or a whole directory tree. Does nothing if `path` is absent.
///
/// # Errors
///
/// Returns an error if the path exists but cannot be removed.
pub fn remove_existing(path: &Path) -> Result<()> {
    let Ok(meta) = path.symlink_metadata() else {
        return Ok(());
    };
    if meta.is_dir() {
        std::fs::remove_dir_all(path)
            .with_context(|| format!("remove directory: {}", path.display()))?;
    } else if meta.is_symlink() && cfg!(windows) && path.is_dir() {
        std::fs::remove_dir(path)
            .with_context(|| format!("remove directory link: {}", path.display()))?;
    } else {
        std::fs::remove_file(path)
            .with_context(|| format!("remove existing: {}", path.display()))?;
    }
    Ok(())
}

/// `true` if `a` and `b` resolve to the same existing filesystem entry.
#[must_use]
pub fn same_file(a: &Path, b: &Path) -> bool {
    match (dunce::canonicalize(a), dunce::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Remove the parts of the `dest` tree that mirror the `src` tree.
///
/// Files are removed where both sides hold a non-directory, directories are
/// descended where both sides hold a directory, and a mirrored directory is
/// removed only once it is empty. Entries present only under `dest`, and
/// entries whose kind differs from the source, are kept.
///
/// # Errors
///
/// Returns an error if a source directory cannot be read or a destination
/// entry cannot be removed.
pub fn remove_mirrored_tree(src: &Path, dest: &Path) -> Result<()> {
    let mut dirs = Vec::new();
    let mut work: Vec<(PathBuf, PathBuf)> = vec![(src.to_path_buf(), dest.to_path_buf())];
    while let Some((src, dest)) = work.pop() {
        let Ok(meta) = dest.symlink_metadata() else {
            continue;
        };
        let dest_is_dir = meta.is_dir() && !meta.is_symlink();
        match (src.is_dir(), dest_is_dir) {
            (true, true) => {
                for entry in std::fs::read_dir(&src)
                    .with_context(|| format!("reading directory {}", src.display()))?
                {
                    let name = entry
                        .with_context(|| format!("reading entry in {}", src.display()))?
                        .file_name();
                    work.push((src.join(&name), dest.join(&name)));
                }
                dirs.push(dest);
            }
            (false, false) => remove_existing(&dest)?,
            _ => {}
        }
    }

    // Children are always pushed after their parent.
    for dir in dirs.into_iter().rev() {
        let empty = std::fs::read_dir(&dir)
            .with_context(|| format!("reading directory {}", dir.display()))?
            .next()
            .is_none();
        if empty {
            std::fs::remove_dir(&dir)
                .with_context(|| format!("remove directory: {}", dir.display()))?;
        }
    }
    Ok(())
}

/// Copy a directory tree.
///
/// Symlinks within the source tree are followed, so their contents are
/// materialised rather than the link itself. Walks with an explicit stack, so
/// deep trees cannot overflow the call stack.
///
/// # Errors
///
/// Returns an error if a destination directory cannot be created, a source
/// entry cannot be read, or a file cannot be copied.
pub fn copy_dir_recursive(src: &Path, dst: &Path) -> Result<()> {
    let mut work: Vec<(PathBuf, PathBuf)> = vec![(src.to_path_buf(), dst.to_path_buf())];
    while let Some((src, dst)) = work.pop() {
        std::fs::create_dir_all(&dst)
            .with_context(|| format!("creating directory {}", dst.display()))?;
        for entry in
            std::fs::read_dir(&src).with_context(|| format!("reading directory {}", src.display()))?
        {
            let entry = entry.with_context(|| format!("reading entry in {}", src.display()))?;
            let src_path = entry.path();
            let dst_path = dst.join(entry.file_name());
            if src_path.is_dir() {
                work.push((src_path, dst_path));
            } else {
                std::fs::copy(&src_path, &dst_path).with_context(|| {
                    format!("copying {} to {}", src_path.display(), dst_path.display())
                })?;
            }
        }
    }
    Ok(())
}

/// Create a symlink at `link` pointing to `target`.
///
/// # Errors
///
/// Returns an error if the link cannot be created.
pub fn create_symlink(target: &Path, link: &Path) -> Result<()> {
    #[cfg(unix)]
    let result = std::os::unix::fs::symlink(target, link);

    #[cfg(windows)]
    let result = if target.is_dir() {
        std::os::windows::fs::symlink_dir(target, link)
    } else {
        std::os::windows::fs::symlink_file(target, link)
    };

    result.with_context(|| {
        format!(
            "creating symlink {} -> {}",
            link.display(),
            target.display()
        )
    })
}

/// Compare two regular files byte for byte.
///
/// # Errors
///
/// Returns an error if either file cannot be read.
pub fn files_identical(a: &Path, b: &Path) -> Result<bool> {
    let meta_a = std::fs::metadata(a).with_context(|| format!("reading {}", a.display()))?;
    let meta_b = std::fs::metadata(b).with_context(|| format!("reading {}", b.display()))?;
    if meta_a.len() != meta_b.len() {
        return Ok(false);
    }
    let bytes_a = std::fs::read(a).with_context(|| format!("reading {}", a.display()))?;
    let bytes_b = std::fs::read(b).with_context(|| format!("reading {}", b.display()))?;
    Ok(bytes_a == bytes_b)
}

/// Remove the now-empty ancestors of `path`, stopping at the first non-empty
/// directory and never touching `stop_at` or anything above it.
///
/// Returns the directories that were removed, innermost first.
pub fn prune_empty_parents(path: &Path, stop_at: &Path) -> Vec<PathBuf> {
    let mut removed = Vec::new();
    let mut current = path.parent();
    while let Some(dir) = current {
        if dir == stop_at || !dir.starts_with(stop_at) {
            break;
        }
        let is_empty = std::fs::read_dir(dir).is_ok_and(|mut entries| entries.next().is_none());
        if !is_empty || std::fs::remove_dir(dir).is_err() {
            break;
        }
        removed.push(dir.to_path_buf());
        current = dir.parent();
    }
    removed
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn copies_files_and_subdirectories() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();

        std::fs::write(src.path().join("a.txt"), b"aaa").unwrap();
        std::fs::create_dir_all(src.path().join("sub/deeper")).unwrap();
        std::fs::write(src.path().join("sub/b.txt"), b"bbb").unwrap();
        std::fs::write(src.path().join("sub/deeper/c.txt"), b"ccc").unwrap();

        let target = dst.path().join("out");
        copy_dir_recursive(src.path(), &target).unwrap();

        assert_eq!(std::fs::read(target.join("a.txt")).unwrap(), b"aaa");
        assert_eq!(std::fs::read(target.join("sub/b.txt")).unwrap(), b"bbb");
        assert_eq!(std::fs::read(target.join("sub/deeper/c.txt")).unwrap(), b"ccc");
    }

    // -----------------------------------------------------------------------
    // ensure_parent_dir
    // -----------------------------------------------------------------------

    #[test]
    fn ensure_parent_dir_creates_missing_parents() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b").join("file.txt");
        ensure_parent_dir(&nested).unwrap();
        assert!(dir.path().join("a").join("b").exists());
    }

    // -----------------------------------------------------------------------
    // same_file
    // -----------------------------------------------------------------------

    #[test]
    fn same_file_sees_through_dot_components() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("f");
        std::fs::write(&file, "x").unwrap();
        let other = dir.path().join("g");
        std::fs::write(&other, "x").unwrap();

        assert!(same_file(&file, &dir.path().join(".").join("f")));
        assert!(!same_file(&file, &other));
        assert!(!same_file(&file, &dir.path().join("missing")));
    }

    // -----------------------------------------------------------------------
    // remove_mirrored_tree
    // -----------------------------------------------------------------------

    #[test]
    fn remove_mirrored_tree_keeps_foreign_entries() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(src.path().join("sub/deep")).unwrap();
        std::fs::write(src.path().join("a"), "a").unwrap();
        std::fs::write(src.path().join("sub/deep/b"), "b").unwrap();
        std::fs::create_dir(src.path().join("kind")).unwrap();

        let target = dst.path().join("out");
        copy_dir_recursive(src.path(), &target).unwrap();
        std::fs::write(target.join("sub/own"), "mine").unwrap();
        std::fs::remove_dir(target.join("kind")).unwrap();
        std::fs::write(target.join("kind"), "file where a dir was").unwrap();

        remove_mirrored_tree(src.path(), &target).unwrap();

        assert!(!target.join("a").exists());
        assert!(!target.join("sub/deep").exists());
        assert_eq!(std::fs::read_to_string(target.join("sub/own")).unwrap(), "mine");
        assert!(target.join("kind").is_file());
    }

    #[test]
    fn remove_mirrored_tree_removes_emptied_root() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(src.path().join("sub")).unwrap();
        std::fs::write(src.path().join("sub/b"), "b").unwrap();

        let target = dst.path().join("out");
        copy_dir_recursive(src.path(), &target).unwrap();
        remove_mirrored_tree(src.path(), &target).unwrap();
        assert!(!target.exists());
    }

    // -----------------------------------------------------------------------
    // remove_existing
    // -----------------------------------------------------------------------

    #[test]
    fn remove_existing_removes_regular_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("target");
        std::fs::write(&file, "content").unwrap();
        remove_existing(&file).unwrap();
        assert!(!file.exists());
    }

    #[test]
    fn remove_existing_removes_directory_tree() {
        let dir = tempfile::tempdir().unwrap();
        let tree = dir.path().join("tree");
        std::fs::create_dir_all(tree.join("a/b")).unwrap();
        std::fs::write(tree.join("a/b/f"), "x").unwrap();
        remove_existing(&tree).unwrap();
        assert!(!tree.exists());
    }

    #[test]
    fn remove_existing_noop_when_path_absent() {
        let dir = tempfile::tempdir().unwrap();
        remove_existing(&dir.path().join("nonexistent")).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn remove_existing_removes_link_not_target() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("real");
        std::fs::create_dir(&target).unwrap();
        std::fs::write(target.join("keep"), "x").unwrap();
        let link = dir.path().join("link");
        create_symlink(&target, &link).unwrap();

        remove_existing(&link).unwrap();
        assert!(link.symlink_metadata().is_err());
        assert!(target.join("keep").exists());
    }

    #[cfg(unix)]
    #[test]
    fn remove_existing_removes_broken_symlink() {
        let dir = tempfile::tempdir().unwrap();
        let link = dir.path().join("link");
        std::os::unix::fs::symlink("/nonexistent/target", &link).unwrap();
        remove_existing(&link).unwrap();
        assert!(link.symlink_metadata().is_err());
    }

    // -----------------------------------------------------------------------
    // files_identical
    // -----------------------------------------------------------------------

    #[test]
    fn files_identical_compares_content() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a");
        let b = dir.path().join("b");
        let c = dir.path().join("c");
        std::fs::write(&a, "same").unwrap();
        std::fs::write(&b, "same").unwrap();
        std::fs::write(&c, "diff").unwrap();
        assert!(files_identical(&a, &b).unwrap());
        assert!(!files_identical(&a, &c).unwrap());
    }

    // -----------------------------------------------------------------------
    // prune_empty_parents
    // -----------------------------------------------------------------------

    #[test]
    fn prune_stops_at_install_dir() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("home");
        std::fs::create_dir_all(root.join("a/b")).unwrap();

        let removed = prune_empty_parents(&root.join("a/b/file"), &root);
        assert_eq!(removed, vec![root.join("a/b"), root.join("a")]);
        assert!(root.exists());
    }

    #[test]
    fn prune_stops_at_non_empty_directory() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("home");
        std::fs::create_dir_all(root.join("a/b")).unwrap();
        std::fs::write(root.join("a/other"), "x").unwrap();

        let removed = prune_empty_parents(&root.join("a/b/file"), &root);
        assert_eq!(removed, vec![root.join("a/b")]);
        assert!(root.join("a").exists());
    }

    #[test]
    fn prune_ignores_paths_outside_install_dir() {
        let dir = tempfile::tempdir().unwrap();
        let elsewhere = dir.path().join("elsewhere");
        std::fs::create_dir_all(&elsewhere).unwrap();

        let removed = prune_empty_parents(&elsewhere.join("f"), &dir.path().join("home"));
        assert!(removed.is_empty());
        assert!(elsewhere.exists());
    }
}
