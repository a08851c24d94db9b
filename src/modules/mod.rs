//! Named modules bundling files, actions, and dependencies.
//!
//! A [`Module`] is populated during the load phase and then executed by the
//! orchestrator. Execution attempts every file and action independently; the
//! run's ignore-errors policy decides whether a failed step aborts the rest of
//! the module.
pub mod action;
pub mod commands;
pub mod context;
pub mod graph;
pub mod refresh;

pub use action::Action;
pub use context::{Context, RegistryScope};

use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::path::{Component, Path, PathBuf};

use crate::error::{ActionError, FileInstallError, SyntaxError};
use crate::registry::Registry;
use crate::resources::file::FileInstaller;
use crate::resources::{fs, package};

/// Opaque unique module name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleId(String);

impl ModuleId {
    /// Wrap a module name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The module name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ModuleId {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl From<String> for ModuleId {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl std::borrow::Borrow<str> for ModuleId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// A file or directory to install.
///
/// `src` is relative to the module's root directory and `dest` relative to its
/// install directory, unless either is absolute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Path to the file in the repository.
    pub src: PathBuf,
    /// Path to install the file to.
    pub dest: PathBuf,
    /// Install as a symlink pointing at the source instead of a copy.
    pub is_symlink: bool,
}

impl FileEntry {
    /// Create a file record.
    #[must_use]
    pub fn new(src: impl Into<PathBuf>, dest: impl Into<PathBuf>, is_symlink: bool) -> Self {
        Self {
            src: src.into(),
            dest: dest.into(),
            is_symlink,
        }
    }
}

/// Failures that were logged and skipped while a module ran with
/// ignore-errors enabled.
#[derive(Debug, Default)]
pub struct StepReport {
    /// Step failures that did not abort the module.
    pub ignored: Vec<ActionError>,
}

impl StepReport {
    /// `true` when every step succeeded.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.ignored.is_empty()
    }

    /// Apply the ignore-errors policy to the outcome of one step.
    ///
    /// With ignore-errors set the failure is logged and kept in the report;
    /// otherwise it is returned so the caller abandons the module.
    ///
    /// # Errors
    ///
    /// Returns the step's error when ignore-errors is not set.
    pub fn attempt(&mut self, ctx: &Context, step: Result<(), ActionError>) -> Result<(), ActionError> {
        match step {
            Ok(()) => Ok(()),
            Err(e) if ctx.options.ignore_errors => {
                ctx.log.warn(&format!("{e} (ignored)"));
                self.ignored.push(e);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

/// A named unit bundling files, actions, and dependencies.
#[derive(Debug, Clone)]
pub struct Module {
    id: ModuleId,
    dependencies: BTreeSet<ModuleId>,
    package_dependencies: Vec<String>,
    files: Vec<FileEntry>,
    install_actions: Vec<Action>,
    uninstall_actions: Vec<Action>,
    update_actions: Vec<Action>,
    root_dir: PathBuf,
    install_dir: PathBuf,
}

impl Module {
    /// Create an empty module.
    #[must_use]
    pub fn new(id: impl Into<ModuleId>, root_dir: PathBuf, install_dir: PathBuf) -> Self {
        Self {
            id: id.into(),
            dependencies: BTreeSet::new(),
            package_dependencies: Vec::new(),
            files: Vec::new(),
            install_actions: Vec::new(),
            uninstall_actions: Vec::new(),
            update_actions: Vec::new(),
            root_dir,
            install_dir,
        }
    }

    /// The module's id.
    #[must_use]
    pub const fn id(&self) -> &ModuleId {
        &self.id
    }

    /// Modules that must be installed before this one.
    #[must_use]
    pub const fn dependencies(&self) -> &BTreeSet<ModuleId> {
        &self.dependencies
    }

    /// Abstract system package names this module needs.
    #[must_use]
    pub fn package_dependencies(&self) -> &[String] {
        &self.package_dependencies
    }

    /// Files in declaration order.
    #[must_use]
    pub fn files(&self) -> &[FileEntry] {
        &self.files
    }

    /// Queued install actions.
    #[must_use]
    pub fn install_actions(&self) -> &[Action] {
        &self.install_actions
    }

    /// Queued uninstall actions.
    #[must_use]
    pub fn uninstall_actions(&self) -> &[Action] {
        &self.uninstall_actions
    }

    /// Queued update actions.
    #[must_use]
    pub fn update_actions(&self) -> &[Action] {
        &self.update_actions
    }

    /// Directory that relative source paths resolve against.
    #[must_use]
    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    /// Directory that relative destination paths resolve against.
    #[must_use]
    pub fn install_dir(&self) -> &Path {
        &self.install_dir
    }

    /// Set the directory source paths are relative to.
    pub fn set_root_dir(&mut self, dir: impl Into<PathBuf>) {
        self.root_dir = dir.into();
    }

    /// Set the directory destination paths are relative to.
    pub fn set_install_dir(&mut self, dir: impl Into<PathBuf>) {
        self.install_dir = dir.into();
    }

    /// Union `deps` into the dependency set.
    pub fn add_dependencies<I, D>(&mut self, deps: I)
    where
        I: IntoIterator<Item = D>,
        D: Into<ModuleId>,
    {
        self.dependencies.extend(deps.into_iter().map(Into::into));
    }

    /// Add a file or whole directory. `dest` defaults to `src`.
    pub fn add_file(&mut self, src: impl Into<PathBuf>, dest: Option<PathBuf>, is_symlink: bool) {
        let src = src.into();
        let dest = dest.unwrap_or_else(|| src.clone());
        self.files.push(FileEntry::new(src, dest, is_symlink));
    }

    /// Add every path matching `pattern`, expanded relative to the root
    /// directory.
    ///
    /// Each match keeps its relative path as destination, unless `dest_dir` is
    /// given, in which case the match's file name is placed under it. Returns
    /// the number of entries added.
    ///
    /// # Errors
    ///
    /// Returns a [`SyntaxError`] if the pattern does not parse.
    pub fn add_glob(
        &mut self,
        pattern: &str,
        dest_dir: Option<&Path>,
        is_symlink: bool,
    ) -> Result<usize, SyntaxError> {
        // The root is literal text; only the user's part is a pattern.
        let root = glob::Pattern::escape(&self.root_dir.to_string_lossy());
        let full = Path::new(&root).join(pattern);
        let paths = glob::glob(&full.to_string_lossy())
            .map_err(|e| SyntaxError::new(format!("invalid glob pattern '{pattern}': {e}")))?;

        let mut matches: Vec<PathBuf> = paths
            .filter_map(Result::ok)
            .filter_map(|p| relative_to_root(&p, &self.root_dir))
            .collect();
        matches.sort();

        let added = matches.len();
        for rel in matches {
            let dest = match (dest_dir, rel.file_name()) {
                (Some(dir), Some(name)) => dir.join(name),
                _ => rel.clone(),
            };
            self.files.push(FileEntry::new(rel, dest, is_symlink));
        }
        Ok(added)
    }

    /// Append package dependencies; duplicates are dropped.
    pub fn add_package_dependency<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for name in names {
            let name = name.into();
            if !self.package_dependencies.contains(&name) {
                self.package_dependencies.push(name);
            }
        }
    }

    /// Queue an action to run on install.
    pub fn on_install(&mut self, action: Action) {
        self.install_actions.push(action);
    }

    /// Queue an action to run on uninstall.
    pub fn on_uninstall(&mut self, action: Action) {
        self.uninstall_actions.push(action);
    }

    /// Queue an action to run on update.
    pub fn on_update(&mut self, action: Action) {
        self.update_actions.push(action);
    }

    /// Absolute-or-root-relative source path of `file`.
    #[must_use]
    pub fn src_path(&self, file: &FileEntry) -> PathBuf {
        self.root_dir.join(&file.src)
    }

    /// Absolute-or-install-relative destination path of `file`.
    #[must_use]
    pub fn dest_path(&self, file: &FileEntry) -> PathBuf {
        self.install_dir.join(&file.dest)
    }

    /// This module's id followed by every module it transitively requires.
    ///
    /// Terminates on cyclic graphs; ids that are not registered are included
    /// but not expanded.
    #[must_use]
    pub fn all_dependencies(&self, registry: &Registry) -> Vec<ModuleId> {
        let mut seen: HashSet<&ModuleId> = HashSet::from([&self.id]);
        let mut closure = vec![self.id.clone()];
        let mut work: Vec<&ModuleId> = self.dependencies.iter().rev().collect();

        while let Some(id) = work.pop() {
            if !seen.insert(id) {
                continue;
            }
            closure.push(id.clone());
            if let Ok(module) = registry.get(id.as_str()) {
                work.extend(module.dependencies.iter().rev());
            }
        }
        closure
    }

    /// Install packages (when requested), files, then queued install actions.
    ///
    /// # Errors
    ///
    /// Returns the first failing step's error unless ignore-errors is set.
    /// Already-applied changes are not rolled back.
    pub fn execute_install(&self, ctx: &Context) -> Result<StepReport, ActionError> {
        let mut report = StepReport::default();
        if ctx.options.install_packages && !self.package_dependencies.is_empty() {
            report.attempt(ctx, self.install_packages(ctx))?;
        }
        for file in &self.files {
            report.attempt(ctx, self.install_file(ctx, file))?;
        }
        for action in &self.install_actions {
            report.attempt(ctx, action.run(ctx))?;
        }
        Ok(report)
    }

    /// Remove installed files (after confirmation), then run uninstall actions.
    ///
    /// # Errors
    ///
    /// Returns the first failing step's error unless ignore-errors is set.
    pub fn execute_uninstall(&self, ctx: &Context) -> Result<StepReport, ActionError> {
        let mut report = StepReport::default();
        for file in &self.files {
            report.attempt(ctx, self.uninstall_file(ctx, file))?;
        }
        for action in &self.uninstall_actions {
            report.attempt(ctx, action.run(ctx))?;
        }
        Ok(report)
    }

    /// Re-install files, then run queued update actions. No package step.
    ///
    /// # Errors
    ///
    /// Returns the first failing step's error unless ignore-errors is set.
    pub fn execute_update(&self, ctx: &Context) -> Result<StepReport, ActionError> {
        let mut report = StepReport::default();
        for file in &self.files {
            report.attempt(ctx, self.install_file(ctx, file))?;
        }
        for action in &self.update_actions {
            report.attempt(ctx, action.run(ctx))?;
        }
        Ok(report)
    }

    fn install_packages(&self, ctx: &Context) -> Result<(), ActionError> {
        let Some(system) = ctx.options.system.as_deref() else {
            ctx.log
                .warn(&format!("{}: no system selected, skipping packages", self.id));
            return Ok(());
        };
        package::install_packages(
            ctx.registry(),
            system,
            &self.package_dependencies,
            ctx.executor.as_ref(),
            ctx.log.as_ref(),
        )
        .map_err(Into::into)
    }

    fn install_file(&self, ctx: &Context, file: &FileEntry) -> Result<(), ActionError> {
        let installer = FileInstaller::new(ctx.options.merge_strategy, ctx.options.allow_override);
        installer
            .install(file, &self.src_path(file), &self.dest_path(file), ctx.log.as_ref())
            .map_err(Into::into)
    }

    fn uninstall_file(&self, ctx: &Context, file: &FileEntry) -> Result<(), ActionError> {
        let dest = self.dest_path(file);
        let Ok(meta) = dest.symlink_metadata() else {
            ctx.log
                .debug(&format!("{} is not installed, skipping", dest.display()));
            return Ok(());
        };
        let src = self.src_path(file);
        let merged_tree = meta.is_dir() && !meta.is_symlink();
        if merged_tree && !src.is_dir() {
            ctx.log.warn(&format!(
                "{} is a directory but {} is not, keeping it",
                dest.display(),
                src.display()
            ));
            return Ok(());
        }

        let confirmed = !ctx.options.interactive
            || ctx
                .prompter
                .ask_yes_no(&format!("Delete {}?", dest.display()), false);
        if !confirmed {
            ctx.log.info(&format!("keeping {}", dest.display()));
            return Ok(());
        }

        ctx.log.info(&format!("removing {}", dest.display()));
        let removed = if merged_tree {
            // Merged directories may hold entries the module never installed.
            fs::remove_mirrored_tree(&src, &dest)
        } else {
            fs::remove_existing(&dest)
        };
        removed
            .map_err(|e| FileInstallError::new(file, &dest, format!("cannot remove: {e:#}")))?;

        for dir in fs::prune_empty_parents(&dest, &self.install_dir) {
            ctx.log
                .info(&format!("removed empty directory {}", dir.display()));
        }
        Ok(())
    }
}

/// Path of a glob match relative to `root`.
///
/// Matches under a relative root may come back with `.` components dropped
/// (`./bin/a` as `bin/a`), so the root is also tried without them.
fn relative_to_root(path: &Path, root: &Path) -> Option<PathBuf> {
    if let Ok(rel) = path.strip_prefix(root) {
        return Some(rel.to_path_buf());
    }
    let strip_cur = |p: &Path| -> PathBuf {
        p.components()
            .filter(|c| !matches!(c, Component::CurDir))
            .collect()
    };
    strip_cur(path)
        .strip_prefix(strip_cur(root))
        .ok()
        .map(Path::to_path_buf)
}

#[cfg(test)]
#[allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::panic
)]
mod tests {
    use super::*;
    use crate::modules::context::test_helpers::{make_context, make_context_with};
    use crate::options::Options;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    fn module_in(dir: &Path) -> Module {
        Module::new("test", dir.join("src"), dir.join("dest"))
    }

    fn recording_action(name: &str, calls: &Arc<Mutex<Vec<String>>>) -> Action {
        let calls = Arc::clone(calls);
        let label = name.to_string();
        Action::inline(name, move || {
            calls.lock().unwrap().push(label.clone());
            Ok(())
        })
    }

    fn failing_action(name: &str) -> Action {
        Action::inline(name, || anyhow::bail!("boom"))
    }

    // -----------------------------------------------------------------------
    // declaration
    // -----------------------------------------------------------------------

    #[test]
    fn add_file_defaults_dest_to_src() {
        let mut m = Module::new("m", PathBuf::from("."), PathBuf::from("/home/u"));
        m.add_file(".zshrc", None, false);
        m.add_file("useful_cmd", Some(PathBuf::from(".bin/useful_cmd")), true);
        assert_eq!(m.files()[0], FileEntry::new(".zshrc", ".zshrc", false));
        assert_eq!(
            m.files()[1],
            FileEntry::new("useful_cmd", ".bin/useful_cmd", true)
        );
    }

    #[test]
    fn absolute_paths_are_not_rebased() {
        let m = Module::new("m", PathBuf::from("/repo"), PathBuf::from("/home/u"));
        let file = FileEntry::new("/etc/hosts", "/tmp/out", false);
        assert_eq!(m.src_path(&file), PathBuf::from("/etc/hosts"));
        assert_eq!(m.dest_path(&file), PathBuf::from("/tmp/out"));
    }

    #[test]
    fn add_glob_preserves_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("src");
        std::fs::create_dir_all(root.join("bin")).unwrap();
        std::fs::write(root.join("bin/a"), "a").unwrap();
        std::fs::write(root.join("bin/b"), "b").unwrap();
        std::fs::write(root.join("other"), "x").unwrap();

        let mut m = module_in(dir.path());
        let added = m.add_glob("bin/*", None, false).unwrap();
        assert_eq!(added, 2);
        assert_eq!(m.files()[0], FileEntry::new("bin/a", "bin/a", false));
        assert_eq!(m.files()[1], FileEntry::new("bin/b", "bin/b", false));
    }

    #[test]
    fn add_glob_places_basenames_under_dest_dir() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("src");
        std::fs::create_dir_all(root.join("scripts")).unwrap();
        std::fs::write(root.join("scripts/run.sh"), "").unwrap();

        let mut m = module_in(dir.path());
        m.add_glob("scripts/*.sh", Some(Path::new(".bin")), true)
            .unwrap();
        assert_eq!(
            m.files(),
            &[FileEntry::new("scripts/run.sh", ".bin/run.sh", true)]
        );
    }

    #[test]
    fn add_glob_treats_root_as_literal_text() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("dotfiles[old]");
        std::fs::create_dir_all(root.join("bin")).unwrap();
        std::fs::write(root.join("bin/a"), "a").unwrap();

        let mut m = Module::new("m", root, dir.path().join("dest"));
        assert_eq!(m.add_glob("bin/*", None, false).unwrap(), 1);
        assert_eq!(m.files(), &[FileEntry::new("bin/a", "bin/a", false)]);
    }

    #[test]
    fn add_glob_under_relative_root() {
        let dir = tempfile::tempdir_in(".").unwrap();
        let name = dir.path().file_name().unwrap();
        let root = Path::new(".").join(name);
        std::fs::create_dir_all(root.join("bin")).unwrap();
        std::fs::write(root.join("bin/a"), "a").unwrap();

        let mut m = Module::new("m", root, PathBuf::from("dest"));
        assert_eq!(m.add_glob("bin/*", None, false).unwrap(), 1);
        assert_eq!(m.files(), &[FileEntry::new("bin/a", "bin/a", false)]);
    }

    #[test]
    fn glob_matches_are_relative_to_a_dotted_root() {
        let root = Path::new(".");
        assert_eq!(
            relative_to_root(Path::new("bin/a"), root),
            Some(PathBuf::from("bin/a"))
        );
        assert_eq!(
            relative_to_root(Path::new("./bin/a"), root),
            Some(PathBuf::from("bin/a"))
        );
        assert_eq!(
            relative_to_root(Path::new("repo/bin/a"), Path::new("./repo")),
            Some(PathBuf::from("bin/a"))
        );
        assert_eq!(relative_to_root(Path::new("/elsewhere/a"), Path::new("/repo")), None);
    }

    #[test]
    fn add_glob_rejects_bad_pattern() {
        let mut m = Module::new("m", PathBuf::from("."), PathBuf::from("."));
        let err = m.add_glob("a/[", None, false).unwrap_err();
        assert!(err.message.contains("invalid glob pattern"));
    }

    #[test]
    fn package_dependencies_are_deduplicated_in_order() {
        let mut m = Module::new("m", PathBuf::from("."), PathBuf::from("."));
        m.add_package_dependency(["zsh", "python"]);
        m.add_package_dependency(["zsh", "git"]);
        assert_eq!(m.package_dependencies(), &["zsh", "python", "git"]);
    }

    // -----------------------------------------------------------------------
    // all_dependencies
    // -----------------------------------------------------------------------

    #[test]
    fn all_dependencies_includes_self_and_transitive() {
        let mut registry = Registry::default();
        registry.declare("a", ["b"]);
        registry.declare("b", ["c"]);
        registry.declare("c", Vec::<ModuleId>::new());
        registry.declare("d", Vec::<ModuleId>::new());

        let deps = registry.get("a").unwrap().all_dependencies(&registry);
        let expected: Vec<ModuleId> = vec!["a".into(), "b".into(), "c".into()];
        assert_eq!(deps, expected);
    }

    #[test]
    fn all_dependencies_terminates_on_cycle() {
        let mut registry = Registry::default();
        registry.declare("a", ["b"]);
        registry.declare("b", ["c"]);
        registry.declare("c", ["a"]);

        let deps = registry.get("a").unwrap().all_dependencies(&registry);
        assert_eq!(deps.len(), 3);
        assert_eq!(deps[0], ModuleId::from("a"));
    }

    #[test]
    fn all_dependencies_self_loop() {
        let mut registry = Registry::default();
        registry.declare("a", ["a"]);
        let deps = registry.get("a").unwrap().all_dependencies(&registry);
        assert_eq!(deps, vec![ModuleId::from("a")]);
    }

    // -----------------------------------------------------------------------
    // execute_install
    // -----------------------------------------------------------------------

    #[test]
    fn install_copies_files_then_runs_actions_in_order() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        std::fs::write(dir.path().join("src/filea"), "some contents").unwrap();

        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut m = module_in(dir.path());
        m.add_file("filea", None, false);
        m.on_install(recording_action("first", &calls));
        m.on_install(recording_action("second", &calls));

        let (ctx, _log) = make_context(Registry::default());
        let report = m.execute_install(&ctx).unwrap();

        assert!(report.is_clean());
        assert_eq!(
            std::fs::read_to_string(dir.path().join("dest/filea")).unwrap(),
            "some contents"
        );
        assert_eq!(*calls.lock().unwrap(), vec!["first", "second"]);
    }

    #[test]
    fn failing_action_abandons_remaining_actions() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut m = Module::new("m", PathBuf::from("."), PathBuf::from("."));
        m.on_install(failing_action("first"));
        m.on_install(recording_action("second", &calls));

        let (ctx, _log) = make_context(Registry::default());
        let err = m.execute_install(&ctx).unwrap_err();

        assert!(matches!(err, ActionError::Failed { ref action, .. } if action == "first"));
        assert!(calls.lock().unwrap().is_empty());
    }

    #[test]
    fn ignore_errors_runs_every_action_and_reports_failure() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut m = Module::new("m", PathBuf::from("."), PathBuf::from("."));
        m.on_install(failing_action("first"));
        m.on_install(recording_action("second", &calls));

        let options = Options {
            ignore_errors: true,
            ..Options::default()
        };
        let (ctx, _log) = make_context_with(Registry::default(), options);
        let report = m.execute_install(&ctx).unwrap();

        assert_eq!(report.ignored.len(), 1);
        assert_eq!(*calls.lock().unwrap(), vec!["second"]);
    }

    #[test]
    fn missing_source_file_fails_before_actions() {
        let dir = tempfile::tempdir().unwrap();
        let ran = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&ran);

        let mut m = module_in(dir.path());
        m.add_file("missing", None, false);
        m.on_install(Action::inline("count", move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }));

        let (ctx, _log) = make_context(Registry::default());
        let err = m.execute_install(&ctx).unwrap_err();
        match err {
            ActionError::FileInstall(e) => {
                assert_eq!(e.file.src, PathBuf::from("missing"));
                assert!(e.message.contains("missing source file"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(ran.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn install_without_packages_flag_skips_package_step() {
        let mut registry = Registry::default();
        let called = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&called);
        registry.register_installer(package::InstallerRecord::inline("test", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            true
        }));

        let mut m = Module::new("m", PathBuf::from("."), PathBuf::from("."));
        m.add_package_dependency(["zsh"]);

        let (ctx, _log) = make_context(registry);
        m.execute_install(&ctx).unwrap();
        assert_eq!(called.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn install_with_packages_resolves_names_and_calls_installer() {
        let mut registry = Registry::default();
        let received = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&received);
        registry.register_installer(package::InstallerRecord::inline("my_installer", move |pkgs| {
            sink.lock().unwrap().extend(pkgs.iter().cloned());
            true
        }));
        registry.register_package(
            package::PackageRecord::new("test_package").with_system("my_installer", "other_name"),
        );

        let mut m = Module::new("m", PathBuf::from("."), PathBuf::from("."));
        m.add_package_dependency(["test_package", "plain"]);

        let options = Options {
            install_packages: true,
            system: Some("my_installer".to_string()),
            ..Options::default()
        };
        let (ctx, _log) = make_context_with(registry, options);
        m.execute_install(&ctx).unwrap();
        assert_eq!(*received.lock().unwrap(), vec!["other_name", "plain"]);
    }

    // -----------------------------------------------------------------------
    // execute_update
    // -----------------------------------------------------------------------

    #[test]
    fn update_reinstalls_files_and_runs_update_actions_only() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        std::fs::write(dir.path().join("src/f"), "v2").unwrap();
        std::fs::create_dir_all(dir.path().join("dest")).unwrap();
        std::fs::write(dir.path().join("dest/f"), "v1").unwrap();

        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut m = module_in(dir.path());
        m.add_file("f", None, false);
        m.on_install(recording_action("install", &calls));
        m.on_update(recording_action("update", &calls));

        let (ctx, _log) = make_context(Registry::default());
        m.execute_update(&ctx).unwrap();

        assert_eq!(
            std::fs::read_to_string(dir.path().join("dest/f")).unwrap(),
            "v2"
        );
        assert_eq!(*calls.lock().unwrap(), vec!["update"]);
    }

    // -----------------------------------------------------------------------
    // execute_uninstall
    // -----------------------------------------------------------------------

    #[test]
    fn uninstall_non_interactive_removes_files_and_empty_parents() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("dest");
        std::fs::create_dir_all(dest.join(".config/app")).unwrap();
        std::fs::write(dest.join(".config/app/conf"), "x").unwrap();

        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut m = module_in(dir.path());
        m.add_file("conf", Some(PathBuf::from(".config/app/conf")), false);
        m.on_uninstall(recording_action("cleanup", &calls));

        let options = Options {
            interactive: false,
            ..Options::default()
        };
        let (ctx, _log) = make_context_with(Registry::default(), options);
        m.execute_uninstall(&ctx).unwrap();

        assert!(!dest.join(".config").exists());
        assert!(dest.exists(), "install dir itself must be kept");
        assert_eq!(*calls.lock().unwrap(), vec!["cleanup"]);
    }

    #[test]
    fn uninstall_of_merged_directory_keeps_unrelated_entries() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        let dest = dir.path().join("dest");
        std::fs::create_dir_all(src.join(".config/mine")).unwrap();
        std::fs::write(src.join(".config/mine/conf"), "x").unwrap();
        std::fs::create_dir_all(dest.join(".config")).unwrap();
        std::fs::write(dest.join(".config/users_own"), "keep").unwrap();

        let mut m = module_in(dir.path());
        m.add_file(".config", None, false);
        let options = Options {
            interactive: false,
            ..Options::default()
        };
        let (ctx, _log) = make_context_with(Registry::default(), options);

        m.execute_install(&ctx).unwrap();
        assert!(dest.join(".config/mine/conf").exists());

        m.execute_uninstall(&ctx).unwrap();
        assert!(!dest.join(".config/mine").exists());
        assert_eq!(
            std::fs::read_to_string(dest.join(".config/users_own")).unwrap(),
            "keep"
        );
    }

    #[test]
    fn uninstall_keeps_directory_whose_source_is_gone() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("dest");
        std::fs::create_dir_all(dest.join(".config")).unwrap();
        std::fs::write(dest.join(".config/users_own"), "keep").unwrap();

        let mut m = module_in(dir.path());
        m.add_file(".config", None, false);
        let options = Options {
            interactive: false,
            ..Options::default()
        };
        let (ctx, _log) = make_context_with(Registry::default(), options);

        m.execute_uninstall(&ctx).unwrap();
        assert!(dest.join(".config/users_own").exists());
    }

    #[test]
    fn uninstall_declined_keeps_file() {
        use crate::prompt::MockPrompter;

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("dest");
        std::fs::create_dir_all(&dest).unwrap();
        std::fs::write(dest.join("f"), "x").unwrap();

        let mut m = module_in(dir.path());
        m.add_file("f", None, false);

        let mut prompter = MockPrompter::new();
        prompter
            .expect_ask_yes_no()
            .withf(|prompt, default| prompt.starts_with("Delete") && !*default)
            .times(1)
            .return_const(false);

        let (ctx, _log) = make_context(Registry::default());
        let ctx = ctx.with_prompter(Arc::new(prompter));
        m.execute_uninstall(&ctx).unwrap();
        assert!(dest.join("f").exists());
    }

    #[test]
    fn uninstall_skips_files_that_are_not_installed() {
        let dir = tempfile::tempdir().unwrap();
        let mut m = module_in(dir.path());
        m.add_file("never-installed", None, false);

        let (ctx, _log) = make_context(Registry::default());
        assert!(m.execute_uninstall(&ctx).unwrap().is_clean());
    }
}
