//! Reverse sync: pull installed files back into the repository.
use std::path::{Path, PathBuf};

use super::{Context, FileEntry, Module, StepReport};
use crate::error::{ActionError, FileInstallError};
use crate::resources::fs;

const COPY: &str = "copy";
const SKIP: &str = "skip";
const DIFF: &str = "diff";

impl Module {
    /// Copy installed files that differ from the repository back over their
    /// sources, asking per file in interactive runs.
    ///
    /// Symlinked entries are skipped since they already point at the source.
    ///
    /// # Errors
    ///
    /// Returns the first failing copy unless ignore-errors is set.
    pub fn execute_refresh(&self, ctx: &Context) -> Result<StepReport, ActionError> {
        let mut report = StepReport::default();
        for file in self.files.iter().filter(|f| !f.is_symlink) {
            report.attempt(ctx, self.refresh_entry(ctx, file))?;
        }
        Ok(report)
    }

    fn refresh_entry(&self, ctx: &Context, file: &FileEntry) -> Result<(), ActionError> {
        let src = self.src_path(file);
        let dest = self.dest_path(file);
        if !src.exists() {
            ctx.log
                .warn(&format!("{} does not exist, skipping", src.display()));
            return Ok(());
        }
        if !dest.exists() {
            ctx.log
                .warn(&format!("{} is not installed, skipping", dest.display()));
            return Ok(());
        }
        match (src.is_dir(), dest.is_dir()) {
            (false, false) => refresh_file(ctx, file, &src, &dest),
            (true, true) => refresh_dir(ctx, file, &src, &dest),
            _ => {
                ctx.log.warn(&format!(
                    "{} and {} are not the same kind of file, skipping",
                    src.display(),
                    dest.display()
                ));
                Ok(())
            }
        }
    }
}

/// Walk an installed directory, refreshing files present on both sides and
/// offering to pull installed-only entries into the repository.
fn refresh_dir(ctx: &Context, file: &FileEntry, src: &Path, dest: &Path) -> Result<(), ActionError> {
    let mut work: Vec<(PathBuf, PathBuf)> = vec![(src.to_path_buf(), dest.to_path_buf())];
    while let Some((src_dir, dest_dir)) = work.pop() {
        for name in sorted_entries(&dest_dir).map_err(|e| failure(file, &dest_dir, e))? {
            let s = src_dir.join(&name);
            let d = dest_dir.join(&name);
            if !s.exists() {
                let prompt = format!(
                    "Pull {} into repository as {}?",
                    d.display(),
                    s.display()
                );
                if !ctx.options.interactive || ctx.prompter.ask_yes_no(&prompt, false) {
                    pull(ctx, file, &s, &d)?;
                }
            } else if s.is_dir() && d.is_dir() {
                work.push((s, d));
            } else if !s.is_dir() && !d.is_dir() {
                refresh_file(ctx, file, &s, &d)?;
            } else {
                ctx.log.warn(&format!(
                    "{} and {} are not the same kind of file, skipping",
                    s.display(),
                    d.display()
                ));
            }
        }
    }
    Ok(())
}

fn refresh_file(ctx: &Context, file: &FileEntry, src: &Path, dest: &Path) -> Result<(), ActionError> {
    let identical = fs::files_identical(src, dest).map_err(|e| failure(file, dest, format!("{e:#}")))?;
    if identical {
        ctx.log
            .debug(&format!("{} is unchanged", dest.display()));
        return Ok(());
    }
    if !ctx.options.interactive {
        return pull(ctx, file, src, dest);
    }

    let options = [COPY.to_string(), SKIP.to_string(), DIFF.to_string()];
    let prompt = format!("{} has changed. Refresh?", dest.display());
    loop {
        match ctx
            .prompter
            .ask_with_options(&prompt, &options, Some(SKIP.to_string()))
            .as_str()
        {
            COPY => return pull(ctx, file, src, dest),
            DIFF => show_diff(ctx, src, dest),
            _ => {
                ctx.log.info(&format!("skipping {}", dest.display()));
                return Ok(());
            }
        }
    }
}

/// Run the configured diff command. Its exit status is ignored since diff
/// tools exit non-zero when files differ.
fn show_diff(ctx: &Context, src: &Path, dest: &Path) {
    let command = ctx.settings.diff_command_for(src, dest);
    if let Err(e) = ctx.executor.run_shell(&command) {
        ctx.log.warn(&format!("cannot run diff command: {e}"));
    }
}

/// Copy the installed `dest` over the repository `src`.
fn pull(ctx: &Context, file: &FileEntry, src: &Path, dest: &Path) -> Result<(), ActionError> {
    ctx.log
        .info(&format!("copying {} to {}", dest.display(), src.display()));
    let copied = if dest.is_dir() {
        fs::copy_dir_recursive(dest, src)
    } else {
        fs::ensure_parent_dir(src).and_then(|()| {
            std::fs::copy(dest, src)
                .map(drop)
                .map_err(anyhow::Error::from)
        })
    };
    copied.map_err(|e| failure(file, src, format!("{e:#}")))
}

fn sorted_entries(dir: &Path) -> Result<Vec<std::ffi::OsString>, String> {
    let mut names = std::fs::read_dir(dir)
        .and_then(|entries| entries.map(|e| e.map(|e| e.file_name())).collect::<Result<Vec<_>, _>>())
        .map_err(|e| format!("reading {}: {e}", dir.display()))?;
    names.sort();
    Ok(names)
}

fn failure(file: &FileEntry, path: &Path, message: String) -> ActionError {
    FileInstallError::new(file, path, message).into()
}
