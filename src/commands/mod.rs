pub mod completions;
pub mod install;
pub mod refresh;
pub mod systems;
pub mod uninstall;
pub mod update;
pub mod version;

use anyhow::{Context as _, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::cli::{GlobalOpts, ModuleArgs};
use crate::config::{self, LoadedConfig};
use crate::error::RunError;
use crate::logging::{Log, Logger};
use crate::modules::{Context, ModuleId};
use crate::registry::home_dir;

/// Module operation entry point run by a subcommand.
pub type OperationFn = fn(&Context, &[ModuleId]) -> Result<(), RunError>;

/// Shared state produced by the common command setup sequence.
///
/// Locates and loads the configuration file so that each command does not
/// have to repeat the boilerplate.
#[derive(Debug)]
pub struct CommandSetup {
    /// The loaded configuration and the registry built from it.
    pub config: LoadedConfig,
}

impl CommandSetup {
    /// Locate, load, and validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if no configuration file is found or it fails to load.
    pub fn init(global: &GlobalOpts, log: &Logger) -> Result<Self> {
        let cwd = std::env::current_dir().context("determining current directory")?;
        let path = resolve_config_path(global, &cwd)?;

        log.stage("Loading configuration");
        let config = config::load(&path, &home_dir())?;
        log.info(&format!(
            "loaded {} modules from {}",
            config.registry.module_ids().len(),
            path.display()
        ));
        log.debug(&format!(
            "{} installers",
            config.registry.installers().count()
        ));

        Ok(Self { config })
    }

    /// Build the run context for `global`'s options.
    #[must_use]
    pub fn into_context(self, global: &GlobalOpts, log: Arc<dyn Log>) -> Context {
        Context::for_system(
            self.config.registry,
            global.options(),
            self.config.settings,
            log,
        )
    }
}

/// Resolve the configuration file from `--config` or the first default name
/// present in `cwd`.
///
/// # Errors
///
/// Returns an error if `--config` is not given and no default file exists.
pub fn resolve_config_path(global: &GlobalOpts, cwd: &Path) -> Result<PathBuf> {
    if let Some(path) = &global.config {
        return Ok(path.clone());
    }
    config::find_config_file(cwd).ok_or_else(|| {
        anyhow::anyhow!(
            "no configuration file found in {}; expected one of: {}",
            cwd.display(),
            config::CONFIG_FILES.join(", ")
        )
    })
}

/// Load the configuration, run `operation` on the requested modules, and
/// print the summary.
///
/// # Errors
///
/// Returns an error if setup fails, the run is invalid, or a module fails.
pub fn run_modules(
    global: &GlobalOpts,
    args: &ModuleArgs,
    log: &Arc<Logger>,
    operation: OperationFn,
) -> Result<()> {
    let setup = CommandSetup::init(global, log)?;
    let ctx = setup.into_context(global, Arc::clone(log) as Arc<dyn Log>);

    let result = operation(&ctx, &args.ids());
    log.print_summary();
    result?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::Parser;

    fn global(args: &[&str]) -> GlobalOpts {
        let mut argv = vec!["tildeconfig"];
        argv.extend_from_slice(args);
        argv.push("install");
        Cli::parse_from(argv).global
    }

    #[test]
    fn explicit_config_path_wins() {
        let dir = tempfile::tempdir().unwrap();
        let path = resolve_config_path(&global(&["-c", "/elsewhere/x.toml"]), dir.path()).unwrap();
        assert_eq!(path, PathBuf::from("/elsewhere/x.toml"));
    }

    #[test]
    fn default_config_path_is_found_in_cwd() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("tildeconfig.toml"), "").unwrap();
        let path = resolve_config_path(&global(&[]), dir.path()).unwrap();
        assert_eq!(path, dir.path().join("tildeconfig.toml"));
    }

    #[test]
    fn missing_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = resolve_config_path(&global(&[]), dir.path()).unwrap_err();
        assert!(err.to_string().contains("no configuration file found"));
    }

    #[test]
    fn context_uses_flag_options() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tildeconfig.toml");
        std::fs::write(&path, "[[module]]\nname = \"m\"\n").unwrap();

        let global = global(&["-c", path.to_str().unwrap(), "-n", "--ignore-errors"]);
        let log = Arc::new(Logger::new("test"));
        let setup = CommandSetup::init(&global, &log).unwrap();
        let ctx = setup.into_context(&global, log);
        assert!(ctx.registry().contains("m"));
        assert!(!ctx.options.interactive);
        assert!(ctx.options.ignore_errors);
    }
}
