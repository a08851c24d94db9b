//! Load phase: read the configuration file and populate a [`Registry`].
pub mod settings;
pub mod stdlib;
pub mod toml_loader;
pub mod validation;

pub use settings::Settings;

use anyhow::{Context as _, Result};
use std::path::{Path, PathBuf};

use crate::error::SyntaxError;
use crate::modules::commands::CommandTemplate;
use crate::modules::{Action, Module};
use crate::registry::Registry;
use crate::resources::package::{InstallerRecord, PackageRecord};
use toml_loader::{ConfigFile, FileSpec, FileTable, ModuleSpec};

/// File names searched for in the current directory, in order.
pub const CONFIG_FILES: &[&str] = &["tildeconfig.toml", ".tildeconfig.toml"];

/// A loaded and validated configuration.
#[derive(Debug)]
pub struct LoadedConfig {
    /// The file that was read.
    pub path: PathBuf,
    /// Everything the file declares.
    pub registry: Registry,
    /// Global settings.
    pub settings: Settings,
}

/// Return the first of [`CONFIG_FILES`] present in `dir`.
#[must_use]
pub fn find_config_file(dir: &Path) -> Option<PathBuf> {
    CONFIG_FILES
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.is_file())
}

/// Read, populate, and validate the configuration at `path`.
///
/// Relative module root directories resolve against the file's directory;
/// relative install directories resolve against `home`.
///
/// # Errors
///
/// Returns an error if the file cannot be read, is malformed, or describes an
/// inconsistent module graph.
pub fn load(path: &Path, home: &Path) -> Result<LoadedConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading config file: {}", path.display()))?;
    let file = toml_loader::parse(&content)
        .with_context(|| format!("parsing config file: {}", path.display()))?;

    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let config_dir = dunce::canonicalize(dir).unwrap_or_else(|_| dir.to_path_buf());

    let (registry, settings) = build_registry(file, &config_dir, home)
        .with_context(|| format!("loading config file: {}", path.display()))?;
    validation::validate(&registry)?;

    Ok(LoadedConfig {
        path: path.to_path_buf(),
        registry,
        settings,
    })
}

/// Populate a registry from a parsed configuration file.
///
/// Predefined installers are registered first so the file can replace them;
/// commands are defined before modules so modules can `use` them.
///
/// # Errors
///
/// Returns a [`SyntaxError`] for malformed declarations.
pub fn build_registry(
    file: ConfigFile,
    config_dir: &Path,
    home: &Path,
) -> Result<(Registry, Settings), SyntaxError> {
    let mut registry = Registry::new(config_dir.to_path_buf(), home.to_path_buf());
    stdlib::define_standard_library(&mut registry);

    for installer in file.installer {
        if installer.command.trim().is_empty() {
            return Err(SyntaxError::new(format!(
                "installer {} has an empty command",
                installer.system
            )));
        }
        registry.register_installer(InstallerRecord::command(installer.system, installer.command));
    }

    for package in file.package {
        let record = package
            .systems
            .into_iter()
            .fold(PackageRecord::new(package.name), |record, (system, name)| {
                record.with_system(system, name)
            });
        registry.register_package(record);
    }

    for command in file.command {
        let name = command.name.clone();
        let compiled = CommandTemplate::from(command).compile(&name)?;
        registry.define_command(name, compiled);
    }

    for module in file.module {
        apply_module(&mut registry, module, config_dir, home)?;
    }

    Ok((registry, file.settings))
}

fn apply_module(
    registry: &mut Registry,
    spec: ModuleSpec,
    config_dir: &Path,
    home: &Path,
) -> Result<(), SyntaxError> {
    if spec.name.trim().is_empty() {
        return Err(SyntaxError::new("module name must not be empty"));
    }

    let module = registry.declare(spec.name.as_str(), spec.depends.iter().map(String::as_str));
    if let Some(root) = &spec.root_dir {
        let root = expand_tilde(root, home);
        module.set_root_dir(if root.is_absolute() {
            root
        } else {
            config_dir.join(root)
        });
    }
    if let Some(install) = &spec.install_dir {
        module.set_install_dir(home.join(expand_tilde(install, home)));
    }
    module.add_package_dependency(spec.packages);
    for file in spec.files {
        apply_file(module, file, home)
            .map_err(|e| SyntaxError::new(format!("module {}: {}", spec.name, e.message)))?;
    }

    let queue = |commands: Vec<String>| -> Result<Vec<Action>, SyntaxError> {
        commands
            .into_iter()
            .map(|command| {
                Action::shell(command).map_err(|e| {
                    SyntaxError::new(format!("module {}: {}", spec.name, e.message))
                })
            })
            .collect()
    };
    for action in queue(spec.install)? {
        module.on_install(action);
    }
    for action in queue(spec.uninstall)? {
        module.on_uninstall(action);
    }
    for action in queue(spec.update)? {
        module.on_update(action);
    }

    for used in spec.uses {
        registry.invoke_command(&used.command, spec.name.as_str(), &used.args)?;
    }
    Ok(())
}

fn apply_file(module: &mut Module, file: FileSpec, home: &Path) -> Result<(), SyntaxError> {
    match file {
        FileSpec::Path(src) => module.add_file(src, None, false),
        FileSpec::Detailed(FileTable {
            src,
            glob,
            dest,
            symlink,
        }) => {
            let dest = dest.map(|d| expand_tilde(&d, home));
            match (src, glob) {
                (Some(src), None) => module.add_file(src, dest, symlink),
                (None, Some(pattern)) => {
                    let added = module.add_glob(&pattern, dest.as_deref(), symlink)?;
                    if added == 0 {
                        tracing::warn!("glob {pattern} matched nothing");
                    }
                }
                (Some(_), Some(_)) => {
                    return Err(SyntaxError::new("file entry has both src and glob"));
                }
                (None, None) => return Err(SyntaxError::new("file entry needs src or glob")),
            }
        }
    }
    Ok(())
}

/// Replace a leading `~` with `home`.
fn expand_tilde(path: &str, home: &Path) -> PathBuf {
    if path == "~" {
        return home.to_path_buf();
    }
    path.strip_prefix("~/")
        .map_or_else(|| PathBuf::from(path), |rest| home.join(rest))
}
