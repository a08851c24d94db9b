//! The registry of modules, installers, packages, and custom commands built
//! during the load phase.
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{RegistryError, SyntaxError};
use crate::modules::commands::CommandFn;
use crate::modules::{Module, ModuleId};
use crate::resources::package::{InstallerRecord, PackageRecord};

/// Everything a configuration declares.
///
/// Modules keep registration order, which is the tie-breaker for dependency
/// ordering and the order of `refresh`.
pub struct Registry {
    modules: Vec<Module>,
    index: HashMap<ModuleId, usize>,
    installers: BTreeMap<String, InstallerRecord>,
    packages: HashMap<String, PackageRecord>,
    commands: BTreeMap<String, CommandFn>,
    default_root: PathBuf,
    default_install: PathBuf,
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("modules", &self.module_ids())
            .field("installers", &self.installers.keys().collect::<Vec<_>>())
            .field("packages", &self.packages.len())
            .field("commands", &self.commands.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl Default for Registry {
    /// Registry whose modules default to the current directory as root and
    /// `$HOME` as install directory.
    fn default() -> Self {
        Self::new(PathBuf::from("."), home_dir())
    }
}

/// The user's home directory, falling back to the current directory.
#[must_use]
pub fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map_or_else(|| PathBuf::from("."), PathBuf::from)
}

impl Registry {
    /// Empty registry with the given module defaults.
    #[must_use]
    pub fn new(default_root: PathBuf, default_install: PathBuf) -> Self {
        Self {
            modules: Vec::new(),
            index: HashMap::new(),
            installers: BTreeMap::new(),
            packages: HashMap::new(),
            commands: BTreeMap::new(),
            default_root,
            default_install,
        }
    }

    /// Root directory given to newly registered modules.
    #[must_use]
    pub fn default_root(&self) -> &Path {
        &self.default_root
    }

    /// Install directory given to newly registered modules.
    #[must_use]
    pub fn default_install(&self) -> &Path {
        &self.default_install
    }

    /// Fetch the module `id`, registering an empty one first if needed.
    pub fn module(&mut self, id: impl Into<ModuleId>) -> &mut Module {
        let id = id.into();
        let idx = match self.index.get(&id) {
            Some(&idx) => idx,
            None => {
                let idx = self.modules.len();
                self.modules.push(Module::new(
                    id.clone(),
                    self.default_root.clone(),
                    self.default_install.clone(),
                ));
                self.index.insert(id, idx);
                idx
            }
        };
        // Entries are only ever appended, so every index is in bounds.
        #[allow(clippy::indexing_slicing)]
        &mut self.modules[idx]
    }

    /// Fetch or register `id` and union `deps` into its dependencies.
    pub fn declare<I, D>(&mut self, id: impl Into<ModuleId>, deps: I) -> &mut Module
    where
        I: IntoIterator<Item = D>,
        D: Into<ModuleId>,
    {
        let module = self.module(id);
        module.add_dependencies(deps);
        module
    }

    /// Look up a registered module.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotFound`] if `id` is not registered.
    pub fn get(&self, id: &str) -> Result<&Module, RegistryError> {
        self.index
            .get(id)
            .and_then(|&idx| self.modules.get(idx))
            .ok_or_else(|| not_found("module", id))
    }

    /// `true` if `id` is registered.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Modules in registration order.
    pub fn modules(&self) -> impl Iterator<Item = &Module> {
        self.modules.iter()
    }

    /// Module ids in registration order.
    #[must_use]
    pub fn module_ids(&self) -> Vec<ModuleId> {
        self.modules.iter().map(|m| m.id().clone()).collect()
    }

    /// Register `installer`, replacing any installer for the same system.
    pub fn register_installer(&mut self, installer: InstallerRecord) {
        self.installers.insert(installer.system.clone(), installer);
    }

    /// Look up the installer for `system`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotFound`] if no installer is registered.
    pub fn installer(&self, system: &str) -> Result<&InstallerRecord, RegistryError> {
        self.installers
            .get(system)
            .ok_or_else(|| not_found("installer", system))
    }

    /// Registered installers, sorted by system name.
    pub fn installers(&self) -> impl Iterator<Item = &InstallerRecord> {
        self.installers.values()
    }

    /// Register `package`, replacing any package with the same name.
    pub fn register_package(&mut self, package: PackageRecord) {
        self.packages.insert(package.name.clone(), package);
    }

    /// Look up a package record.
    #[must_use]
    pub fn package(&self, name: &str) -> Option<&PackageRecord> {
        self.packages.get(name)
    }

    /// Define (or redefine) the custom command `name`.
    pub fn define_command(&mut self, name: impl Into<String>, command: CommandFn) {
        self.commands.insert(name.into(), command);
    }

    /// Look up a custom command.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotFound`] if `name` was never defined.
    pub fn command(&self, name: &str) -> Result<CommandFn, RegistryError> {
        self.commands
            .get(name)
            .cloned()
            .ok_or_else(|| not_found("command", name))
    }

    /// Apply the custom command `name` with `args` to `module` (registering
    /// the module if needed).
    ///
    /// # Errors
    ///
    /// Returns a [`SyntaxError`] if the command is undefined or rejects its
    /// arguments.
    pub fn invoke_command(
        &mut self,
        name: &str,
        module: impl Into<ModuleId>,
        args: &[String],
    ) -> Result<(), SyntaxError> {
        let command = self
            .command(name)
            .map_err(|_| SyntaxError::new(format!("undefined command {name}")))?;
        command(self.module(module), args)
    }
}

fn not_found(kind: &'static str, name: &str) -> RegistryError {
    RegistryError::NotFound {
        kind,
        name: name.to_string(),
    }
}
