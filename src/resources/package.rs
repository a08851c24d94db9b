//! System package installers and package name resolution.
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::error::PackageInstallError;
use crate::exec::Executor;
use crate::logging::Log;
use crate::registry::Registry;

/// Native installer body: receives the system-specific package names and
/// reports success.
pub type InstallFn = Arc<dyn Fn(&[String]) -> bool + Send + Sync>;

/// How an installer installs a batch of packages.
#[derive(Clone)]
pub enum InstallMethod {
    /// Run `<command> <pkg> <pkg> ...` through the shell.
    Command(String),
    /// Call a native closure.
    Inline(InstallFn),
}

impl fmt::Debug for InstallMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Command(cmd) => f.debug_tuple("Command").field(cmd).finish(),
            Self::Inline(_) => f.write_str("Inline(<fn>)"),
        }
    }
}

/// The mechanism that installs packages on one system.
#[derive(Debug, Clone)]
pub struct InstallerRecord {
    /// System name (e.g. `ubuntu`).
    pub system: String,
    /// Install mechanism.
    pub method: InstallMethod,
}

impl InstallerRecord {
    /// An installer that appends package names to a shell command prefix.
    #[must_use]
    pub fn command(system: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            method: InstallMethod::Command(command.into()),
        }
    }

    /// An installer backed by a closure.
    #[must_use]
    pub fn inline(
        system: impl Into<String>,
        install: impl Fn(&[String]) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            system: system.into(),
            method: InstallMethod::Inline(Arc::new(install)),
        }
    }

    /// The package manager program this installer runs, skipping `sudo`.
    ///
    /// `None` for inline installers.
    #[must_use]
    pub fn program(&self) -> Option<&str> {
        match &self.method {
            InstallMethod::Command(cmd) => cmd.split_whitespace().find(|w| *w != "sudo"),
            InstallMethod::Inline(_) => None,
        }
    }

    /// Install `packages` in one batch. Returns `true` on success.
    pub fn install(&self, packages: &[String], executor: &dyn Executor, log: &dyn Log) -> bool {
        match &self.method {
            InstallMethod::Command(prefix) => {
                let command = format!("{prefix} {}", packages.join(" "));
                log.info(&format!("$ {command}"));
                executor
                    .run_shell(&command)
                    .is_ok_and(|result| result.success)
            }
            InstallMethod::Inline(install) => install(packages),
        }
    }
}

/// An abstract package with optional per-system names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageRecord {
    /// Abstract package name.
    pub name: String,
    system_names: BTreeMap<String, String>,
}

impl PackageRecord {
    /// A package with no system-specific names.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            system_names: BTreeMap::new(),
        }
    }

    /// Set the package's name on `system`.
    #[must_use]
    pub fn with_system(mut self, system: impl Into<String>, name: impl Into<String>) -> Self {
        self.system_names.insert(system.into(), name.into());
        self
    }

    /// The package's name on `system`, if declared.
    #[must_use]
    pub fn name_for_system(&self, system: &str) -> Option<&str> {
        self.system_names.get(system).map(String::as_str)
    }
}

/// Resolve the name of `package` on `system`.
///
/// Falls back to the abstract name (with a warning) when no package record or
/// no system-specific name exists.
#[must_use]
pub fn find_package_name(registry: &Registry, package: &str, system: &str, log: &dyn Log) -> String {
    match registry.package(package) {
        Some(record) => {
            if let Some(name) = record.name_for_system(system) {
                return name.to_string();
            }
            log.warn(&format!(
                "package {package} has no name on system {system}, using {package}"
            ));
        }
        None => log.warn(&format!(
            "package {package} is not defined, using its name as-is"
        )),
    }
    package.to_string()
}

/// Resolve `packages` for `system` and install them in one batch.
///
/// # Errors
///
/// Returns [`PackageInstallError`] listing every requested package if the
/// system has no installer or the installer reports failure.
pub fn install_packages(
    registry: &Registry,
    system: &str,
    packages: &[String],
    executor: &dyn Executor,
    log: &dyn Log,
) -> Result<(), PackageInstallError> {
    let failure = || PackageInstallError {
        packages: packages.to_vec(),
        system: system.to_string(),
    };

    let installer = registry.installer(system).map_err(|e| {
        log.error(&e.to_string());
        failure()
    })?;

    let names: Vec<String> = packages
        .iter()
        .map(|p| find_package_name(registry, p, system, log))
        .collect();
    log.info(&format!("installing packages: {}", names.join(", ")));

    if installer.install(&names, executor, log) {
        Ok(())
    } else {
        Err(failure())
    }
}
