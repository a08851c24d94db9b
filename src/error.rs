//! Domain-specific error types for tildeconfig.
//!
//! Internal modules return typed errors built with [`thiserror`]; command
//! handlers at the CLI boundary convert them to [`anyhow::Error`] via `?`.
//!
//! # Error hierarchy
//!
//! ```text
//! RunError
//! ├── Configuration(ConfigurationError)  # bad references, cycles, unknown modules
//! ├── Options(OptionsError)  # invalid flag combinations
//! ├── Syntax(SyntaxError)  # malformed declarative input
//! ├── Registry(RegistryError)  # lookups of undeclared names
//! └── Module(ModuleError)  # an ActionError attributed to a module
//!     └── ActionError
//!         ├── FileInstall(FileInstallError)
//!         ├── PackageInstall(PackageInstallError)
//!         ├── Shell(ShellError)
//!         └── Failed { action, message }
//! ```
//!
//! Configuration and options errors are fatal before any module runs. Action
//! errors are caught at each file/action boundary inside a module and either
//! logged (`--ignore-errors`) or escalated into a [`ModuleError`].

use std::path::PathBuf;

use thiserror::Error;

use crate::modules::{FileEntry, ModuleId};

/// Top-level error for an orchestrated run.
#[derive(Error, Debug)]
pub enum RunError {
    /// The loaded configuration is inconsistent.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// The run options are invalid.
    #[error(transparent)]
    Options(#[from] OptionsError),

    /// The declarative input is malformed.
    #[error(transparent)]
    Syntax(#[from] SyntaxError),

    /// A name could not be resolved in the registry.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// A module failed and the run was stopped.
    #[error(transparent)]
    Module(#[from] ModuleError),
}

/// Errors in the module graph described by the configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    /// A module depends on an id that was never registered.
    #[error("module {module} depends on {dependency} which is not a module")]
    DependencyReference {
        /// The module declaring the dependency.
        module: ModuleId,
        /// The unregistered dependency.
        dependency: ModuleId,
    },

    /// The dependency graph contains a cycle.
    ///
    /// `cycle` is in dependency order: each module depends on the next, and
    /// the last depends on the first.
    #[error("circular dependency detected: {}", describe_cycle(.cycle))]
    CircularDependency {
        /// The modules forming the cycle.
        cycle: Vec<ModuleId>,
    },

    /// A module named on the command line is not declared.
    #[error("unknown module {0}")]
    UnknownModule(ModuleId),
}

/// Render a cycle as `a depends on b depends on a`.
#[must_use]
pub fn describe_cycle(cycle: &[ModuleId]) -> String {
    let mut parts: Vec<&str> = cycle.iter().map(ModuleId::as_str).collect();
    if let Some(first) = cycle.first() {
        parts.push(first.as_str());
    }
    parts.join(" depends on ")
}

/// Invalid combinations of run options.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OptionsError {
    /// `--packages` was given without `--system`.
    #[error("must provide a system when installing packages with --packages")]
    PackagesWithoutSystem,

    /// `--system` names a system with no registered installer.
    #[error("unknown system {0}")]
    UnknownSystem(String),

    /// `--merge-strategy` was neither `merge` nor `override`.
    #[error("invalid merge strategy: {0} (expected merge or override)")]
    InvalidMergeStrategy(String),
}

/// A declarative construct was used incorrectly.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("syntax error: {message}")]
pub struct SyntaxError {
    /// Human-readable description of the problem.
    pub message: String,
}

impl SyntaxError {
    /// Create a syntax error with the given message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// A registry lookup failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// No entry of `kind` is registered under `name`.
    #[error("{kind} {name} not found")]
    NotFound {
        /// What was looked up (`module`, `installer`, `command`).
        kind: &'static str,
        /// The name that was looked up.
        name: String,
    },
}

/// Failure of a single file or action step inside a module.
#[derive(Error, Debug)]
pub enum ActionError {
    /// A file or directory could not be installed or removed.
    #[error(transparent)]
    FileInstall(#[from] FileInstallError),

    /// The system package installer reported failure.
    #[error(transparent)]
    PackageInstall(#[from] PackageInstallError),

    /// A shell command failed.
    #[error(transparent)]
    Shell(#[from] ShellError),

    /// An inline action returned an error.
    #[error("action '{action}' failed: {message}")]
    Failed {
        /// Name of the inline action.
        action: String,
        /// Error reported by the action.
        message: String,
    },
}

/// A file could not be installed to its destination.
#[derive(Error, Debug, Clone)]
#[error("failed to install file {} to {}: {message}", .file.src.display(), .dest.display())]
pub struct FileInstallError {
    /// The declared file record that failed.
    pub file: FileEntry,
    /// The concrete destination path being written.
    pub dest: PathBuf,
    /// What went wrong.
    pub message: String,
}

impl FileInstallError {
    /// Create an error for `file` installing to `dest`.
    #[must_use]
    pub fn new(file: &FileEntry, dest: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self {
            file: file.clone(),
            dest: dest.into(),
            message: message.into(),
        }
    }
}

/// The installer for `system` failed to install `packages`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("failed to install packages [{}] on system {system}", .packages.join(", "))]
pub struct PackageInstallError {
    /// Every package that was requested in the failed batch.
    pub packages: Vec<String>,
    /// The target system.
    pub system: String,
}

/// A shell command could not be run or exited non-zero.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub struct ShellError {
    /// The command line that was run.
    pub command: String,
    /// Exit code, when the process exited normally.
    pub exit_code: Option<i32>,
    /// Whether the command (or the shell itself) could not be found.
    pub not_found: bool,
}

impl std::fmt::Display for ShellError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.not_found {
            return write!(f, "command not found: {}", self.command);
        }
        match self.exit_code {
            Some(code) => write!(f, "command '{}' failed (exit {code})", self.command),
            None => write!(f, "command '{}' terminated by signal", self.command),
        }
    }
}

/// An [`ActionError`] attributed to the module (and operation) it came from.
#[derive(Error, Debug)]
#[error("error while {operation} module {module}: {source}")]
pub struct ModuleError {
    /// The failing module.
    pub module: ModuleId,
    /// Present participle of the operation (`installing`, `updating`, …).
    pub operation: &'static str,
    /// The step failure.
    #[source]
    pub source: ActionError,
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::path::Path;

    fn ids(names: &[&str]) -> Vec<ModuleId> {
        names.iter().map(|n| ModuleId::from(*n)).collect()
    }

    #[test]
    fn dependency_reference_display() {
        let e = ConfigurationError::DependencyReference {
            module: "home".into(),
            dependency: "zsh".into(),
        };
        assert_eq!(e.to_string(), "module home depends on zsh which is not a module");
    }

    #[test]
    fn circular_dependency_display() {
        let e = ConfigurationError::CircularDependency {
            cycle: ids(&["a", "b", "c"]),
        };
        insta::assert_snapshot!(
            e.to_string(),
            @"circular dependency detected: a depends on b depends on c depends on a"
        );
    }

    #[test]
    fn describe_cycle_self_loop() {
        assert_eq!(describe_cycle(&ids(&["a"])), "a depends on a");
    }

    #[test]
    fn describe_cycle_empty() {
        assert_eq!(describe_cycle(&[]), "");
    }

    #[test]
    fn options_error_display() {
        assert!(
            OptionsError::PackagesWithoutSystem
                .to_string()
                .contains("--packages")
        );
        assert_eq!(
            OptionsError::UnknownSystem("beos".to_string()).to_string(),
            "unknown system beos"
        );
    }

    #[test]
    fn file_install_error_names_file_and_destination() {
        let file = FileEntry::new(".zshrc", ".zshrc", false);
        let e = FileInstallError::new(&file, Path::new("/home/u/.zshrc"), "destination exists");
        assert_eq!(
            e.to_string(),
            "failed to install file .zshrc to /home/u/.zshrc: destination exists"
        );
        assert_eq!(e.file, file);
    }

    #[test]
    fn package_install_error_lists_every_package() {
        let e = PackageInstallError {
            packages: vec!["zsh".to_string(), "python3".to_string()],
            system: "ubuntu".to_string(),
        };
        assert_eq!(
            e.to_string(),
            "failed to install packages [zsh, python3] on system ubuntu"
        );
    }

    #[test]
    fn shell_error_display() {
        let failed = ShellError {
            command: "false".to_string(),
            exit_code: Some(1),
            not_found: false,
        };
        assert_eq!(failed.to_string(), "command 'false' failed (exit 1)");

        let missing = ShellError {
            command: "nope".to_string(),
            exit_code: Some(127),
            not_found: true,
        };
        assert_eq!(missing.to_string(), "command not found: nope");
    }

    #[test]
    fn module_error_attributes_failure() {
        let e = ModuleError {
            module: "home".into(),
            operation: "installing",
            source: ActionError::Failed {
                action: "chsh".to_string(),
                message: "denied".to_string(),
            },
        };
        assert_eq!(
            e.to_string(),
            "error while installing module home: action 'chsh' failed: denied"
        );
    }

    #[test]
    fn run_error_is_transparent() {
        let e: RunError = ConfigurationError::UnknownModule("x".into()).into();
        assert_eq!(e.to_string(), "unknown module x");
    }

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn all_error_types_are_send_sync() {
        assert_send_sync::<RunError>();
        assert_send_sync::<ActionError>();
        assert_send_sync::<ConfigurationError>();
        assert_send_sync::<ModuleError>();
    }

    #[test]
    fn errors_convert_to_anyhow() {
        let e = SyntaxError::new("bad");
        let _anyhow_err: anyhow::Error = e.into();
    }
}
