//! Serde model of the TOML configuration file.
//!
//! Every top-level collection is an array of tables, so declaration order in
//! the file is preserved as registration order.
use std::collections::BTreeMap;

use serde::Deserialize;

use super::Settings;
use crate::error::SyntaxError;
use crate::modules::commands::CommandTemplate;

/// A whole configuration file.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    /// Global settings.
    pub settings: Settings,
    /// `[[installer]]` tables.
    pub installer: Vec<InstallerSpec>,
    /// `[[package]]` tables.
    pub package: Vec<PackageSpec>,
    /// `[[command]]` tables.
    pub command: Vec<CommandSpec>,
    /// `[[module]]` tables.
    pub module: Vec<ModuleSpec>,
}

/// A package installer invoked as `<command> <pkg>...`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InstallerSpec {
    /// System name.
    pub system: String,
    /// Command prefix the package names are appended to.
    pub command: String,
}

/// A package with per-system names.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PackageSpec {
    /// Abstract name used by modules.
    pub name: String,
    /// System name to package name.
    #[serde(default)]
    pub systems: BTreeMap<String, String>,
}

/// A reusable per-module command.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CommandSpec {
    pub name: String,
    pub depends: Vec<String>,
    pub packages: Vec<String>,
    pub args_are_packages: bool,
    pub install: Vec<String>,
    pub uninstall: Vec<String>,
    pub update: Vec<String>,
}

impl From<CommandSpec> for CommandTemplate {
    fn from(spec: CommandSpec) -> Self {
        Self {
            depends: spec.depends,
            packages: spec.packages,
            args_are_packages: spec.args_are_packages,
            install: spec.install,
            uninstall: spec.uninstall,
            update: spec.update,
        }
    }
}

/// One `[[module]]` declaration. Repeating a name extends the same module.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModuleSpec {
    pub name: String,
    pub depends: Vec<String>,
    pub packages: Vec<String>,
    pub root_dir: Option<String>,
    pub install_dir: Option<String>,
    pub files: Vec<FileSpec>,
    pub install: Vec<String>,
    pub uninstall: Vec<String>,
    pub update: Vec<String>,
    #[serde(rename = "use")]
    pub uses: Vec<UseSpec>,
}

/// A `files` entry: a bare path, or a table.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum FileSpec {
    /// Installed under the same relative path.
    Path(String),
    /// Single path or glob with options.
    Detailed(FileTable),
}

/// Table form of a `files` entry. Exactly one of `src` and `glob` is set.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileTable {
    pub src: Option<String>,
    pub glob: Option<String>,
    /// Destination path, or directory for glob matches.
    pub dest: Option<String>,
    #[serde(default)]
    pub symlink: bool,
}

/// Application of a custom command to the enclosing module.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UseSpec {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
}

/// Parse configuration text.
///
/// # Errors
///
/// Returns a [`SyntaxError`] describing the TOML or schema problem.
pub fn parse(content: &str) -> Result<ConfigFile, SyntaxError> {
    toml::from_str(content).map_err(|e| SyntaxError::new(e.to_string()))
}
