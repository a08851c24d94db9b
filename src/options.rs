//! Run-wide options shared by every module operation.
use std::fmt;
use std::str::FromStr;

use crate::error::OptionsError;
use crate::registry::Registry;

/// Policy for installing a directory over an existing directory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MergeStrategy {
    /// Splice source entries into the destination, keeping unrelated entries.
    #[default]
    Merge,
    /// Replace the destination tree wholesale.
    Override,
}

impl FromStr for MergeStrategy {
    type Err = OptionsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "merge" => Ok(Self::Merge),
            "override" => Ok(Self::Override),
            other => Err(OptionsError::InvalidMergeStrategy(other.to_string())),
        }
    }
}

impl fmt::Display for MergeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Merge => "merge",
            Self::Override => "override",
        })
    }
}

/// Options for one run, built from the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct Options {
    /// Target system for package installation.
    pub system: Option<String>,
    /// Install each module's system packages before its files.
    pub install_packages: bool,
    /// Ask before destructive or ambiguous steps.
    pub interactive: bool,
    /// Log failed steps and keep going instead of stopping the module.
    pub ignore_errors: bool,
    /// Run only the named modules, without their dependencies.
    pub skip_dependencies: bool,
    /// How directories are installed over existing directories.
    pub merge_strategy: MergeStrategy,
    /// Whether existing destinations may be replaced.
    pub allow_override: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            system: None,
            install_packages: false,
            interactive: true,
            ignore_errors: false,
            skip_dependencies: false,
            merge_strategy: MergeStrategy::default(),
            allow_override: true,
        }
    }
}

impl Options {
    /// Check the options against the loaded registry.
    ///
    /// # Errors
    ///
    /// Returns [`OptionsError::PackagesWithoutSystem`] when packages are
    /// requested without a system, and [`OptionsError::UnknownSystem`] when the
    /// system has no installer.
    pub fn validate(&self, registry: &Registry) -> Result<(), OptionsError> {
        match self.system.as_deref() {
            None if self.install_packages => Err(OptionsError::PackagesWithoutSystem),
            Some(system) if registry.installer(system).is_err() => {
                Err(OptionsError::UnknownSystem(system.to_string()))
            }
            _ => Ok(()),
        }
    }
}
