//! Module-based personal configuration installer.
//!
//! Configuration is organised into named modules that bundle files, shell
//! actions, system packages, and dependencies on other modules. Modules are
//! installed in dependency order, and installed files can be refreshed back
//! into the repository.
//!
//! The public API is organised into layers:
//!
//! - **[`config`]**: load a TOML configuration file into a [`registry::Registry`]
//! - **[`modules`]**: the module model, dependency graph, and per-module execution
//! - **[`resources`]**: filesystem primitives, the file installer, and package installation
//! - **[`orchestrator`]**: dependency-ordered runs of install, uninstall, update, and refresh
//! - **[`commands`]**: top-level subcommand handlers
#![deny(clippy::or_fun_call)]
#![deny(clippy::bool_to_int_with_if)]

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod exec;
pub mod logging;
pub mod modules;
pub mod options;
pub mod orchestrator;
pub mod prompt;
pub mod registry;
pub mod resources;
