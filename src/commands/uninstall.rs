//! Uninstall command implementation.
use anyhow::Result;
use std::sync::Arc;

use crate::cli::{GlobalOpts, ModuleArgs};
use crate::logging::Logger;
use crate::orchestrator;

/// Run the uninstall command.
///
/// # Errors
///
/// Returns an error if configuration loading fails or a module fails to
/// uninstall.
pub fn run(global: &GlobalOpts, args: &ModuleArgs, log: &Arc<Logger>) -> Result<()> {
    super::run_modules(global, args, log, orchestrator::uninstall)
}
