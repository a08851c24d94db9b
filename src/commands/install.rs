use anyhow::Result;
use std::sync::Arc;

use crate::cli::{GlobalOpts, ModuleArgs};
use crate::logging::Logger;
use crate::orchestrator;

/// Run the install command.
///
/// # Errors
///
/// Returns an error if configuration loading fails, the options are invalid,
/// or a module fails to install.
pub fn run(global: &GlobalOpts, args: &ModuleArgs, log: &Arc<Logger>) -> Result<()> {
    log.info(&format!("tildeconfig {}", super::version::VERSION));
    super::run_modules(global, args, log, orchestrator::install)
}
