//! Refresh command implementation.
use anyhow::Result;
use std::sync::Arc;

use crate::cli::{GlobalOpts, ModuleArgs};
use crate::logging::Logger;
use crate::orchestrator;

/// Run the refresh command.
///
/// # Errors
///
/// Returns an error if configuration loading fails or copying a file back
/// into the repository fails.
pub fn run(global: &GlobalOpts, args: &ModuleArgs, log: &Arc<Logger>) -> Result<()> {
    super::run_modules(global, args, log, orchestrator::refresh)
}
