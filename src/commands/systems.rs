//! Command: list package installers.
use anyhow::Result;

use crate::cli::GlobalOpts;
use crate::exec::{Executor, SystemExecutor};
use crate::logging::Logger;
use crate::registry::Registry;

/// One line per installer: system, program, and whether the program is on
/// `PATH`.
#[must_use]
pub fn describe_installers(registry: &Registry, executor: &dyn Executor) -> Vec<String> {
    registry
        .installers()
        .map(|installer| match installer.program() {
            Some(program) => {
                let state = if executor.which(program) {
                    "available"
                } else {
                    "not found"
                };
                format!("{:<10} {program} ({state})", installer.system)
            }
            None => format!("{:<10} (built in)", installer.system),
        })
        .collect()
}

/// Run the systems command.
///
/// # Errors
///
/// Returns an error if configuration loading fails.
pub fn run(global: &GlobalOpts, log: &Logger) -> Result<()> {
    let setup = super::CommandSetup::init(global, log)?;
    log.stage("Package installers");
    for line in describe_installers(&setup.config.registry, &SystemExecutor) {
        log.info(&line);
    }
    Ok(())
}
