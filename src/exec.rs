//! Shell command execution.
//!
//! Actions, package installers, and the refresh diff viewer all run commands
//! through the [`Executor`] trait so module code can be tested without
//! spawning processes. Production code uses [`SystemExecutor`].
use std::io;
use std::process::{Command, ExitStatus, Stdio};

use crate::error::ShellError;

/// Exit code a POSIX shell reports when the command cannot be found.
pub const EXIT_COMMAND_NOT_FOUND: i32 = 127;

/// Result of a command execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecResult {
    /// Whether the process exited with status zero.
    pub success: bool,
    /// Exit code, or `None` when the process was killed by a signal.
    pub code: Option<i32>,
}

impl ExecResult {
    /// A successful exit.
    #[must_use]
    pub const fn ok() -> Self {
        Self {
            success: true,
            code: Some(0),
        }
    }

    /// A failed exit with `code`.
    #[must_use]
    pub const fn failed(code: i32) -> Self {
        Self {
            success: false,
            code: Some(code),
        }
    }
}

impl From<ExitStatus> for ExecResult {
    fn from(status: ExitStatus) -> Self {
        Self {
            success: status.success(),
            code: status.code(),
        }
    }
}

/// Abstraction over running shell commands.
pub trait Executor: Send + Sync + std::fmt::Debug {
    /// Run `command` through the platform shell with inherited stdio.
    ///
    /// # Errors
    ///
    /// Returns an error if the shell itself could not be spawned.
    fn run_shell(&self, command: &str) -> io::Result<ExecResult>;

    /// Returns `true` if `program` is available on `PATH`.
    fn which(&self, program: &str) -> bool;
}

/// Production [`Executor`] that spawns real processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemExecutor;

impl Executor for SystemExecutor {
    fn run_shell(&self, command: &str) -> io::Result<ExecResult> {
        #[cfg(windows)]
        let mut cmd = {
            let mut c = Command::new("cmd");
            c.args(["/C", command]);
            c
        };
        #[cfg(not(windows))]
        let mut cmd = {
            let mut c = Command::new("sh");
            c.args(["-c", command]);
            c
        };

        let status = cmd
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()?;
        Ok(ExecResult::from(status))
    }

    fn which(&self, program: &str) -> bool {
        which::which(program).is_ok()
    }
}

/// Run `command` and turn a spawn failure or non-zero exit into a
/// [`ShellError`].
///
/// # Errors
///
/// Returns [`ShellError`] with `not_found` set when the shell could not be
/// spawned or reported exit code 127.
pub fn run_checked(executor: &dyn Executor, command: &str) -> Result<(), ShellError> {
    match executor.run_shell(command) {
        Ok(result) if result.success => Ok(()),
        Ok(result) => Err(ShellError {
            command: command.to_string(),
            exit_code: result.code,
            not_found: result.code == Some(EXIT_COMMAND_NOT_FOUND),
        }),
        Err(_) => Err(ShellError {
            command: command.to_string(),
            exit_code: None,
            not_found: true,
        }),
    }
}
