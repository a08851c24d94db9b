//! Install, uninstall, and update actions.
use std::fmt;
use std::sync::Arc;

use super::Context;
use crate::error::{ActionError, SyntaxError};
use crate::exec;

/// Boxed body of an inline action.
pub type InlineFn = Arc<dyn Fn() -> anyhow::Result<()> + Send + Sync>;

/// A deferred step queued on a module.
#[derive(Clone)]
pub enum Action {
    /// A command line run through the platform shell.
    Shell {
        /// The command line.
        command: String,
    },
    /// A native closure.
    Inline {
        /// Name used in logs and errors.
        name: String,
        /// The body.
        op: InlineFn,
    },
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Shell { command } => f.debug_struct("Shell").field("command", command).finish(),
            Self::Inline { name, .. } => f
                .debug_struct("Inline")
                .field("name", name)
                .finish_non_exhaustive(),
        }
    }
}

impl Action {
    /// A shell action.
    ///
    /// # Errors
    ///
    /// Returns a [`SyntaxError`] if `command` is blank.
    pub fn shell(command: impl Into<String>) -> Result<Self, SyntaxError> {
        let command = command.into();
        if command.trim().is_empty() {
            return Err(SyntaxError::new("missing action body"));
        }
        Ok(Self::Shell { command })
    }

    /// An inline action running `op`.
    pub fn inline(
        name: impl Into<String>,
        op: impl Fn() -> anyhow::Result<()> + Send + Sync + 'static,
    ) -> Self {
        Self::Inline {
            name: name.into(),
            op: Arc::new(op),
        }
    }

    /// Short human-readable description.
    #[must_use]
    pub fn describe(&self) -> &str {
        match self {
            Self::Shell { command } => command,
            Self::Inline { name, .. } => name,
        }
    }

    /// Run the action.
    ///
    /// # Errors
    ///
    /// Returns [`ActionError::Shell`] for a failing command and
    /// [`ActionError::Failed`] for a failing inline action.
    pub fn run(&self, ctx: &Context) -> Result<(), ActionError> {
        match self {
            Self::Shell { command } => {
                ctx.log.info(&format!("$ {command}"));
                exec::run_checked(ctx.executor.as_ref(), command)?;
                Ok(())
            }
            Self::Inline { name, op } => {
                ctx.log.debug(&format!("running {name}"));
                op().map_err(|e| ActionError::Failed {
                    action: name.clone(),
                    message: format!("{e:#}"),
                })
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::exec::test_helpers::RecordingExecutor;
    use crate::modules::context::test_helpers::make_context;
    use crate::registry::Registry;

    #[test]
    fn blank_shell_action_is_rejected() {
        assert_eq!(
            Action::shell("   ").unwrap_err(),
            SyntaxError::new("missing action body")
        );
    }

    #[test]
    fn shell_action_runs_through_executor() {
        let exec = Arc::new(RecordingExecutor::default());
        let (ctx, _log) = make_context(Registry::default());
        let ctx = ctx.with_executor(Arc::clone(&exec) as Arc<dyn exec::Executor>);

        Action::shell("chsh -s /bin/zsh").unwrap().run(&ctx).unwrap();
        assert_eq!(exec.recorded(), vec!["chsh -s /bin/zsh"]);
    }

    #[test]
    fn failing_shell_action_reports_exit_code() {
        let exec = Arc::new(RecordingExecutor::default().with_exit_code("false", 1));
        let (ctx, _log) = make_context(Registry::default());
        let ctx = ctx.with_executor(exec);

        let err = Action::shell("false").unwrap().run(&ctx).unwrap_err();
        match err {
            ActionError::Shell(e) => assert_eq!(e.exit_code, Some(1)),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn inline_error_is_wrapped_with_action_name() {
        let (ctx, _log) = make_context(Registry::default());
        let action = Action::inline("link-fonts", || anyhow::bail!("no fonts"));
        let err = action.run(&ctx).unwrap_err();
        assert_eq!(err.to_string(), "action 'link-fonts' failed: no fonts");
    }

    #[test]
    fn debug_omits_closure() {
        let action = Action::inline("x", || Ok(()));
        assert_eq!(format!("{action:?}"), "Inline { name: \"x\", .. }");
    }
}
