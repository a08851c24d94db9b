//! User-defined module commands.
//!
//! A custom command is a reusable recipe applied to a module with arguments,
//! e.g. a `pkg` command that adds its arguments as package dependencies and
//! queues a post-install hook.
use std::sync::Arc;

use super::{Action, Module, ModuleId};
use crate::error::SyntaxError;

/// A custom command body: mutates the target module using the call's
/// arguments.
pub type CommandFn = Arc<dyn Fn(&mut Module, &[String]) -> Result<(), SyntaxError> + Send + Sync>;

/// Placeholder in action templates replaced by the call's arguments joined
/// with spaces.
pub const ARGS_PLACEHOLDER: &str = "{args}";

/// A declarative custom command.
///
/// Applying it to a module unions `depends` into the module's dependencies,
/// adds `packages` plus the call's arguments when `args_are_packages` is set,
/// and queues one shell action per template.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandTemplate {
    /// Modules the target module gains as dependencies.
    pub depends: Vec<String>,
    /// Package dependencies added to the target module.
    pub packages: Vec<String>,
    /// Also treat every call argument as a package dependency.
    pub args_are_packages: bool,
    /// Shell templates queued as install actions.
    pub install: Vec<String>,
    /// Shell templates queued as uninstall actions.
    pub uninstall: Vec<String>,
    /// Shell templates queued as update actions.
    pub update: Vec<String>,
}

impl CommandTemplate {
    /// Check every template and turn the command into a callable body.
    ///
    /// # Errors
    ///
    /// Returns a [`SyntaxError`] naming the command if any action template is
    /// blank.
    pub fn compile(self, name: &str) -> Result<CommandFn, SyntaxError> {
        let blank = self
            .install
            .iter()
            .chain(&self.uninstall)
            .chain(&self.update)
            .any(|t| t.trim().is_empty());
        if blank {
            return Err(SyntaxError::new(format!(
                "command {name} has an empty action"
            )));
        }
        Ok(Arc::new(move |module: &mut Module, args: &[String]| {
            self.apply(module, args)
        }))
    }

    fn apply(&self, module: &mut Module, args: &[String]) -> Result<(), SyntaxError> {
        let joined = args.join(" ");
        let render = |template: &String| Action::shell(template.replace(ARGS_PLACEHOLDER, &joined));

        module.add_dependencies(self.depends.iter().map(|d| ModuleId::from(d.as_str())));
        module.add_package_dependency(self.packages.iter().cloned());
        if self.args_are_packages {
            module.add_package_dependency(args.iter().cloned());
        }
        for template in &self.install {
            module.on_install(render(template)?);
        }
        for template in &self.uninstall {
            module.on_uninstall(render(template)?);
        }
        for template in &self.update {
            module.on_update(render(template)?);
        }
        Ok(())
    }
}
