//! Execution context shared by every module in a run.
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use crate::config::Settings;
use crate::exec::{Executor, SystemExecutor};
use crate::logging::Log;
use crate::options::Options;
use crate::prompt::{AutoPrompter, ConsolePrompter, Prompter};
use crate::registry::Registry;

/// Shared state for a run: the module registry, run options, and the
/// injectable services modules use for output, commands, and questions.
pub struct Context {
    registry: Registry,
    /// Options for this run.
    pub options: Options,
    /// Global settings from the configuration file.
    pub settings: Settings,
    /// Logger for output and module recording.
    pub log: Arc<dyn Log>,
    /// Command executor (for testing or real system calls).
    pub executor: Arc<dyn Executor>,
    /// Source of answers to interactive questions.
    pub prompter: Arc<dyn Prompter>,
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("registry", &self.registry)
            .field("options", &self.options)
            .field("settings", &self.settings)
            .field("log", &"<dyn Log>")
            .field("executor", &self.executor)
            .field("prompter", &"<dyn Prompter>")
            .finish()
    }
}

impl Context {
    /// Create a context with explicit services.
    #[must_use]
    pub fn new(
        registry: Registry,
        options: Options,
        settings: Settings,
        log: Arc<dyn Log>,
        executor: Arc<dyn Executor>,
        prompter: Arc<dyn Prompter>,
    ) -> Self {
        Self {
            registry,
            options,
            settings,
            log,
            executor,
            prompter,
        }
    }

    /// Create a context that runs real commands and reads answers from the
    /// console, or answers every question with its default when the run is
    /// non-interactive.
    #[must_use]
    pub fn for_system(
        registry: Registry,
        options: Options,
        settings: Settings,
        log: Arc<dyn Log>,
    ) -> Self {
        let prompter: Arc<dyn Prompter> = if options.interactive {
            Arc::new(ConsolePrompter)
        } else {
            Arc::new(AutoPrompter)
        };
        Self::new(
            registry,
            options,
            settings,
            log,
            Arc::new(SystemExecutor),
            prompter,
        )
    }

    /// Return this context with a different prompter.
    #[must_use]
    pub fn with_prompter(self, prompter: Arc<dyn Prompter>) -> Self {
        Self { prompter, ..self }
    }

    /// Return this context with a different executor.
    #[must_use]
    pub fn with_executor(self, executor: Arc<dyn Executor>) -> Self {
        Self { executor, ..self }
    }

    /// The active registry.
    #[must_use]
    pub const fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Mutable access to the active registry.
    pub const fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    /// Swap in `fresh` as the active registry until the returned guard drops.
    ///
    /// The previous registry is restored when the guard is dropped, including
    /// during unwinding.
    pub fn scoped_registry(&mut self, fresh: Registry) -> RegistryScope<'_> {
        let saved = std::mem::replace(&mut self.registry, fresh);
        RegistryScope {
            ctx: self,
            saved: Some(saved),
        }
    }

    /// Run `f` with `fresh` as the active registry, restoring the previous one
    /// afterwards.
    pub fn with_registry<R>(&mut self, fresh: Registry, f: impl FnOnce(&mut Self) -> R) -> R {
        let mut scope = self.scoped_registry(fresh);
        f(&mut scope)
    }
}

/// Guard returned by [`Context::scoped_registry`].
#[derive(Debug)]
pub struct RegistryScope<'a> {
    ctx: &'a mut Context,
    saved: Option<Registry>,
}

impl Deref for RegistryScope<'_> {
    type Target = Context;

    fn deref(&self) -> &Context {
        &*self.ctx
    }
}

impl DerefMut for RegistryScope<'_> {
    fn deref_mut(&mut self) -> &mut Context {
        &mut *self.ctx
    }
}

impl Drop for RegistryScope<'_> {
    fn drop(&mut self) {
        if let Some(saved) = self.saved.take() {
            self.ctx.registry = saved;
        }
    }
}
