//! Runs module operations in dependency order.
//!
//! Each entry point validates the run, resolves which modules take part and in
//! what order, then executes them one at a time. A module's failure stops the
//! run unless ignore-errors is set, in which case the module logs its failed
//! steps and the run continues.
use std::collections::HashSet;

use crate::error::{ConfigurationError, ModuleError, RunError};
use crate::logging::{self, ModuleStatus};
use crate::modules::graph::{build_graph, find_cycle, topological_sort};
use crate::modules::{Context, ModuleId};
use crate::registry::Registry;

/// An operation applied to a set of modules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Install packages, files, and install actions.
    Install,
    /// Remove files and run uninstall actions.
    Uninstall,
    /// Re-install files and run update actions.
    Update,
    /// Copy installed files back into the repository.
    Refresh,
}

impl Operation {
    /// Present participle used in error messages.
    #[must_use]
    pub const fn participle(self) -> &'static str {
        match self {
            Self::Install => "installing",
            Self::Uninstall => "uninstalling",
            Self::Update => "updating",
            Self::Refresh => "refreshing",
        }
    }

    const fn title(self) -> &'static str {
        match self {
            Self::Install => "Installing",
            Self::Uninstall => "Uninstalling",
            Self::Update => "Updating",
            Self::Refresh => "Refreshing",
        }
    }
}

/// Fail with [`ConfigurationError::UnknownModule`] for the first requested id
/// that is not registered.
fn check_requested(registry: &Registry, requested: &[ModuleId]) -> Result<(), ConfigurationError> {
    match requested.iter().find(|id| !registry.contains(id.as_str())) {
        Some(id) => Err(ConfigurationError::UnknownModule(id.clone())),
        None => Ok(()),
    }
}

/// Order in which `requested` modules run.
///
/// Every module appears after all of its dependencies. Without
/// `skip_dependencies` the dependency closures of the requested modules take
/// part too; an empty request selects every module.
///
/// # Errors
///
/// Returns [`ConfigurationError::UnknownModule`] for an unregistered request
/// and [`ConfigurationError::CircularDependency`] if no order exists.
pub fn resolve_order(
    registry: &Registry,
    requested: &[ModuleId],
    skip_dependencies: bool,
) -> Result<Vec<ModuleId>, ConfigurationError> {
    check_requested(registry, requested)?;

    let graph = build_graph(registry);
    let Some(order) = topological_sort(&graph) else {
        let mut cycle = find_cycle(&graph).unwrap_or_default();
        cycle.reverse();
        return Err(ConfigurationError::CircularDependency { cycle });
    };

    let selected: HashSet<ModuleId> = if requested.is_empty() {
        registry.module_ids().into_iter().collect()
    } else if skip_dependencies {
        requested.iter().cloned().collect()
    } else {
        requested
            .iter()
            .filter_map(|id| registry.get(id.as_str()).ok())
            .flat_map(|module| module.all_dependencies(registry))
            .collect()
    };

    Ok(order
        .into_iter()
        .filter(|id| selected.contains(id) && registry.contains(id.as_str()))
        .collect())
}

/// Install `requested` modules (or all) and, unless skipped, their
/// dependencies first.
///
/// # Errors
///
/// Returns a [`RunError`] if the options or module graph are invalid, or if a
/// module fails without ignore-errors.
pub fn install(ctx: &Context, requested: &[ModuleId]) -> Result<(), RunError> {
    ctx.options.validate(ctx.registry())?;
    let order = resolve_order(ctx.registry(), requested, ctx.options.skip_dependencies)?;
    run(ctx, Operation::Install, &order)
}

/// Update `requested` modules (or all), selected and ordered as for install.
///
/// # Errors
///
/// See [`install`].
pub fn update(ctx: &Context, requested: &[ModuleId]) -> Result<(), RunError> {
    ctx.options.validate(ctx.registry())?;
    let order = resolve_order(ctx.registry(), requested, ctx.options.skip_dependencies)?;
    run(ctx, Operation::Update, &order)
}

/// Uninstall `requested` modules (or all), dependents before their
/// dependencies. Dependencies of the requested modules are left alone.
///
/// # Errors
///
/// See [`install`].
pub fn uninstall(ctx: &Context, requested: &[ModuleId]) -> Result<(), RunError> {
    let mut order = resolve_order(ctx.registry(), requested, true)?;
    order.reverse();
    run(ctx, Operation::Uninstall, &order)
}

/// Refresh `requested` modules in the order given, or every module in
/// registration order.
///
/// # Errors
///
/// Returns a [`RunError`] for unknown modules or a module that fails without
/// ignore-errors.
pub fn refresh(ctx: &Context, requested: &[ModuleId]) -> Result<(), RunError> {
    check_requested(ctx.registry(), requested)?;
    let order = if requested.is_empty() {
        ctx.registry().module_ids()
    } else {
        requested.to_vec()
    };
    run(ctx, Operation::Refresh, &order)
}

/// Execute `operation` on each module of `order`, recording every outcome.
///
/// # Errors
///
/// Returns the first module failure; modules after it are recorded as not
/// run.
pub fn run(ctx: &Context, operation: Operation, order: &[ModuleId]) -> Result<(), RunError> {
    for (position, id) in order.iter().enumerate() {
        let module = ctx.registry().get(id.as_str())?;
        let _span = logging::module_span(id.as_str()).entered();
        ctx.log.stage(&format!("{} {id}", operation.title()));

        let outcome = match operation {
            Operation::Install => module.execute_install(ctx),
            Operation::Uninstall => module.execute_uninstall(ctx),
            Operation::Update => module.execute_update(ctx),
            Operation::Refresh => module.execute_refresh(ctx),
        };

        match outcome {
            Ok(report) if report.is_clean() => {
                ctx.log.record_module(id.as_str(), ModuleStatus::Ok, None);
            }
            Ok(report) => {
                let message = format!("{} error(s) ignored", report.ignored.len());
                ctx.log
                    .record_module(id.as_str(), ModuleStatus::IgnoredErrors, Some(&message));
            }
            Err(source) => {
                let error = ModuleError {
                    module: id.clone(),
                    operation: operation.participle(),
                    source,
                };
                ctx.log.error(&error.to_string());
                ctx.log.record_module(
                    id.as_str(),
                    ModuleStatus::Failed,
                    Some(&error.source.to_string()),
                );
                for skipped in order.iter().skip(position + 1) {
                    ctx.log
                        .record_module(skipped.as_str(), ModuleStatus::NotRun, None);
                }
                return Err(error.into());
            }
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::panic
)]
mod tests {
    use super::*;
    use crate::error::{ActionError, OptionsError};
    use crate::modules::Action;
    use crate::modules::context::test_helpers::{make_context, make_context_with};
    use crate::options::Options;
    use std::sync::{Arc, Mutex};

    fn ids(names: &[&str]) -> Vec<ModuleId> {
        names.iter().map(|n| ModuleId::from(*n)).collect()
    }

    type Calls = Arc<Mutex<Vec<String>>>;

    /// Registry where every module records `<op>:<name>` when its actions
    /// run.
    fn tracked(table: &[(&str, &[&str])]) -> (Registry, Calls) {
        let calls: Calls = Arc::new(Mutex::new(Vec::new()));
        let mut registry = Registry::default();
        for (name, deps) in table {
            let module = registry.declare(*name, deps.iter().copied());
            for op in ["install", "uninstall", "update"] {
                let sink = Arc::clone(&calls);
                let label = format!("{op}:{name}");
                let action = Action::inline(label.clone(), move || {
                    sink.lock().unwrap().push(label.clone());
                    Ok(())
                });
                match op {
                    "install" => module.on_install(action),
                    "uninstall" => module.on_uninstall(action),
                    _ => module.on_update(action),
                }
            }
        }
        (registry, calls)
    }

    #[test]
    fn run_log_attributes_lines_to_their_module() {
        let (run_log, _tmp, _guard) = crate::logging::isolated_logger();
        let (registry, _) = tracked(&[("zsh", &[]), ("git", &["zsh"])]);
        let (ctx, _log) = make_context(registry);

        install(&ctx, &[]).unwrap();

        let contents = std::fs::read_to_string(run_log.log_path().unwrap()).unwrap();
        let body: Vec<&str> = contents.lines().skip(1).map(|l| &l[9..]).collect();
        for expected in [
            "==> Install zsh",
            "DEBUG [zsh] running install:zsh",
            "==> Install git",
            "DEBUG [git] running install:git",
        ] {
            assert!(body.contains(&expected), "missing {expected:?} in {body:#?}");
        }
    }

    #[test]
    fn order_respects_dependencies() {
        let (registry, _) = tracked(&[("c", &["b"]), ("b", &["a"]), ("a", &[])]);
        assert_eq!(
            resolve_order(&registry, &[], false).unwrap(),
            ids(&["a", "b", "c"])
        );
    }

    #[test]
    fn requested_module_pulls_in_dependencies() {
        let (registry, _) = tracked(&[("m1", &["m2"]), ("m2", &[]), ("other", &[])]);
        assert_eq!(
            resolve_order(&registry, &ids(&["m1"]), false).unwrap(),
            ids(&["m2", "m1"])
        );
        assert_eq!(
            resolve_order(&registry, &ids(&["m1"]), true).unwrap(),
            ids(&["m1"])
        );
    }

    #[test]
    fn unknown_module_is_rejected() {
        let (registry, _) = tracked(&[("a", &[])]);
        assert_eq!(
            resolve_order(&registry, &ids(&["nope"]), false).unwrap_err(),
            ConfigurationError::UnknownModule("nope".into())
        );
    }

    #[test]
    fn cycle_is_reported_as_dependency_chain() {
        let (registry, _) = tracked(&[("a", &["b"]), ("b", &["a"])]);
        let err = resolve_order(&registry, &[], false).unwrap_err();
        insta::assert_snapshot!(
            err.to_string(),
            @"circular dependency detected: a depends on b depends on a"
        );
    }

    #[test]
    fn install_runs_dependencies_first() {
        let (registry, calls) = tracked(&[("m1", &["m2"]), ("m2", &[])]);
        let (ctx, log) = make_context(registry);
        install(&ctx, &ids(&["m1"])).unwrap();

        assert_eq!(*calls.lock().unwrap(), vec!["install:m2", "install:m1"]);
        assert!(!log.has_failures());
        assert_eq!(log.module_entries().len(), 2);
    }

    #[test]
    fn skip_dependencies_runs_only_requested() {
        let (registry, calls) = tracked(&[("m1", &["m2"]), ("m2", &[])]);
        let options = Options {
            skip_dependencies: true,
            ..Options::default()
        };
        let (ctx, _log) = make_context_with(registry, options);
        install(&ctx, &ids(&["m1"])).unwrap();
        assert_eq!(*calls.lock().unwrap(), vec!["install:m1"]);
    }

    #[test]
    fn update_uses_update_actions() {
        let (registry, calls) = tracked(&[("b", &["a"]), ("a", &[])]);
        let (ctx, _log) = make_context(registry);
        update(&ctx, &[]).unwrap();
        assert_eq!(*calls.lock().unwrap(), vec!["update:a", "update:b"]);
    }

    #[test]
    fn uninstall_runs_dependents_first_without_expansion() {
        let (registry, calls) = tracked(&[("a", &[]), ("b", &["a"]), ("c", &["b"])]);
        let (ctx, _log) = make_context(registry);
        uninstall(&ctx, &[]).unwrap();
        assert_eq!(
            *calls.lock().unwrap(),
            vec!["uninstall:c", "uninstall:b", "uninstall:a"]
        );

        calls.lock().unwrap().clear();
        uninstall(&ctx, &ids(&["b"])).unwrap();
        assert_eq!(*calls.lock().unwrap(), vec!["uninstall:b"]);
    }

    #[test]
    fn refresh_follows_requested_order() {
        let (registry, _) = tracked(&[("a", &[]), ("b", &[])]);
        let (ctx, log) = make_context(registry);
        refresh(&ctx, &ids(&["b", "a"])).unwrap();
        let names: Vec<String> = log.module_entries().into_iter().map(|e| e.name).collect();
        assert_eq!(names, vec!["b", "a"]);
    }

    #[test]
    fn failing_module_stops_the_run() {
        let (mut registry, calls) = tracked(&[("a", &[]), ("b", &["a"])]);
        registry
            .module("a")
            .on_install(Action::inline("explode", || anyhow::bail!("boom")));
        let (ctx, log) = make_context(registry);

        let err = install(&ctx, &[]).unwrap_err();
        let RunError::Module(err) = err else {
            panic!("expected a module error, got {err}");
        };
        assert_eq!(err.module, ModuleId::from("a"));
        assert!(matches!(err.source, ActionError::Failed { .. }));
        assert_eq!(
            err.to_string(),
            "error while installing module a: action 'explode' failed: boom"
        );
        assert_eq!(*calls.lock().unwrap(), vec!["install:a"]);

        let statuses: Vec<ModuleStatus> =
            log.module_entries().into_iter().map(|e| e.status).collect();
        assert_eq!(statuses, vec![ModuleStatus::Failed, ModuleStatus::NotRun]);
    }

    #[test]
    fn ignore_errors_finishes_every_module() {
        let (mut registry, calls) = tracked(&[("a", &[]), ("b", &["a"])]);
        registry
            .module("a")
            .on_install(Action::inline("explode", || anyhow::bail!("boom")));
        let options = Options {
            ignore_errors: true,
            ..Options::default()
        };
        let (ctx, log) = make_context_with(registry, options);

        install(&ctx, &[]).unwrap();
        assert_eq!(*calls.lock().unwrap(), vec!["install:a", "install:b"]);
        let entries = log.module_entries();
        assert_eq!(entries[0].status, ModuleStatus::IgnoredErrors);
        assert_eq!(entries[1].status, ModuleStatus::Ok);
    }

    #[test]
    fn packages_without_system_fail_before_any_module() {
        let (registry, calls) = tracked(&[("a", &[])]);
        let options = Options {
            install_packages: true,
            ..Options::default()
        };
        let (ctx, _log) = make_context_with(registry, options);

        let err = install(&ctx, &[]).unwrap_err();
        assert!(matches!(
            err,
            RunError::Options(OptionsError::PackagesWithoutSystem)
        ));
        assert!(calls.lock().unwrap().is_empty());
    }

    #[test]
    fn scoped_registry_runs_in_isolation() {
        let (outer, outer_calls) = tracked(&[("outer", &[])]);
        let (inner, inner_calls) = tracked(&[("inner", &[])]);
        let (mut ctx, _log) = make_context(outer);

        ctx.with_registry(inner, |scoped| install(scoped, &[])).unwrap();
        assert_eq!(*inner_calls.lock().unwrap(), vec!["install:inner"]);
        assert!(outer_calls.lock().unwrap().is_empty());
        assert!(ctx.registry().contains("outer"));
        assert!(!ctx.registry().contains("inner"));
    }
}
