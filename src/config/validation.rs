//! Consistency checks run on a loaded registry before any module executes.
use crate::error::ConfigurationError;
use crate::modules::graph::{build_graph, find_cycle};
use crate::registry::Registry;

/// Fail if any module depends on an id that is not registered.
///
/// # Errors
///
/// Returns [`ConfigurationError::DependencyReference`] for the first dangling
/// dependency, in registration order.
pub fn validate_dependency_references(registry: &Registry) -> Result<(), ConfigurationError> {
    for module in registry.modules() {
        if let Some(dep) = module
            .dependencies()
            .iter()
            .find(|dep| !registry.contains(dep.as_str()))
        {
            return Err(ConfigurationError::DependencyReference {
                module: module.id().clone(),
                dependency: dep.clone(),
            });
        }
    }
    Ok(())
}

/// Fail if the module dependency graph contains a cycle.
///
/// # Errors
///
/// Returns [`ConfigurationError::CircularDependency`] carrying the cycle in
/// dependency order.
pub fn validate_no_cycles(registry: &Registry) -> Result<(), ConfigurationError> {
    match find_cycle(&build_graph(registry)) {
        Some(mut cycle) => {
            // Graph edges run dependency -> dependent; report "a depends on b".
            cycle.reverse();
            Err(ConfigurationError::CircularDependency { cycle })
        }
        None => Ok(()),
    }
}

/// Run every registry check.
///
/// # Errors
///
/// Returns the first [`ConfigurationError`] found.
pub fn validate(registry: &Registry) -> Result<(), ConfigurationError> {
    validate_dependency_references(registry)?;
    validate_no_cycles(registry)
}
