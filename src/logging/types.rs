//! Core logging types: module entries, status, and the [`Log`] trait.

/// Module execution result for summary reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleEntry {
    /// Module name.
    pub name: String,
    /// Final status of the module.
    pub status: ModuleStatus,
    /// Optional detail message (e.g. the error description).
    pub message: Option<String>,
}

/// Status of a module after an orchestrated run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleStatus {
    /// Every step succeeded.
    Ok,
    /// The module finished, but some steps failed under `--ignore-errors`.
    IgnoredErrors,
    /// A step failed and the run was stopped.
    Failed,
    /// The module was scheduled but never started because an earlier one failed.
    NotRun,
}

/// Abstraction over logging backends.
///
/// Module code logs through this trait so tests can observe or silence
/// output without a global subscriber.
pub trait Log: Send + Sync {
    /// Log a stage header (major section).
    fn stage(&self, msg: &str);
    /// Log an informational message.
    fn info(&self, msg: &str);
    /// Log a debug message (may be suppressed on console).
    fn debug(&self, msg: &str);
    /// Log a warning message.
    fn warn(&self, msg: &str);
    /// Log an error message.
    fn error(&self, msg: &str);
    /// Record a module result for the summary.
    fn record_module(&self, name: &str, status: ModuleStatus, message: Option<&str>);
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn module_status_equality() {
        assert_eq!(ModuleStatus::Ok, ModuleStatus::Ok);
        assert_ne!(ModuleStatus::Ok, ModuleStatus::IgnoredErrors);
        assert_ne!(ModuleStatus::Failed, ModuleStatus::NotRun);
    }
}
