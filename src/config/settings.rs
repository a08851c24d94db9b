//! Global settings from the `[settings]` table.
use std::path::Path;

use serde::Deserialize;

/// Diff command used by refresh when none is configured.
pub const DEFAULT_DIFF_COMMAND: &str = "diff -u \"%a\" \"%b\"";

/// Settings shared by every module.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Command comparing a repository file (`%a`) with its installed copy
    /// (`%b`).
    pub diff_command: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            diff_command: DEFAULT_DIFF_COMMAND.to_string(),
        }
    }
}

impl Settings {
    /// The diff command with `%a` and `%b` replaced by `a` and `b`.
    #[must_use]
    pub fn diff_command_for(&self, a: &Path, b: &Path) -> String {
        self.diff_command
            .replace("%a", &a.to_string_lossy())
            .replace("%b", &b.to_string_lossy())
    }
}
