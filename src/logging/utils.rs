//! Helpers for the run log file: its location, timestamps, and plain-text
//! rendering of colored console messages.
use std::path::PathBuf;

use crate::registry::home_dir;

/// Clock format used on every log file line.
pub(super) const CLOCK: &str = "%H:%M:%S";

/// Date and clock format used in the log file header.
pub(super) const DATE_AND_CLOCK: &str = "%Y-%m-%d %H:%M:%S";

/// Path of the log file for `command`:
/// `$XDG_CACHE_HOME/tildeconfig/<command>.log`, with `~/.cache` standing in
/// for an unset or empty `XDG_CACHE_HOME`.
///
/// Creates the directory. Returns `None` if it cannot be created.
pub(super) fn log_file_path(command: &str) -> Option<PathBuf> {
    let cache = std::env::var_os("XDG_CACHE_HOME")
        .filter(|dir| !dir.is_empty())
        .map_or_else(|| home_dir().join(".cache"), PathBuf::from);
    let dir = cache.join("tildeconfig");
    std::fs::create_dir_all(&dir).ok()?;
    Some(dir.join(format!("{command}.log")))
}

/// Current UTC time rendered with a `chrono` format string.
pub(super) fn utc_now(format: &str) -> String {
    chrono::Utc::now().format(format).to_string()
}

/// Remove ANSI escapes from `s`.
///
/// CSI sequences run from `ESC [` to their final byte (`@` through `~`);
/// any other escape is two characters long.
pub(super) fn strip_ansi(s: &str) -> String {
    let mut parts = s.split('\x1b');
    let mut out = parts.next().unwrap_or_default().to_string();
    for part in parts {
        let text = if let Some(csi) = part.strip_prefix('[') {
            csi.find(|c: char| ('@'..='~').contains(&c))
                .and_then(|end| csi.get(end + 1..))
                .unwrap_or_default()
        } else {
            let mut chars = part.chars();
            chars.next();
            chars.as_str()
        };
        out.push_str(text);
    }
    out
}
