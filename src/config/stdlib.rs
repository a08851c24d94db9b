//! Installers predefined for common systems.
use crate::registry::Registry;
use crate::resources::package::InstallerRecord;

/// `(system, command prefix)` for every predefined installer.
pub const STANDARD_INSTALLERS: &[(&str, &str)] = &[
    ("arch", "sudo pacman -S --needed --noconfirm"),
    ("debian", "sudo apt install -y"),
    ("fedora", "sudo dnf install -y"),
    ("macos", "brew install"),
    ("ubuntu", "sudo apt install -y"),
];

/// Register the predefined installers. Configuration files may replace them.
pub fn define_standard_library(registry: &mut Registry) {
    for (system, command) in STANDARD_INSTALLERS {
        registry.register_installer(InstallerRecord::command(*system, *command));
    }
}
