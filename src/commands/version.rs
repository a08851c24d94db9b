//! Command: print version information.

/// Version reported by the binary: the release or `git describe` version when
/// the build provides one, else the crate version.
pub const VERSION: &str = match option_env!("TILDECONFIG_VERSION") {
    Some(version) => version,
    None => env!("CARGO_PKG_VERSION"),
};

/// Print the tildeconfig version to stdout.
#[allow(clippy::print_stdout)]
pub fn run() {
    println!("tildeconfig {VERSION}");
}
