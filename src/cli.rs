use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::modules::ModuleId;
use crate::options::{MergeStrategy, Options};

/// Top-level CLI entry point.
#[derive(Parser, Debug)]
#[command(
    name = "tildeconfig",
    about = "Install, update, uninstall, and refresh modular personal configuration",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(flatten)]
    pub global: GlobalOpts,
}

/// Options shared across all subcommands.
#[derive(Parser, Debug, Clone)]
#[allow(clippy::struct_excessive_bools)]
pub struct GlobalOpts {
    /// Configuration file (default: ./tildeconfig.toml or ./.tildeconfig.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Target system for package installation (e.g. ubuntu, arch, macos)
    #[arg(short, long, global = true)]
    pub system: Option<String>,

    /// Install system packages modules depend on (requires --system)
    #[arg(short, long, global = true)]
    pub packages: bool,

    /// Automatically accept prompts
    #[arg(short, long, global = true)]
    pub non_interactive: bool,

    /// Log failed steps and continue instead of stopping
    #[arg(long, global = true)]
    pub ignore_errors: bool,

    /// Run only the named modules, not their dependencies
    #[arg(long, global = true)]
    pub skip_dependencies: bool,

    /// How directories are installed over existing directories
    #[arg(long, global = true, default_value_t = MergeStrategy::Merge, value_name = "merge|override")]
    pub merge_strategy: MergeStrategy,

    /// Fail instead of replacing existing files
    #[arg(long = "no-override", global = true, action = clap::ArgAction::SetFalse)]
    pub allow_override: bool,
}

impl GlobalOpts {
    /// Run options selected by these flags.
    #[must_use]
    pub fn options(&self) -> Options {
        Options {
            system: self.system.clone(),
            install_packages: self.packages,
            interactive: !self.non_interactive,
            ignore_errors: self.ignore_errors,
            skip_dependencies: self.skip_dependencies,
            merge_strategy: self.merge_strategy,
            allow_override: self.allow_override,
        }
    }
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Install modules and their dependencies
    Install(ModuleArgs),
    /// Remove installed module files
    Uninstall(ModuleArgs),
    /// Re-install module files and run update actions
    Update(ModuleArgs),
    /// Copy changed installed files back into the repository
    Refresh(ModuleArgs),
    /// List package installers and whether they are available
    Systems,
    /// Generate shell completions
    Completions(CompletionsOpts),
    /// Print version information
    Version,
}

/// Modules an operation applies to.
#[derive(Parser, Debug, Clone, Default)]
pub struct ModuleArgs {
    /// Modules to operate on (default: all)
    pub modules: Vec<String>,
}

impl ModuleArgs {
    /// The requested module ids.
    #[must_use]
    pub fn ids(&self) -> Vec<ModuleId> {
        self.modules.iter().map(|m| ModuleId::from(m.as_str())).collect()
    }
}

/// Options for the `completions` subcommand.
#[derive(Parser, Debug, Clone)]
pub struct CompletionsOpts {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: clap_complete::Shell,
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
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn defaults_map_to_default_options() {
        let cli = Cli::parse_from(["tildeconfig", "install"]);
        assert_eq!(cli.global.options(), Options::default());
    }

    #[test]
    fn parse_install_modules() {
        let cli = Cli::parse_from(["tildeconfig", "install", "home", "vim"]);
        let Command::Install(args) = cli.command else {
            panic!("expected install");
        };
        let expected: Vec<ModuleId> = vec!["home".into(), "vim".into()];
        assert_eq!(args.ids(), expected);
    }

    #[test]
    fn parse_package_flags() {
        let cli = Cli::parse_from(["tildeconfig", "-p", "-s", "ubuntu", "install"]);
        let options = cli.global.options();
        assert!(options.install_packages);
        assert_eq!(options.system.as_deref(), Some("ubuntu"));
    }

    #[test]
    fn parse_non_interactive_short() {
        let cli = Cli::parse_from(["tildeconfig", "uninstall", "-n"]);
        assert!(!cli.global.options().interactive);
        assert!(matches!(cli.command, Command::Uninstall(_)));
    }

    #[test]
    fn parse_run_policy_flags() {
        let cli = Cli::parse_from([
            "tildeconfig",
            "update",
            "--ignore-errors",
            "--skip-dependencies",
            "--no-override",
            "--merge-strategy",
            "override",
        ]);
        let options = cli.global.options();
        assert!(options.ignore_errors);
        assert!(options.skip_dependencies);
        assert!(!options.allow_override);
        assert_eq!(options.merge_strategy, MergeStrategy::Override);
    }

    #[test]
    fn invalid_merge_strategy_is_rejected() {
        assert!(Cli::try_parse_from(["tildeconfig", "--merge-strategy", "nope", "install"]).is_err());
    }

    #[test]
    fn parse_config_path() {
        let cli = Cli::parse_from(["tildeconfig", "-c", "/tmp/dots.toml", "refresh"]);
        assert_eq!(cli.global.config, Some(PathBuf::from("/tmp/dots.toml")));
        assert!(matches!(cli.command, Command::Refresh(_)));
    }

    #[test]
    fn parse_completions() {
        let cli = Cli::parse_from(["tildeconfig", "completions", "bash"]);
        assert!(matches!(
            cli.command,
            Command::Completions(CompletionsOpts {
                shell: clap_complete::Shell::Bash
            })
        ));
    }

    #[test]
    fn parse_systems_and_version() {
        assert!(matches!(
            Cli::parse_from(["tildeconfig", "systems"]).command,
            Command::Systems
        ));
        assert!(matches!(
            Cli::parse_from(["tildeconfig", "version"]).command,
            Command::Version
        ));
    }

    #[test]
    fn parse_verbose() {
        let cli = Cli::parse_from(["tildeconfig", "-v", "install"]);
        assert!(cli.verbose);
    }
}
