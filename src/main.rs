use anyhow::Result;
use clap::Parser;
use std::sync::Arc;

use tildeconfig::cli::{Cli, Command};
use tildeconfig::{commands, logging};

/// Exit status after Ctrl-C.
const EXIT_INTERRUPTED: i32 = 130;

fn main() -> Result<()> {
    let _ = enable_ansi_support::enable_ansi_support();
    let args = Cli::parse();

    let command_name = match &args.command {
        Command::Install(_) => "install",
        Command::Uninstall(_) => "uninstall",
        Command::Update(_) => "update",
        Command::Refresh(_) => "refresh",
        Command::Systems => "systems",
        Command::Completions(_) => "completions",
        Command::Version => "version",
    };
    logging::init_subscriber(args.verbose, command_name);
    let log = Arc::new(logging::Logger::new(command_name));

    let handler_log = Arc::clone(&log);
    ctrlc::set_handler(move || {
        handler_log.error("interrupted");
        std::process::exit(EXIT_INTERRUPTED);
    })?;

    match args.command {
        Command::Install(opts) => commands::install::run(&args.global, &opts, &log),
        Command::Uninstall(opts) => commands::uninstall::run(&args.global, &opts, &log),
        Command::Update(opts) => commands::update::run(&args.global, &opts, &log),
        Command::Refresh(opts) => commands::refresh::run(&args.global, &opts, &log),
        Command::Systems => commands::systems::run(&args.global, &log),
        Command::Completions(opts) => {
            commands::completions::run(&opts);
            Ok(())
        }
        Command::Version => {
            commands::version::run();
            Ok(())
        }
    }
}
