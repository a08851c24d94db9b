//! Command: generate shell completion scripts.
use std::io::Write;

use clap::CommandFactory;

use crate::cli::{Cli, CompletionsOpts};

/// Write the completion script for `opts.shell` to `out`.
pub fn generate(opts: &CompletionsOpts, out: &mut dyn Write) {
    let mut command = Cli::command();
    let name = command.get_name().to_string();
    clap_complete::generate(opts.shell, &mut command, name, out);
}

/// Print the completion script for `opts.shell` to stdout.
pub fn run(opts: &CompletionsOpts) {
    generate(opts, &mut std::io::stdout());
}
