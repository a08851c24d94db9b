#![allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
//! Integration tests for the `refresh` operation.

mod common;

use common::{TestContextBuilder, non_interactive};
use tildeconfig::modules::ModuleId;
use tildeconfig::orchestrator;

const CONFIG: &str = r#"
[[module]]
name = "shell"
root_dir = "shell"
files = [".zshrc", { src = "zsh", dest = ".config/zsh" }]

[[module]]
name = "git"
files = [{ src = "gitconfig", dest = ".gitconfig", symlink = true }]
"#;

fn fixture() -> common::IntegrationTestContext {
    TestContextBuilder::new()
        .with_config(CONFIG)
        .with_repo_file("shell/.zshrc", "original")
        .with_repo_file("shell/zsh/aliases.zsh", "alias ll='ls -l'")
        .with_repo_file("gitconfig", "[user]")
        .build()
}

#[test]
fn copies_edited_files_back_into_repository() {
    let fixture = fixture();
    let (ctx, _log) = fixture.context(non_interactive());
    orchestrator::install(&ctx, &[]).unwrap();

    fixture.write_home(".zshrc", "edited");
    fixture.write_home(".config/zsh/aliases.zsh", "alias ll='ls -la'");
    fixture.write_home(".config/zsh/prompt.zsh", "PROMPT='> '");

    orchestrator::refresh(&ctx, &[]).unwrap();

    assert_eq!(fixture.read_repo("shell/.zshrc"), "edited");
    assert_eq!(fixture.read_repo("shell/zsh/aliases.zsh"), "alias ll='ls -la'");
    assert_eq!(fixture.read_repo("shell/zsh/prompt.zsh"), "PROMPT='> '");
}

#[test]
fn refresh_only_touches_requested_modules() {
    let fixture = fixture();
    let (ctx, log) = fixture.context(non_interactive());
    orchestrator::install(&ctx, &[]).unwrap();
    fixture.write_home(".zshrc", "edited");

    orchestrator::refresh(&ctx, &[ModuleId::from("git")]).unwrap();

    assert_eq!(fixture.read_repo("shell/.zshrc"), "original");
    let last = log.module_entries().pop().unwrap();
    assert_eq!(last.name, "git");
}

#[test]
fn uninstalled_files_are_skipped() {
    let fixture = fixture();
    let (ctx, log) = fixture.context(non_interactive());

    orchestrator::refresh(&ctx, &[]).unwrap();

    assert_eq!(fixture.read_repo("shell/.zshrc"), "original");
    assert!(!log.has_failures());
}
