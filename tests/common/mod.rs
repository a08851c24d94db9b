// Shared helpers for integration tests.
//
// Provides a temporary-directory-backed repository and home directory with a
// fluent builder, so each integration test can load a real configuration file
// and run modules without touching the user's files.
//
// Used by all integration test binaries that declare `mod common;`.
#![allow(dead_code)]

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tildeconfig::config::{self, LoadedConfig};
use tildeconfig::exec::{ExecResult, Executor};
use tildeconfig::logging::{Log, Logger};
use tildeconfig::modules::Context;
use tildeconfig::options::Options;
use tildeconfig::prompt::AutoPrompter;

/// Name of the configuration file written into the test repository.
pub const CONFIG_NAME: &str = "tildeconfig.toml";

/// Executor that records shell commands instead of running them.
#[derive(Debug, Default)]
pub struct RecordingExecutor {
    commands: Mutex<Vec<String>>,
    exit_codes: HashMap<String, i32>,
}

impl RecordingExecutor {
    /// Make `command` exit with `code`.
    pub fn failing(mut self, command: &str, code: i32) -> Self {
        self.exit_codes.insert(command.to_string(), code);
        self
    }

    /// Commands received so far.
    pub fn recorded(&self) -> Vec<String> {
        self.commands.lock().expect("lock").clone()
    }
}

impl Executor for RecordingExecutor {
    fn run_shell(&self, command: &str) -> io::Result<ExecResult> {
        self.commands.lock().expect("lock").push(command.to_string());
        Ok(self
            .exit_codes
            .get(command)
            .map_or_else(ExecResult::ok, |&code| ExecResult::failed(code)))
    }

    fn which(&self, _program: &str) -> bool {
        true
    }
}

/// An isolated repository and home directory backed by a
/// [`tempfile::TempDir`].
pub struct IntegrationTestContext {
    /// Temporary directory holding `repo/` and `home/`.
    pub root: tempfile::TempDir,
    /// Executor shared by every context built from this fixture.
    pub executor: Arc<RecordingExecutor>,
}

impl IntegrationTestContext {
    /// Directory containing the configuration file and module sources.
    pub fn repo(&self) -> PathBuf {
        self.root.path().join("repo")
    }

    /// Directory standing in for `$HOME`.
    pub fn home(&self) -> PathBuf {
        self.root.path().join("home")
    }

    /// Path of the configuration file.
    pub fn config_path(&self) -> PathBuf {
        self.repo().join(CONFIG_NAME)
    }

    /// Load the configuration with [`Self::home`] as home directory.
    pub fn try_load(&self) -> anyhow::Result<LoadedConfig> {
        config::load(&self.config_path(), &self.home())
    }

    /// Load the configuration, panicking on error.
    pub fn load(&self) -> LoadedConfig {
        self.try_load().expect("load config")
    }

    /// Build a run context from the loaded configuration.
    pub fn context(&self, options: Options) -> (Context, Arc<Logger>) {
        let loaded = self.load();
        let log = Arc::new(Logger::new("test"));
        let ctx = Context::new(
            loaded.registry,
            options,
            loaded.settings,
            Arc::clone(&log) as Arc<dyn Log>,
            Arc::clone(&self.executor) as Arc<dyn Executor>,
            Arc::new(AutoPrompter),
        );
        (ctx, log)
    }

    /// Read a file under the home directory.
    pub fn read_home(&self, rel: &str) -> String {
        std::fs::read_to_string(self.home().join(rel)).expect("read home file")
    }

    /// Read a file under the repository.
    pub fn read_repo(&self, rel: &str) -> String {
        std::fs::read_to_string(self.repo().join(rel)).expect("read repo file")
    }

    /// Write a file under the home directory, creating parents.
    pub fn write_home(&self, rel: &str, content: &str) {
        write(&self.home().join(rel), content);
    }
}

/// Options for a run that never prompts.
pub fn non_interactive() -> Options {
    Options {
        interactive: false,
        ..Options::default()
    }
}

fn write(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create parent dir");
    }
    std::fs::write(path, content).expect("write file");
}

/// Fluent builder for [`IntegrationTestContext`].
pub struct TestContextBuilder {
    ctx: IntegrationTestContext,
}

impl TestContextBuilder {
    /// Begin building with empty `repo/` and `home/` directories.
    pub fn new() -> Self {
        let root = tempfile::tempdir().expect("create temp dir");
        std::fs::create_dir_all(root.path().join("repo")).expect("create repo dir");
        std::fs::create_dir_all(root.path().join("home")).expect("create home dir");
        Self {
            ctx: IntegrationTestContext {
                root,
                executor: Arc::new(RecordingExecutor::default()),
            },
        }
    }

    /// Write the configuration file.
    pub fn with_config(self, content: &str) -> Self {
        write(&self.ctx.config_path(), content);
        self
    }

    /// Write a source file under the repository.
    pub fn with_repo_file(self, rel: &str, content: &str) -> Self {
        write(&self.ctx.repo().join(rel), content);
        self
    }

    /// Write a pre-existing file under the home directory.
    pub fn with_home_file(self, rel: &str, content: &str) -> Self {
        self.ctx.write_home(rel, content);
        self
    }

    /// Use `executor` for shell actions.
    pub fn with_executor(mut self, executor: RecordingExecutor) -> Self {
        self.ctx.executor = Arc::new(executor);
        self
    }

    /// Finish building and return the configured context.
    pub fn build(self) -> IntegrationTestContext {
        self.ctx
    }
}
