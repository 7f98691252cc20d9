//! Subcommands module for snapplug CLI
//!
//! This module contains all the subcommand implementations.

pub mod build;
pub mod plugins;
pub mod validate;

use crate::cli::output::OutputFormatter;
use snapplug::config::Config;
use std::path::{Path, PathBuf};

/// Common context shared between commands
pub struct CommandContext {
    /// Configuration
    pub config: Config,
    /// Output formatter
    pub output: OutputFormatter,
}

impl CommandContext {
    /// Create a new command context from CLI arguments
    pub fn new(cli: &crate::cli::Cli, config: Config) -> Self {
        let output = OutputFormatter::new(!cli.no_color, cli.is_json(), cli.verbosity());

        Self {
            config,
            output,
        }
    }

    /// Report a library error and turn it into an exit code
    pub fn fail(&self, err: &snapplug::Error) -> i32 {
        self.output.error(&err.to_string());
        let mut source = std::error::Error::source(err);
        while let Some(cause) = source {
            self.output.detail("caused by", &cause.to_string());
            source = cause.source();
        }
        err.exit_code()
    }
}

/// Directory a project file lives in; relative build directories resolve here
pub fn project_root(project: &Path) -> PathBuf {
    match project.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
