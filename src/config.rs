//! Server configuration.
//!
//! Everything is taken from the command line. No environment variables are read.

use crate::executor::DEFAULT_TASK_BINARY;
use clap::Parser;
use std::path::PathBuf;

/// Default tracing filter.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Serve the tasks of a Taskfile as MCP tools over stdio.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "taskfile-mcp")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Directory containing the Taskfile (defaults to the current directory).
    #[arg(long, value_name = "PATH")]
    pub dir: Option<PathBuf>,

    /// Explicit Taskfile path, relative to the working directory.
    #[arg(long, value_name = "PATH")]
    pub taskfile: Option<PathBuf>,

    /// The task runner executable.
    #[arg(long, value_name = "PATH", default_value = DEFAULT_TASK_BINARY)]
    pub task_binary: PathBuf,

    /// Write logs to this file instead of stderr.
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Log filter, e.g. `info` or `taskfile_mcp=debug`.
    #[arg(long, value_name = "FILTER", default_value = DEFAULT_LOG_LEVEL)]
    pub log_level: String,
}

/// Resolved server settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Working directory override.
    pub dir: Option<PathBuf>,
    /// Taskfile path override.
    pub taskfile: Option<PathBuf>,
    /// The task runner executable.
    pub task_binary: PathBuf,
    /// Log file, if logging to a file.
    pub log_file: Option<PathBuf>,
    /// Tracing filter directive.
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            dir: None,
            taskfile: None,
            task_binary: PathBuf::from(DEFAULT_TASK_BINARY),
            log_file: None,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl From<Cli> for ServerConfig {
    fn from(cli: Cli) -> Self {
        Self {
            dir: cli.dir,
            taskfile: cli.taskfile,
            task_binary: cli.task_binary,
            log_file: cli.log_file,
            log_level: cli.log_level,
        }
    }
}

impl ServerConfig {
    /// Start from defaults with an explicit working directory.
    #[must_use]
    pub fn for_dir(dir: impl Into<PathBuf>) -> Self {
        Self { dir: Some(dir.into()), ..Self::default() }
    }
}
