//! Error types for `taskfile_mcp`.

use std::path::PathBuf;

/// Errors that can occur while loading a Taskfile or running its tasks.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A JSON serialization error occurred.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The Taskfile is not valid YAML or does not have the expected shape.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// The working directory could not be determined.
    #[error("failed to get working directory: {0}")]
    WorkingDirectory(String),

    /// No Taskfile exists at the expected location.
    #[error("Taskfile not found: {0}")]
    ManifestNotFound(PathBuf),

    /// The Taskfile could not be read or parsed.
    #[error("invalid Taskfile {path}: {reason}")]
    InvalidManifest {
        /// Path of the offending file.
        path: PathBuf,
        /// What went wrong.
        reason: String,
    },

    /// The Taskfile declares no tasks.
    #[error("no tasks found in Taskfile")]
    NoTasks,

    /// The task runner executable could not be started.
    #[error("failed to start '{program}': {source}")]
    Spawn {
        /// The program that was run.
        program: String,
        /// The underlying spawn error.
        #[source]
        source: std::io::Error,
    },

    /// The task runner reported a failure.
    #[error("{0}")]
    TaskFailed(String),

    /// The call was cancelled before the task finished.
    #[error("task cancelled")]
    Cancelled,

    /// Logging could not be initialised.
    #[error("logging error: {0}")]
    Logging(String),

    /// The MCP transport failed.
    #[error("transport error: {0}")]
    Transport(String),
}

/// A specialized Result type for this crate.
pub type Result<T> = std::result::Result<T, Error>;
