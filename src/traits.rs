//! The seam between the tool adapter and the task runner.

use crate::error::Result;
use crate::invoke::VariableBindings;
use std::future::Future;
use std::path::{Path, PathBuf};

/// Output captured from one task execution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapturedOutput {
    /// Bytes written to standard output.
    pub stdout: Vec<u8>,
    /// Bytes written to standard error.
    pub stderr: Vec<u8>,
}

/// An isolated runtime handle for running tasks.
///
/// Each tool call builds its own context, so the capture buffers are never
/// shared between concurrent calls.
#[derive(Debug)]
pub struct ExecutionContext {
    workdir: PathBuf,
    manifest_path: PathBuf,
    silent: bool,
    /// The capture buffers the runner writes into.
    pub output: CapturedOutput,
}

impl ExecutionContext {
    /// Create a context with empty capture buffers.
    #[must_use]
    pub fn new(workdir: impl Into<PathBuf>, manifest_path: impl Into<PathBuf>, silent: bool) -> Self {
        Self {
            workdir: workdir.into(),
            manifest_path: manifest_path.into(),
            silent,
            output: CapturedOutput::default(),
        }
    }

    /// Directory tasks run in.
    #[must_use]
    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// The Taskfile this context was set up from.
    #[must_use]
    pub fn manifest_path(&self) -> &Path {
        &self.manifest_path
    }

    /// Whether incidental runner chatter is suppressed.
    #[must_use]
    pub const fn silent(&self) -> bool {
        self.silent
    }

    /// Captured standard output as text.
    #[must_use]
    pub fn stdout_text(&self) -> String {
        String::from_utf8_lossy(&self.output.stdout).into_owned()
    }

    /// Captured standard error as text.
    #[must_use]
    pub fn stderr_text(&self) -> String {
        String::from_utf8_lossy(&self.output.stderr).into_owned()
    }
}

/// One request to run a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskCall {
    /// Name of the task to run.
    pub task: String,
    /// Variables to pass to the task.
    pub vars: VariableBindings,
}

/// Trait for running Taskfile tasks.
///
/// This trait abstracts the task runner for testability.
pub trait TaskExecutor: Send + Sync + 'static {
    /// Set up a fresh execution context rooted at `workdir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the Taskfile can no longer be found or parsed.
    fn create_context(&self, workdir: &Path, silent: bool) -> Result<ExecutionContext>;

    /// Run one task, writing its output into the context's buffers.
    ///
    /// Dropping the returned future must stop the task.
    ///
    /// # Errors
    ///
    /// Returns an error if the runner cannot be started or the task fails.
    fn run(
        &self,
        context: &mut ExecutionContext,
        call: &TaskCall,
    ) -> impl Future<Output = Result<()>> + Send;
}
