//! Running one task on behalf of one tool call.
//!
//! A call is attempted exactly once. Whatever happens (setup failure, task
//! failure, cancellation) the caller gets back a single [`InvocationResult`].

use crate::error::Error;
use crate::traits::{TaskCall, TaskExecutor};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::future::Future;
use std::path::Path;

/// Variables passed to one task execution.
///
/// Built from the caller's arguments only. Variables the caller leaves out are
/// resolved by the task runner from the Taskfile defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariableBindings {
    values: BTreeMap<String, String>,
}

impl VariableBindings {
    /// Keep the string-valued arguments. Other JSON values are dropped.
    pub fn from_arguments(arguments: Option<&Map<String, Value>>) -> Self {
        let values = arguments
            .into_iter()
            .flatten()
            .filter_map(|(name, value)| value.as_str().map(|text| (name.clone(), text.to_string())))
            .collect();
        Self { values }
    }

    /// Look up a binding.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Iterate over the bindings in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(name, value)| (name.as_str(), value.as_str()))
    }

    /// Number of bindings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether there are no bindings.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for VariableBindings {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self { values: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect() }
    }
}

/// How an invocation ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The task ran and succeeded.
    Success,
    /// No execution context could be set up.
    SetupFailed(String),
    /// The task failed or was cancelled.
    Failed(String),
}

/// The result of one tool call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationResult {
    /// The task that was invoked.
    pub task: String,
    /// How it ended.
    pub outcome: Outcome,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
}

impl InvocationResult {
    /// Whether the task succeeded.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self.outcome, Outcome::Success)
    }

    /// The response text: a status line, then `Output` and `Errors` sections
    /// for whatever the task wrote.
    #[must_use]
    pub fn message(&self) -> String {
        let mut text = match &self.outcome {
            Outcome::Success => format!("Task '{}' completed successfully.\n", self.task),
            Outcome::SetupFailed(error) => format!("Task '{}' setup failed: {error}", self.task),
            Outcome::Failed(error) => format!("Task '{}' failed with error: {error}\n", self.task),
        };

        if !self.stdout.is_empty() {
            let _ = write!(text, "\nOutput:\n{}", self.stdout);
        }
        if !self.stderr.is_empty() {
            let _ = write!(text, "\nErrors:\n{}", self.stderr);
        }
        text
    }
}

/// Run `task_name` once with the caller's arguments.
///
/// The run races `cancelled`; if that completes first the run is dropped and
/// the call reports a cancellation failure.
pub async fn invoke_task<E, C>(
    executor: &E,
    workdir: &Path,
    task_name: &str,
    arguments: Option<&Map<String, Value>>,
    cancelled: C,
) -> InvocationResult
where
    E: TaskExecutor,
    C: Future<Output = ()> + Send,
{
    let call =
        TaskCall { task: task_name.to_string(), vars: VariableBindings::from_arguments(arguments) };

    let mut context = match executor.create_context(workdir, true) {
        Ok(context) => context,
        Err(e) => {
            tracing::warn!(task = task_name, error = %e, "execution context setup failed");
            return InvocationResult {
                task: call.task,
                outcome: Outcome::SetupFailed(e.to_string()),
                stdout: String::new(),
                stderr: String::new(),
            };
        }
    };

    tracing::info!(task = task_name, vars = call.vars.len(), "running task");
    let result = tokio::select! {
        result = executor.run(&mut context, &call) => result,
        () = cancelled => Err(Error::Cancelled),
    };

    let outcome = match result {
        Ok(()) => {
            tracing::info!(task = task_name, "task completed");
            Outcome::Success
        }
        Err(e) => {
            tracing::warn!(task = task_name, error = %e, "task failed");
            Outcome::Failed(e.to_string())
        }
    };

    InvocationResult {
        task: call.task,
        outcome,
        stdout: context.stdout_text(),
        stderr: context.stderr_text(),
    }
}
