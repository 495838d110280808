//! Testing utilities and mock implementations.
//!
//! These types are provided for use in tests. They may appear unused in
//! the library itself but are consumed by unit and integration tests.

#![allow(dead_code)]

use crate::error::{Error, Result};
use crate::traits::{ExecutionContext, TaskCall, TaskExecutor};
use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::Mutex;

/// What the mock does when a task is run.
#[derive(Debug, Clone)]
enum Behaviour {
    Succeed { stdout: String, stderr: String },
    Fail { error: String, stdout: String, stderr: String },
    Hang { stdout: String },
}

/// A mock task executor for testing.
///
/// Outcomes are scripted per task name and consumed in order. Every call is
/// recorded so tests can check what reached the runner.
#[derive(Debug, Default)]
pub struct MockExecutor {
    behaviours: Mutex<HashMap<String, VecDeque<Behaviour>>>,
    calls: Mutex<Vec<TaskCall>>,
    setup_error: Mutex<Option<String>>,
}

impl MockExecutor {
    /// Create a new mock executor with no expectations.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, task: &str, behaviour: Behaviour) {
        self.behaviours
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .entry(task.to_string())
            .or_default()
            .push_back(behaviour);
    }

    /// Expect `task` to run and succeed with the given output.
    pub fn expect_success(&self, task: &str, stdout: &str, stderr: &str) {
        self.push(
            task,
            Behaviour::Succeed { stdout: stdout.to_string(), stderr: stderr.to_string() },
        );
    }

    /// Expect `task` to run and fail with `error` after writing the given output.
    pub fn expect_failure(&self, task: &str, error: &str, stdout: &str, stderr: &str) {
        self.push(
            task,
            Behaviour::Fail {
                error: error.to_string(),
                stdout: stdout.to_string(),
                stderr: stderr.to_string(),
            },
        );
    }

    /// Expect `task` to write `stdout` and then never finish.
    pub fn expect_hang(&self, task: &str, stdout: &str) {
        self.push(task, Behaviour::Hang { stdout: stdout.to_string() });
    }

    /// Make every context setup fail with `message`.
    pub fn fail_setup(&self, message: &str) {
        *self.setup_error.lock().unwrap_or_else(std::sync::PoisonError::into_inner) =
            Some(message.to_string());
    }

    /// Every call made so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<TaskCall> {
        self.calls.lock().unwrap_or_else(std::sync::PoisonError::into_inner).clone()
    }

    fn next_behaviour(&self, call: &TaskCall) -> Behaviour {
        self.calls.lock().unwrap_or_else(std::sync::PoisonError::into_inner).push(call.clone());

        let behaviour = self
            .behaviours
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get_mut(&call.task)
            .and_then(VecDeque::pop_front);

        behaviour.unwrap_or_else(|| {
            panic!("Unexpected task run: {} (no more expectations)", call.task)
        })
    }
}

impl TaskExecutor for MockExecutor {
    fn create_context(&self, workdir: &Path, silent: bool) -> Result<ExecutionContext> {
        let setup_error =
            self.setup_error.lock().unwrap_or_else(std::sync::PoisonError::into_inner).clone();
        match setup_error {
            Some(message) => Err(Error::TaskFailed(message)),
            None => Ok(ExecutionContext::new(workdir, workdir.join("Taskfile.yml"), silent)),
        }
    }

    async fn run(&self, context: &mut ExecutionContext, call: &TaskCall) -> Result<()> {
        match self.next_behaviour(call) {
            Behaviour::Succeed { stdout, stderr } => {
                context.output.stdout.extend_from_slice(stdout.as_bytes());
                context.output.stderr.extend_from_slice(stderr.as_bytes());
                Ok(())
            }
            Behaviour::Fail { error, stdout, stderr } => {
                context.output.stdout.extend_from_slice(stdout.as_bytes());
                context.output.stderr.extend_from_slice(stderr.as_bytes());
                Err(Error::TaskFailed(error))
            }
            Behaviour::Hang { stdout } => {
                context.output.stdout.extend_from_slice(stdout.as_bytes());
                std::future::pending::<()>().await;
                Ok(())
            }
        }
    }
}
