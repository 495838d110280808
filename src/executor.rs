//! Task execution through the `task` command-line runner.

use crate::error::{Error, Result};
use crate::taskfile;
use crate::traits::{CapturedOutput, ExecutionContext, TaskCall, TaskExecutor};
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};

/// Default runner executable, looked up on `PATH`.
pub const DEFAULT_TASK_BINARY: &str = "task";

/// ETXTBSY error code (errno 26 on Linux).
/// This error occurs when trying to execute a file that is currently being written.
const ETXTBSY: i32 = 26;

/// Spawn attempts made while the executable stays busy.
const ETXTBSY_MAX_ATTEMPTS: u32 = 50;

/// Spawn a command, retrying while the executable is busy.
///
/// ETXTBSY ("Text file busy") can occur on overlay filesystems (like Docker)
/// when executing a script that was just created. The process has not started
/// at that point, so retrying does not run the task twice.
async fn spawn_with_etxtbsy_retry<F>(mut spawn_fn: F) -> std::io::Result<Child>
where
    F: FnMut() -> std::io::Result<Child>,
{
    let mut attempts = 1;
    loop {
        match spawn_fn() {
            Ok(child) => return Ok(child),
            Err(e) if e.raw_os_error() == Some(ETXTBSY) && attempts < ETXTBSY_MAX_ATTEMPTS => {
                attempts += 1;
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Whether a caller-supplied name can be passed as `NAME=value` without the
/// runner reading it as a flag.
fn is_passable_var_name(name: &str) -> bool {
    !name.is_empty() && !name.starts_with('-') && !name.contains('=')
}

/// Describe a non-zero exit the way the runner's own callers report it.
fn describe_exit(status: ExitStatus) -> String {
    status
        .code()
        .map_or_else(|| "terminated by signal".to_string(), |code| format!("exit status {code}"))
}

/// Runs tasks by spawning the `task` executable.
#[derive(Debug, Clone)]
pub struct TaskCli {
    binary: PathBuf,
    taskfile: Option<PathBuf>,
}

impl Default for TaskCli {
    fn default() -> Self {
        Self::new(DEFAULT_TASK_BINARY)
    }
}

impl TaskCli {
    /// Create a runner using the given executable.
    #[must_use]
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self { binary: binary.into(), taskfile: None }
    }

    /// Use an explicit Taskfile instead of discovering one in the working directory.
    #[must_use]
    pub fn with_taskfile(mut self, taskfile: Option<PathBuf>) -> Self {
        self.taskfile = taskfile;
        self
    }

    /// The runner executable.
    #[must_use]
    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// Build the command line for one call.
    fn command(&self, context: &ExecutionContext, call: &TaskCall) -> Command {
        let mut command = Command::new(&self.binary);
        command
            .current_dir(context.workdir())
            .arg("--dir")
            .arg(context.workdir())
            .arg("--taskfile")
            .arg(context.manifest_path());
        if context.silent() {
            command.arg("--silent");
        }
        command.arg(&call.task);

        for (name, value) in call.vars.iter() {
            if is_passable_var_name(name) {
                command.arg(format!("{name}={value}"));
            } else {
                tracing::warn!(task = %call.task, variable = name, "dropping invalid variable name");
            }
        }

        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        command
    }
}

impl TaskExecutor for TaskCli {
    fn create_context(&self, workdir: &Path, silent: bool) -> Result<ExecutionContext> {
        let manifest_path = taskfile::locate(workdir, self.taskfile.as_deref())?;
        taskfile::load(&manifest_path)?;
        Ok(ExecutionContext::new(workdir, manifest_path, silent))
    }

    async fn run(&self, context: &mut ExecutionContext, call: &TaskCall) -> Result<()> {
        let mut command = self.command(context, call);
        let program = self.binary.display().to_string();
        tracing::debug!(program = %program, task = %call.task, "spawning task runner");

        let mut child = spawn_with_etxtbsy_retry(|| command.spawn())
            .await
            .map_err(move |source| Error::Spawn { program, source })?;

        let mut stdout = child.stdout.take();
        let mut stderr = child.stderr.take();
        let CapturedOutput { stdout: stdout_buf, stderr: stderr_buf } = &mut context.output;

        // Reads append in place, so a dropped run keeps what arrived so far.
        let read_stdout = async {
            match stdout.as_mut() {
                Some(pipe) => pipe.read_to_end(stdout_buf).await.map(drop),
                None => Ok(()),
            }
        };
        let read_stderr = async {
            match stderr.as_mut() {
                Some(pipe) => pipe.read_to_end(stderr_buf).await.map(drop),
                None => Ok(()),
            }
        };

        let (stdout_read, stderr_read, status) =
            tokio::join!(read_stdout, read_stderr, child.wait());
        stdout_read?;
        stderr_read?;
        let status = status?;

        if status.success() {
            Ok(())
        } else {
            Err(Error::TaskFailed(describe_exit(status)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invoke::VariableBindings;
    use std::fs;
    use tempfile::TempDir;

    fn call(task: &str, vars: &[(&str, &str)]) -> TaskCall {
        TaskCall { task: task.to_string(), vars: vars.iter().copied().collect() }
    }

    fn args_of(command: &Command) -> Vec<String> {
        command.as_std().get_args().map(|a| a.to_string_lossy().into_owned()).collect()
    }

    #[test]
    fn test_command_line() {
        let runner = TaskCli::new("task");
        let context = ExecutionContext::new("/project", "/project/Taskfile.yml", true);
        let command = runner.command(&context, &call("greet", &[("NAME", "bob"), ("X", "a b")]));

        assert_eq!(command.as_std().get_program(), "task");
        assert_eq!(
            args_of(&command),
            [
                "--dir",
                "/project",
                "--taskfile",
                "/project/Taskfile.yml",
                "--silent",
                "greet",
                "NAME=bob",
                "X=a b"
            ]
        );
    }

    #[test]
    fn test_command_line_not_silent() {
        let runner = TaskCli::default();
        let context = ExecutionContext::new("/p", "/p/Taskfile.yml", false);
        let command = runner.command(&context, &call("build", &[]));
        assert!(!args_of(&command).contains(&"--silent".to_string()));
    }

    #[test]
    fn test_flag_like_variables_dropped() {
        let runner = TaskCli::default();
        let context = ExecutionContext::new("/p", "/p/Taskfile.yml", true);
        let command =
            runner.command(&context, &call("build", &[("--force", "1"), ("A=B", "c"), ("", "d")]));
        assert_eq!(args_of(&command).last().map(String::as_str), Some("build"));
    }

    #[test]
    fn test_describe_exit() {
        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            assert_eq!(describe_exit(ExitStatus::from_raw(1 << 8)), "exit status 1");
            assert_eq!(describe_exit(ExitStatus::from_raw(9)), "terminated by signal");
        }
    }

    #[test]
    fn test_create_context_requires_taskfile() {
        let dir = TempDir::new().unwrap();
        let runner = TaskCli::default();
        assert!(matches!(
            runner.create_context(dir.path(), true),
            Err(Error::ManifestNotFound(_))
        ));
    }

    #[test]
    fn test_create_context_with_explicit_taskfile() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("tasks.yml"), "tasks:\n  a: echo a\n").unwrap();

        let runner = TaskCli::default().with_taskfile(Some(PathBuf::from("tasks.yml")));
        let context = runner.create_context(dir.path(), true).unwrap();
        assert_eq!(context.manifest_path(), dir.path().join("tasks.yml"));
    }

    #[test]
    fn test_create_context_rejects_broken_taskfile() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("Taskfile.yml"), "tasks: [").unwrap();
        let runner = TaskCli::default();
        assert!(matches!(
            runner.create_context(dir.path(), true),
            Err(Error::InvalidManifest { .. })
        ));
    }

    #[tokio::test]
    async fn test_missing_binary_is_spawn_error() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("Taskfile.yml"), "tasks:\n  a: echo a\n").unwrap();

        let runner = TaskCli::new("definitely_not_a_real_command_12345");
        let mut context = runner.create_context(dir.path(), true).unwrap();
        let err = runner
            .run(&mut context, &TaskCall { task: "a".into(), vars: VariableBindings::default() })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Spawn { .. }));
    }

    #[cfg(unix)]
    fn fake_runner(dir: &Path, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("fake-task");
        fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_captures_both_streams() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("Taskfile.yml"), "tasks:\n  greet: echo hi\n").unwrap();
        let script = fake_runner(dir.path(), r#"shift 5; echo "args: $*"; echo "careful" >&2"#);

        let runner = TaskCli::new(script);
        let mut context = runner.create_context(dir.path(), true).unwrap();
        runner.run(&mut context, &call("greet", &[("NAME", "bob")])).await.unwrap();

        assert_eq!(context.stdout_text(), "args: greet NAME=bob\n");
        assert_eq!(context.stderr_text(), "careful\n");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_reports_exit_status() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("Taskfile.yml"), "tasks:\n  build: go build\n").unwrap();
        let script = fake_runner(dir.path(), "echo partial; echo 'compile error' >&2; exit 1");

        let runner = TaskCli::new(script);
        let mut context = runner.create_context(dir.path(), true).unwrap();
        let err = runner.run(&mut context, &call("build", &[])).await.unwrap_err();

        assert_eq!(err.to_string(), "exit status 1");
        assert_eq!(context.stdout_text(), "partial\n");
        assert_eq!(context.stderr_text(), "compile error\n");
    }

    #[tokio::test]
    async fn test_spawn_with_etxtbsy_retry_retries_on_etxtbsy() {
        let mut call_count = 0;
        let result = spawn_with_etxtbsy_retry(|| {
            call_count += 1;
            if call_count < 3 {
                Err(std::io::Error::from_raw_os_error(ETXTBSY))
            } else {
                Err(std::io::Error::from_raw_os_error(2))
            }
        })
        .await;

        assert_eq!(call_count, 3);
        assert_eq!(result.unwrap_err().raw_os_error(), Some(2));
    }

    #[tokio::test]
    async fn test_spawn_with_etxtbsy_retry_gives_up() {
        let mut call_count = 0;
        let result = spawn_with_etxtbsy_retry(|| {
            call_count += 1;
            Err(std::io::Error::from_raw_os_error(ETXTBSY))
        })
        .await;

        assert_eq!(call_count, ETXTBSY_MAX_ATTEMPTS);
        assert_eq!(result.unwrap_err().raw_os_error(), Some(ETXTBSY));
    }

    #[tokio::test]
    async fn test_spawn_with_etxtbsy_retry_propagates_other_errors() {
        let mut call_count = 0;
        let result = spawn_with_etxtbsy_retry(|| {
            call_count += 1;
            Err(std::io::Error::from_raw_os_error(2))
        })
        .await;

        assert!(result.is_err());
        assert_eq!(call_count, 1);
    }
}
