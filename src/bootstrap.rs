//! One-time startup: working directory, Taskfile, tool registry.
//!
//! Every failure here is fatal for the process. Nothing is registered unless
//! the Taskfile loads and declares at least one task.

use crate::config::ServerConfig;
use crate::error::{Error, Result};
use crate::executor::TaskCli;
use crate::registry::ToolRegistry;
use crate::taskfile::{self, Manifest};
use std::path::{Path, PathBuf};

/// State established at startup and shared read-only afterwards.
#[derive(Debug)]
pub struct Bootstrap {
    /// Directory every task runs in.
    pub workdir: PathBuf,
    /// The Taskfile as loaded at startup.
    pub manifest: Manifest,
    /// The tools derived from it.
    pub registry: ToolRegistry,
}

/// Resolve the working directory.
///
/// A relative override is taken relative to the process's current directory.
///
/// # Errors
///
/// Returns [`Error::WorkingDirectory`] if the current directory is unavailable
/// or the override is not a directory.
pub fn resolve_workdir(dir: Option<&Path>) -> Result<PathBuf> {
    let current = || std::env::current_dir().map_err(|e| Error::WorkingDirectory(e.to_string()));

    let workdir = match dir {
        Some(dir) if dir.is_absolute() => dir.to_path_buf(),
        Some(dir) => current()?.join(dir),
        None => current()?,
    };

    if workdir.is_dir() {
        Ok(workdir)
    } else {
        Err(Error::WorkingDirectory(format!("{} is not a directory", workdir.display())))
    }
}

impl Bootstrap {
    /// Resolve the working directory, load the Taskfile and register its tasks.
    ///
    /// # Errors
    ///
    /// Returns an error if the working directory cannot be determined, the
    /// Taskfile is missing or unparsable, or it declares no tasks.
    pub fn load(config: &ServerConfig) -> Result<Self> {
        let workdir = resolve_workdir(config.dir.as_deref())?;
        let manifest = taskfile::load_from(&workdir, config.taskfile.as_deref())?;
        tracing::info!(path = %manifest.path.display(), "loaded Taskfile");

        let registry = ToolRegistry::from_manifest(&manifest)?;
        tracing::info!(tools = registry.len(), "registered tasks as tools");

        Ok(Self { workdir, manifest, registry })
    }

    /// The task runner described by `config`.
    #[must_use]
    pub fn executor(config: &ServerConfig) -> TaskCli {
        TaskCli::new(config.task_binary.clone()).with_taskfile(config.taskfile.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_load_registers_public_tasks() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("Taskfile.yml"),
            "version: '3'\ntasks:\n  build:\n    desc: Build it\n  ':internal-helper': echo\n",
        )
        .unwrap();

        let bootstrap = Bootstrap::load(&ServerConfig::for_dir(dir.path())).unwrap();
        assert_eq!(bootstrap.workdir, dir.path());
        assert_eq!(bootstrap.manifest.path, dir.path().join("Taskfile.yml"));
        assert_eq!(bootstrap.registry.names(), ["build"]);
    }

    #[test]
    fn test_missing_taskfile_is_fatal() {
        let dir = TempDir::new().unwrap();
        let err = Bootstrap::load(&ServerConfig::for_dir(dir.path())).unwrap_err();
        assert!(matches!(err, Error::ManifestNotFound(_)));
    }

    #[test]
    fn test_unparsable_taskfile_is_fatal() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("Taskfile.yml"), "tasks: [").unwrap();
        let err = Bootstrap::load(&ServerConfig::for_dir(dir.path())).unwrap_err();
        assert!(matches!(err, Error::InvalidManifest { .. }));
    }

    #[test]
    fn test_taskfile_without_tasks_is_fatal() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("Taskfile.yml"), "version: '3'\n").unwrap();
        let err = Bootstrap::load(&ServerConfig::for_dir(dir.path())).unwrap_err();
        assert!(matches!(err, Error::NoTasks));
    }

    #[test]
    fn test_explicit_taskfile() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("ci.yml"), "tasks:\n  deploy: echo deploy\n").unwrap();

        let config =
            ServerConfig { taskfile: Some("ci.yml".into()), ..ServerConfig::for_dir(dir.path()) };
        let bootstrap = Bootstrap::load(&config).unwrap();
        assert_eq!(bootstrap.registry.names(), ["deploy"]);
    }

    #[test]
    fn test_taskfile_of_only_includes() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("Taskfile.yml"), "includes:\n  docs: ./docs\n").unwrap();
        fs::create_dir(dir.path().join("docs")).unwrap();
        fs::write(dir.path().join("docs/Taskfile.yml"), "tasks:\n  build: mkdocs build\n")
            .unwrap();

        let bootstrap = Bootstrap::load(&ServerConfig::for_dir(dir.path())).unwrap();
        assert_eq!(bootstrap.registry.names(), ["docs:build"]);
    }

    #[test]
    fn test_workdir_must_exist() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope");
        assert!(matches!(resolve_workdir(Some(&missing)), Err(Error::WorkingDirectory(_))));
    }

    #[test]
    fn test_workdir_defaults_to_current_dir() {
        let workdir = resolve_workdir(None).unwrap();
        assert_eq!(workdir, std::env::current_dir().unwrap());
    }

    #[test]
    fn test_executor_from_config() {
        let config = ServerConfig { task_binary: "go-task".into(), ..ServerConfig::default() };
        assert_eq!(Bootstrap::executor(&config).binary(), Path::new("go-task"));
    }
}
