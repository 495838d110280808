//! Locating and parsing the Taskfile on disk.

use super::models::{Include, Manifest};
use crate::error::{Error, Result};
use std::path::{Path, PathBuf};

/// File names the task runner accepts, in lookup order.
pub const MANIFEST_NAMES: &[&str] = &[
    "Taskfile.yml",
    "taskfile.yml",
    "Taskfile.yaml",
    "taskfile.yaml",
    "Taskfile.dist.yml",
    "taskfile.dist.yml",
    "Taskfile.dist.yaml",
    "taskfile.dist.yaml",
];

/// Find the Taskfile for a working directory.
///
/// An explicit path wins over discovery and is resolved against `workdir`
/// when relative.
///
/// # Errors
///
/// Returns [`Error::ManifestNotFound`] if no candidate file exists.
pub fn locate(workdir: &Path, explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        let path = workdir.join(path);
        return if path.is_file() { Ok(path) } else { Err(Error::ManifestNotFound(path)) };
    }

    MANIFEST_NAMES
        .iter()
        .map(|name| workdir.join(name))
        .find(|path| path.is_file())
        .ok_or_else(|| Error::ManifestNotFound(workdir.join(MANIFEST_NAMES[0])))
}

/// Parse Taskfile content.
///
/// An empty document yields a manifest with no task collection.
///
/// # Errors
///
/// Returns an error if the content is not a YAML mapping of the expected shape.
pub fn parse(content: &str) -> Result<Manifest> {
    if content.trim().is_empty() {
        return Ok(Manifest::default());
    }
    Ok(serde_yaml::from_str(content)?)
}

/// Read and parse the Taskfile at `path`, merging in every included Taskfile.
///
/// # Errors
///
/// Returns [`Error::ManifestNotFound`] if the file or a required include does
/// not exist, or [`Error::InvalidManifest`] if one cannot be read or parsed or
/// the includes form a cycle.
pub fn load(path: &Path) -> Result<Manifest> {
    load_tree(path, &mut Vec::new())
}

fn read(path: &Path) -> Result<Manifest> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::ManifestNotFound(path.to_path_buf())
        } else {
            Error::InvalidManifest { path: path.to_path_buf(), reason: e.to_string() }
        }
    })?;

    let mut manifest = parse(&content)
        .map_err(|e| Error::InvalidManifest { path: path.to_path_buf(), reason: e.to_string() })?;
    manifest.path = path.to_path_buf();
    Ok(manifest)
}

/// `ancestors` holds the canonical paths of the files currently being loaded.
fn load_tree(path: &Path, ancestors: &mut Vec<PathBuf>) -> Result<Manifest> {
    let mut manifest = read(path)?;
    let base = path.parent().unwrap_or_else(|| Path::new("."));

    ancestors.push(path.canonicalize().unwrap_or_else(|_| path.to_path_buf()));
    for (namespace, include) in manifest.includes.clone() {
        let Some(target) = resolve_include(base, &include)? else {
            tracing::debug!(namespace = %namespace, "skipping missing optional include");
            continue;
        };
        let canonical = target.canonicalize().unwrap_or_else(|_| target.clone());
        if ancestors.contains(&canonical) {
            return Err(Error::InvalidManifest {
                path: path.to_path_buf(),
                reason: format!("include cycle through {}", target.display()),
            });
        }

        let included = load_tree(&target, ancestors)?;
        manifest.merge_included(&namespace, &include, included);
    }
    ancestors.pop();

    Ok(manifest)
}

/// Find the file an include points at. A directory means the Taskfile inside it.
fn resolve_include(base: &Path, include: &Include) -> Result<Option<PathBuf>> {
    let path = base.join(&include.taskfile);
    let found = if path.is_dir() {
        locate(&path, None)
    } else if path.is_file() {
        Ok(path)
    } else {
        Err(Error::ManifestNotFound(path))
    };

    match found {
        Ok(path) => Ok(Some(path)),
        Err(Error::ManifestNotFound(_)) if include.optional => Ok(None),
        Err(e) => Err(e),
    }
}

/// Locate and load the Taskfile for a working directory.
///
/// # Errors
///
/// Returns an error if the file cannot be found, read, or parsed.
pub fn load_from(workdir: &Path, explicit: Option<&Path>) -> Result<Manifest> {
    load(&locate(workdir, explicit)?)
}
