//! Taskfile manifest model.
//!
//! Only the part of the Taskfile format needed to describe tasks as tools is
//! read here:
//! - the task collection, with each task's `desc`, `vars` and `internal` flag
//! - the global `vars`
//! - `includes`, whose tasks are merged in as `namespace:task`
//!
//! Everything else (commands, dependencies, platform rules, up-to-date checks)
//! belongs to the task runner and is ignored.
//!
//! # Example
//!
//! ```no_run
//! use taskfile_mcp::taskfile;
//! use std::path::Path;
//!
//! let manifest = taskfile::load_from(Path::new("."), None).unwrap();
//! for (name, task) in manifest.tasks() {
//!     println!("{name}: {}", task.description().unwrap_or("-"));
//! }
//! ```

pub mod loader;
pub mod models;

pub use loader::{load, load_from, locate, parse, MANIFEST_NAMES};
pub use models::{is_internal, Include, Manifest, Task, VarValue, INTERNAL_PREFIX};
