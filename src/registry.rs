//! The set of tools exposed to callers, one per public task.

use crate::error::{Error, Result};
use crate::schema::{build_schema, ParameterSchema};
use crate::taskfile::{is_internal, Manifest, Task, VarValue};
use std::collections::BTreeMap;

/// A task registered as a tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolRegistration {
    /// Tool name, identical to the task name.
    pub name: String,
    /// Tool description.
    pub description: String,
    /// Parameters derived from the task's variables.
    pub schema: ParameterSchema,
}

impl ToolRegistration {
    /// Describe a task as a tool.
    ///
    /// Tasks without a description get `Execute task: <name>`.
    pub fn for_task(name: &str, task: &Task, globals: &BTreeMap<String, VarValue>) -> Self {
        let description = task
            .description()
            .map_or_else(|| format!("Execute task: {name}"), ToString::to_string);

        Self { name: name.to_string(), description, schema: build_schema(task, globals) }
    }
}

/// Every tool derived from a manifest, keyed by name.
///
/// Built once at startup and never modified afterwards.
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, ToolRegistration>,
}

impl ToolRegistry {
    /// Register every non-internal task of the manifest.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoTasks`] if the manifest has no task collection or an
    /// empty one.
    pub fn from_manifest(manifest: &Manifest) -> Result<Self> {
        match &manifest.tasks {
            Some(tasks) if !tasks.is_empty() => {}
            _ => return Err(Error::NoTasks),
        }

        let tools = manifest
            .tasks()
            .filter(|(name, task)| !is_internal(name, task))
            .map(|(name, task)| {
                (name.to_string(), ToolRegistration::for_task(name, task, &manifest.vars))
            })
            .collect();

        Ok(Self { tools })
    }

    /// Look up a tool by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ToolRegistration> {
        self.tools.get(name)
    }

    /// Iterate over the tools in name order.
    pub fn iter(&self) -> impl Iterator<Item = &ToolRegistration> {
        self.tools.values()
    }

    /// Tool names in order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    /// Number of registered tools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether no tool is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
