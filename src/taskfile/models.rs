//! Model types for the subset of a Taskfile this crate reads.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Prefix marking a task as internal. Internal tasks are never exposed as tools.
pub const INTERNAL_PREFIX: &str = ":";

/// The default value of a declared variable.
///
/// Only plain YAML strings are kept. Numbers, booleans, dynamic `sh:` or `ref:`
/// maps and lists are resolved by the task runner and stay opaque here.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum VarValue {
    /// A literal string default.
    Text(String),
    /// Anything else.
    #[default]
    Other,
}

impl VarValue {
    /// The default as plain text, if it is one.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Other => None,
        }
    }
}

impl From<serde_yaml::Value> for VarValue {
    fn from(value: serde_yaml::Value) -> Self {
        match value {
            serde_yaml::Value::String(text) => Self::Text(text),
            _ => Self::Other,
        }
    }
}

impl From<&str> for VarValue {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl<'de> Deserialize<'de> for VarValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_yaml::Value::deserialize(deserializer).map(Self::from)
    }
}

/// A single task declared in the Taskfile.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Task {
    /// Human-readable description (`desc:`).
    pub desc: Option<String>,
    /// Task-local variables and their defaults.
    pub vars: BTreeMap<String, VarValue>,
    /// Whether the task is flagged `internal: true`.
    pub internal: bool,
}

impl Task {
    /// The description, if present and non-empty.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.desc.as_deref().filter(|d| !d.is_empty())
    }
}

#[derive(Deserialize)]
struct TaskDef {
    #[serde(default, deserialize_with = "scalar_text")]
    desc: Option<String>,
    #[serde(default)]
    vars: Option<BTreeMap<String, VarValue>>,
    #[serde(default)]
    internal: bool,
}

/// Accepts the task forms the runner does: a map, a single command string,
/// a list of commands, or nothing.
impl<'de> Deserialize<'de> for Task {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match serde_yaml::Value::deserialize(deserializer)? {
            value @ serde_yaml::Value::Mapping(_) => {
                let def = TaskDef::deserialize(value).map_err(D::Error::custom)?;
                Ok(Self {
                    desc: def.desc,
                    vars: def.vars.unwrap_or_default(),
                    internal: def.internal,
                })
            }
            serde_yaml::Value::String(_)
            | serde_yaml::Value::Sequence(_)
            | serde_yaml::Value::Null => Ok(Self::default()),
            other => Err(D::Error::custom(format!("invalid task definition: {other:?}"))),
        }
    }
}

/// Read any scalar as text. Maps and lists read as absent.
fn scalar_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match serde_yaml::Value::deserialize(deserializer)? {
        serde_yaml::Value::String(text) => Some(text),
        serde_yaml::Value::Number(number) => Some(number.to_string()),
        serde_yaml::Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    })
}

/// An entry of `includes:`, pulling another Taskfile in under a namespace.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Include {
    /// Taskfile or directory to include, relative to the including file.
    pub taskfile: PathBuf,
    /// A missing file is skipped instead of failing the load.
    pub optional: bool,
    /// Every included task is hidden.
    pub internal: bool,
    /// Included tasks keep their own names instead of `namespace:name`.
    pub flatten: bool,
    /// Variables set by the include entry.
    pub vars: BTreeMap<String, VarValue>,
}

#[derive(Deserialize)]
struct IncludeDef {
    taskfile: PathBuf,
    #[serde(default)]
    optional: bool,
    #[serde(default)]
    internal: bool,
    #[serde(default)]
    flatten: bool,
    #[serde(default, deserialize_with = "null_as_empty")]
    vars: BTreeMap<String, VarValue>,
}

impl<'de> Deserialize<'de> for Include {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match serde_yaml::Value::deserialize(deserializer)? {
            serde_yaml::Value::String(path) => Ok(Self { taskfile: path.into(), ..Self::default() }),
            value => {
                let def = IncludeDef::deserialize(value).map_err(D::Error::custom)?;
                Ok(Self {
                    taskfile: def.taskfile,
                    optional: def.optional,
                    internal: def.internal,
                    flatten: def.flatten,
                    vars: def.vars,
                })
            }
        }
    }
}

/// A parsed Taskfile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Manifest {
    /// The task collection. `None` when the file has no `tasks:` key.
    #[serde(default)]
    pub tasks: Option<BTreeMap<String, Task>>,
    /// Global variables, inherited by every task.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub vars: BTreeMap<String, VarValue>,
    /// Other Taskfiles included by namespace.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub includes: BTreeMap<String, Include>,
    /// Where the manifest was loaded from.
    #[serde(skip)]
    pub path: PathBuf,
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

impl Manifest {
    /// Look up a task by name.
    #[must_use]
    pub fn task(&self, name: &str) -> Option<&Task> {
        self.tasks.as_ref()?.get(name)
    }

    /// Add the tasks of an included Taskfile under `namespace`.
    ///
    /// Each included task sees the include entry's variables, then its own
    /// file's globals, then its own variables. Names already taken are kept.
    pub fn merge_included(&mut self, namespace: &str, include: &Include, included: Self) {
        let tasks = self.tasks.get_or_insert_with(BTreeMap::new);
        for (name, mut task) in included.tasks.into_iter().flatten() {
            task.internal = include.internal || is_internal(&name, &task);

            let mut vars = include.vars.clone();
            vars.extend(included.vars.iter().map(|(k, v)| (k.clone(), v.clone())));
            vars.append(&mut task.vars);
            task.vars = vars;

            let name = if include.flatten { name } else { format!("{namespace}:{name}") };
            tasks.entry(name).or_insert(task);
        }
    }

    /// Iterate over every declared task, internal ones included, in name order.
    pub fn tasks(&self) -> impl Iterator<Item = (&str, &Task)> {
        self.tasks.iter().flatten().map(|(name, task)| (name.as_str(), task))
    }
}

/// Whether a task must be hidden from callers.
#[must_use]
pub fn is_internal(name: &str, task: &Task) -> bool {
    name.starts_with(INTERNAL_PREFIX) || task.internal
}
