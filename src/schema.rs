//! Tool parameter schemas derived from task variables.
//!
//! Every variable visible to a task becomes one optional string parameter.
//! Global variables form the base set and task-local variables of the same
//! name replace them.

use crate::taskfile::{Task, VarValue};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

/// One tool parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    /// Human-readable description, embedding the variable's default.
    pub description: String,
}

/// The parameters of one tool, keyed by variable name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterSchema {
    parameters: BTreeMap<String, Parameter>,
}

impl ParameterSchema {
    /// Look up a parameter by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Parameter> {
        self.parameters.get(name)
    }

    /// Iterate over the parameters in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Parameter)> {
        self.parameters.iter().map(|(name, param)| (name.as_str(), param))
    }

    /// Number of parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    /// Whether there are no parameters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    /// Render as a JSON Schema object.
    ///
    /// All parameters are typed `string` and none is required.
    #[must_use]
    pub fn to_json_schema(&self) -> Map<String, Value> {
        let properties: Map<String, Value> = self
            .parameters
            .iter()
            .map(|(name, param)| {
                (name.clone(), json!({ "type": "string", "description": param.description }))
            })
            .collect();

        let mut schema = Map::new();
        schema.insert("type".to_string(), Value::String("object".to_string()));
        schema.insert("properties".to_string(), Value::Object(properties));
        schema
    }
}

/// Describe a variable for a caller: its name and its default, if textual.
#[must_use]
pub fn describe_variable(name: &str, default: &VarValue) -> String {
    format!("Variable: {name} (default: {})", default.as_text().unwrap_or_default())
}

/// Build the parameter schema for a task.
pub fn build_schema(task: &Task, globals: &BTreeMap<String, VarValue>) -> ParameterSchema {
    let mut merged: BTreeMap<&str, &VarValue> =
        globals.iter().map(|(name, value)| (name.as_str(), value)).collect();
    merged.extend(task.vars.iter().map(|(name, value)| (name.as_str(), value)));

    let parameters = merged
        .into_iter()
        .map(|(name, value)| {
            (name.to_string(), Parameter { description: describe_variable(name, value) })
        })
        .collect();

    ParameterSchema { parameters }
}
