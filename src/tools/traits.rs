//! Tool trait and the argument / definition types around it.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A declared parameter: every parameter is required and string-typed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub description: String,
}

impl Parameter {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }
}

/// Definition of a tool exposed to the inference model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Vec<Parameter>,
}

/// Named arguments supplied to a tool, passed through as the model sent them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolArgs(Map<String, Value>);

impl ToolArgs {
    pub fn new(map: Map<String, Value>) -> Self {
        Self(map)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Fetch a string argument. Wrong-typed values are a tool-level error.
    pub fn str(&self, name: &str) -> Result<&str> {
        match self.0.get(name) {
            Some(Value::String(s)) => Ok(s),
            Some(other) => Err(anyhow!(
                "argument '{}' must be a string, got {}",
                name,
                other
            )),
            None => Err(anyhow!("Missing '{}' argument", name)),
        }
    }

    /// Fetch a scalar argument rendered as text (numbers and booleans
    /// are accepted for string-typed parameters).
    pub fn text(&self, name: &str) -> Result<String> {
        match self.0.get(name) {
            Some(Value::String(s)) => Ok(s.clone()),
            Some(v @ (Value::Number(_) | Value::Bool(_))) => Ok(v.to_string()),
            Some(other) => Err(anyhow!(
                "argument '{}' must be a scalar, got {}",
                name,
                other
            )),
            None => Err(anyhow!("Missing '{}' argument", name)),
        }
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for ToolArgs {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for ToolArgs {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// A callable capability stored in the registry.
///
/// Name, description and parameters live in the registry's descriptor,
/// so one handler type can back several registrations.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Execute the tool. Errors are converted to result strings by the registry.
    async fn invoke(&self, args: &ToolArgs) -> Result<String>;
}

/// Adapter for synchronous closures.
pub struct FnTool<F>(pub F);

#[async_trait]
impl<F> Tool for FnTool<F>
where
    F: Fn(&ToolArgs) -> Result<String> + Send + Sync,
{
    async fn invoke(&self, args: &ToolArgs) -> Result<String> {
        (self.0)(args)
    }
}
