//! Serialization of the tool catalog into backend tool-schema shapes.
//!
//! The registry only knows parameter names and descriptions, so every
//! parameter is declared as a string and listed as required.

use super::traits::ToolDefinition;
use serde_json::{json, Map, Value};

impl ToolDefinition {
    /// JSON Schema object for the parameters, with lowercase type names.
    pub fn parameters_schema(&self) -> Value {
        self.object_schema("object", "string")
    }

    /// OpenAI-compatible `{"type": "function", "function": {...}}` entry.
    pub fn to_openai(&self) -> Value {
        json!({
            "type": "function",
            "function": {
                "name": self.name,
                "description": self.description,
                "parameters": self.parameters_schema(),
            }
        })
    }

    /// Gemini `{"functionDeclarations": [...]}` entry, one per tool.
    pub fn to_gemini(&self) -> Value {
        json!({
            "functionDeclarations": [{
                "name": self.name,
                "description": self.description,
                "parameters": self.object_schema("OBJECT", "STRING"),
            }]
        })
    }

    /// One-line rendering used by the JSON directive prompt.
    pub fn to_prompt_line(&self) -> String {
        let params: Vec<String> = self
            .parameters
            .iter()
            .map(|p| format!("\"{}\": {}", p.name, p.description))
            .collect();
        format!("- {}: {} Params: {{{}}}", self.name, self.description, params.join(", "))
    }

    fn object_schema(&self, object_type: &str, param_type: &str) -> Value {
        let mut properties = Map::new();
        for p in &self.parameters {
            properties.insert(
                p.name.clone(),
                json!({ "type": param_type, "description": p.description }),
            );
        }
        let required: Vec<&str> = self.parameters.iter().map(|p| p.name.as_str()).collect();
        json!({
            "type": object_type,
            "properties": properties,
            "required": required,
        })
    }
}

/// Serialize a whole catalog in OpenAI shape.
pub fn openai_tools(defs: &[ToolDefinition]) -> Vec<Value> {
    defs.iter().map(ToolDefinition::to_openai).collect()
}

/// Serialize a whole catalog in Gemini shape.
pub fn gemini_tools(defs: &[ToolDefinition]) -> Vec<Value> {
    defs.iter().map(ToolDefinition::to_gemini).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::Parameter;

    fn deepseek() -> ToolDefinition {
        ToolDefinition {
            name: "deepseek_chat".into(),
            description: "Makes a call to the DeepSeek API.".into(),
            parameters: vec![
                Parameter::new("prompt", "The text prompt"),
                Parameter::new("model", "The model to use"),
            ],
        }
    }

    #[test]
    fn test_openai_shape() {
        let v = deepseek().to_openai();
        assert_eq!(v["type"], "function");
        assert_eq!(v["function"]["name"], "deepseek_chat");
        let params = &v["function"]["parameters"];
        assert_eq!(params["type"], "object");
        assert_eq!(params["properties"]["prompt"]["type"], "string");
        assert_eq!(params["required"], json!(["prompt", "model"]));
    }

    #[test]
    fn test_gemini_shape() {
        let v = deepseek().to_gemini();
        let decl = &v["functionDeclarations"][0];
        assert_eq!(decl["name"], "deepseek_chat");
        assert_eq!(decl["parameters"]["type"], "OBJECT");
        assert_eq!(decl["parameters"]["properties"]["model"]["type"], "STRING");
        assert_eq!(
            decl["parameters"]["properties"]["model"]["description"],
            "The model to use"
        );
        assert_eq!(decl["parameters"]["required"], json!(["prompt", "model"]));
    }

    #[test]
    fn test_parameterless_tool_has_empty_required() {
        let def = ToolDefinition {
            name: "now".into(),
            description: "Current time.".into(),
            parameters: vec![],
        };
        let schema = def.parameters_schema();
        assert_eq!(schema["required"], json!([]));
        assert_eq!(schema["properties"], json!({}));
    }

    #[test]
    fn test_prompt_line() {
        let line = deepseek().to_prompt_line();
        assert!(line.starts_with("- deepseek_chat: "));
        assert!(line.contains("\"prompt\": The text prompt"));
    }
}
