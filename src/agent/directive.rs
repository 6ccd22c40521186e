//! Interpretation of a decision response into a `Directive`.

use crate::types::{Directive, DirectiveMode, LlmOutput};
use serde_json::{Map, Value};

/// Names a model uses to say "no function".
const NO_TOOL_NAMES: &[&str] = &["", "none", "null"];

/// Turn raw model output into a directive.
///
/// Native tool calls are always honoured. Text is final in native mode; in
/// JSON mode text that looks like a JSON object is parsed as a directive.
pub fn interpret(output: LlmOutput, mode: DirectiveMode) -> Directive {
    match output {
        LlmOutput::ToolCall { call } => tool_directive(&call.name, call.arguments),
        LlmOutput::Text { text } => match mode {
            DirectiveMode::Native => Directive::FinalText { text },
            DirectiveMode::Json => parse_json_directive(&text),
        },
    }
}

/// Parse a `{"function_name": ..., "params": {...}}` answer.
pub fn parse_json_directive(text: &str) -> Directive {
    let body = strip_code_fence(text);
    if !body.starts_with('{') {
        return Directive::FinalText {
            text: text.to_string(),
        };
    }

    let value: Value = match serde_json::from_str(body) {
        Ok(v) => v,
        Err(e) => return malformed(text, e.to_string()),
    };
    let Value::Object(mut obj) = value else {
        return malformed(text, "directive is not a JSON object".into());
    };

    let name = match obj.remove("function_name") {
        None | Some(Value::Null) => return Directive::Fallback,
        Some(Value::String(s)) => s,
        Some(other) => return malformed(text, format!("function_name must be a string, got {}", other)),
    };
    let params = obj.remove("params").unwrap_or(Value::Null);
    tool_directive(&name, params)
}

fn tool_directive(name: &str, arguments: Value) -> Directive {
    let name = name.trim();
    if NO_TOOL_NAMES.contains(&name.to_lowercase().as_str()) {
        return Directive::Fallback;
    }
    match arguments_map(arguments) {
        Ok(arguments) => Directive::ToolCall {
            name: name.to_string(),
            arguments,
        },
        Err((raw, reason)) => Directive::Malformed { raw, reason },
    }
}

/// `null` means no arguments; anything but an object is malformed.
fn arguments_map(arguments: Value) -> Result<Map<String, Value>, (String, String)> {
    match arguments {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        Value::String(raw) => Err((raw, "tool arguments are not a JSON object".into())),
        other => Err((
            other.to_string(),
            format!("tool arguments must be an object, got {}", other),
        )),
    }
}

fn malformed(raw: &str, reason: String) -> Directive {
    Directive::Malformed {
        raw: raw.to_string(),
        reason,
    }
}

/// Strip a surrounding Markdown code fence (```json ... ```), if any.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_suffix("```").unwrap_or(rest);
    // Drop the info string ("json") on the opening line.
    match rest.find('\n') {
        Some(nl) => rest[nl + 1..].trim(),
        None => rest.trim(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn call(name: &str, args: Value) -> Directive {
        interpret(LlmOutput::tool_call(name, args), DirectiveMode::Native)
    }

    #[test]
    fn test_native_tool_call() {
        let d = call("calculate", json!({"expression": "2+2"}));
        let Directive::ToolCall { name, arguments } = d else {
            panic!("expected tool call, got {d:?}");
        };
        assert_eq!(name, "calculate");
        assert_eq!(arguments["expression"], "2+2");
    }

    #[test]
    fn test_native_text_is_final() {
        let d = interpret(
            LlmOutput::text("{\"function_name\": \"calculate\"}"),
            DirectiveMode::Native,
        );
        assert!(matches!(d, Directive::FinalText { .. }));
    }

    #[test]
    fn test_null_arguments_mean_none() {
        let d = call("calculate", Value::Null);
        assert!(matches!(d, Directive::ToolCall { ref arguments, .. } if arguments.is_empty()));
    }

    #[test]
    fn test_non_object_arguments_are_malformed() {
        assert!(matches!(call("calculate", json!("{oops")), Directive::Malformed { ref raw, .. } if raw == "{oops"));
        assert!(matches!(call("calculate", json!([1, 2])), Directive::Malformed { .. }));
    }

    #[test]
    fn test_blank_tool_name_falls_back() {
        assert_eq!(call("", json!({})), Directive::Fallback);
        assert_eq!(call("None", json!({})), Directive::Fallback);
    }

    #[test]
    fn test_json_directive_with_fence() {
        let d = parse_json_directive(
            "```json\n{\"function_name\": \"web_search\", \"params\": {\"query\": \"museums in Paris\"}}\n```",
        );
        let Directive::ToolCall { name, arguments } = d else {
            panic!("expected tool call, got {d:?}");
        };
        assert_eq!(name, "web_search");
        assert_eq!(arguments["query"], "museums in Paris");
    }

    #[test]
    fn test_json_directive_null_function_falls_back() {
        assert_eq!(
            parse_json_directive("{\"function_name\": null, \"params\": {}}"),
            Directive::Fallback
        );
        assert_eq!(parse_json_directive("{\"params\": {}}"), Directive::Fallback);
    }

    #[test]
    fn test_json_directive_malformed() {
        assert!(matches!(
            parse_json_directive("{\"function_name\": \"calc"),
            Directive::Malformed { .. }
        ));
        assert!(matches!(
            parse_json_directive("{\"function_name\": 7}"),
            Directive::Malformed { .. }
        ));
    }

    #[test]
    fn test_json_mode_prose_is_final() {
        let d = parse_json_directive("Paris is the capital of France.");
        assert_eq!(
            d,
            Directive::FinalText {
                text: "Paris is the capital of France.".into()
            }
        );
    }
}
