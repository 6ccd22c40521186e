//! Prompt builders for the decision, fallback and synthesis calls.

use crate::tools::ToolDefinition;
use crate::types::DirectiveMode;

/// Prompt for the first (decision) call.
///
/// In native mode the catalog travels as a structured tool schema, so the
/// prompt only frames the request. In JSON mode the catalog is rendered
/// inline and the model is told how to answer.
pub fn decision_prompt(objective: &str, mode: DirectiveMode, catalog: &[ToolDefinition]) -> String {
    match mode {
        DirectiveMode::Native => format!(
            "User Request: {}\nPlease help fulfill this request using available tools if needed.",
            objective
        ),
        DirectiveMode::Json => {
            let mut prompt = String::with_capacity(512);
            prompt.push_str(objective);
            prompt.push_str("\n\n## Available Functions\n\n");
            if catalog.is_empty() {
                prompt.push_str("(none)\n");
            }
            for def in catalog {
                prompt.push_str(&def.to_prompt_line());
                prompt.push('\n');
            }
            prompt.push_str(
                "\nWhat function should I call? Return JSON only, like this:\n\
                 {\"function_name\": <one of the function names above>, \"params\": {<parameter>: <value>}}\n\
                 If you cannot fulfil the objective with a function, set \"function_name\" to null.",
            );
            prompt
        }
    }
}

/// Prompt for answering without tools after a fallback directive.
pub fn direct_prompt(objective: &str) -> String {
    format!(
        "User Request: {}\nPlease answer this request directly.",
        objective
    )
}

/// Prompt for the second (synthesis) call.
pub fn synthesis_prompt(objective: &str, tool_name: &str, tool_result: &str) -> String {
    format!(
        "Tool '{}' returned the following result: {}\n\
         Based on the original request: {}\n\
         Please provide a final response incorporating this information.",
        tool_name, tool_result, objective
    )
}
