//! Error taxonomy for the registry and LLM boundaries.
//!
//! Neither error crosses `Agent::process_request`: registry errors are
//! rendered into strings and LLM errors into fallback messages.

use thiserror::Error;

/// Failures reported by the function registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Function '{0}' not found in the registry.")]
    UnknownTool(String),

    #[error("Missing required parameters: {} for function {tool}", .missing.join(", "))]
    MissingParameters { tool: String, missing: Vec<String> },

    #[error("An error occurred while calling function '{tool}': {detail}")]
    ToolExecution { tool: String, detail: String },

    #[error("Function '{0}' is already registered")]
    DuplicateTool(String),

    #[error("Invalid tool descriptor '{name}': {reason}")]
    InvalidDescriptor { name: String, reason: String },
}

impl RegistryError {
    /// Render as the `Error: ...` string handed back to the model.
    pub fn to_result_string(&self) -> String {
        format!("Error: {}", self)
    }
}

/// Failures reported by an LLM client.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("LLM unavailable after {attempts} attempt(s): {last_error}")]
    Unavailable { attempts: u32, last_error: String },

    #[error("LLM request timed out after {0}s")]
    Timeout(u64),

    #[error("LLM request failed: {0}")]
    Http(String),

    #[error("Failed to decode LLM response: {0}")]
    Decode(String),

    #[error("LLM returned no candidates")]
    EmptyResponse,
}

impl LlmError {
    /// Whether a retry could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::Http(_))
    }
}

impl From<reqwest::Error> for LlmError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Http(format!("timeout: {}", e))
        } else if e.is_decode() {
            Self::Decode(e.to_string())
        } else {
            Self::Http(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_error_strings() {
        let e = RegistryError::UnknownTool("fly_me_to_mars".into());
        assert_eq!(
            e.to_result_string(),
            "Error: Function 'fly_me_to_mars' not found in the registry."
        );

        let e = RegistryError::MissingParameters {
            tool: "deepseek_chat".into(),
            missing: vec!["prompt".into(), "model".into()],
        };
        assert_eq!(
            e.to_result_string(),
            "Error: Missing required parameters: prompt, model for function deepseek_chat"
        );

        let e = RegistryError::ToolExecution {
            tool: "calculate".into(),
            detail: "boom".into(),
        };
        assert_eq!(
            e.to_result_string(),
            "Error: An error occurred while calling function 'calculate': boom"
        );
    }

    #[test]
    fn test_transient_classification() {
        assert!(LlmError::Timeout(20).is_transient());
        assert!(LlmError::Http("503".into()).is_transient());
        assert!(!LlmError::EmptyResponse.is_transient());
        assert!(!LlmError::Decode("bad json".into()).is_transient());
    }
}
