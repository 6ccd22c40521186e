//! Shared types used across the agent runtime.

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Inference types
// ---------------------------------------------------------------------------

/// Sampling parameters forwarded to the LLM backend on every call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingParams {
    pub temperature: f64,
    pub top_p: f64,
    pub top_k: u32,
    pub max_output_tokens: u32,
}

impl Default for SamplingParams {
    /// Tuned for predictable tool selection.
    fn default() -> Self {
        Self {
            temperature: 0.0,
            top_p: 1.0,
            top_k: 1,
            max_output_tokens: 200,
        }
    }
}

/// A tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub name: String,
    /// Raw arguments as produced by the model. Usually a JSON object,
    /// but nothing guarantees that until the orchestrator checks it.
    pub arguments: serde_json::Value,
}

/// What a single `generate` call produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LlmOutput {
    Text { text: String },
    ToolCall { call: ToolCall },
}

impl LlmOutput {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn tool_call(name: impl Into<String>, arguments: serde_json::Value) -> Self {
        Self::ToolCall {
            call: ToolCall {
                name: name.into(),
                arguments,
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Directives
// ---------------------------------------------------------------------------

/// How the decision prompt asks the model to pick a tool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DirectiveMode {
    /// Catalog sent as a structured tool schema; the backend reports
    /// function calls natively.
    #[default]
    Native,
    /// Catalog rendered into the prompt; the model answers with a
    /// `{"function_name": ..., "params": {...}}` JSON object.
    Json,
}

impl fmt::Display for DirectiveMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Native => write!(f, "native"),
            Self::Json => write!(f, "json"),
        }
    }
}

/// Parsed intent of a decision response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Directive {
    /// The model answered directly.
    FinalText { text: String },
    /// The model asked for a tool.
    ToolCall {
        name: String,
        arguments: serde_json::Map<String, serde_json::Value>,
    },
    /// A well-formed directive that names no tool: answer without tools.
    Fallback,
    /// The directive payload could not be understood.
    Malformed { raw: String, reason: String },
}

impl Directive {
    pub fn label(&self) -> &'static str {
        match self {
            Self::FinalText { .. } => "final_text",
            Self::ToolCall { .. } => "tool_call",
            Self::Fallback => "fallback",
            Self::Malformed { .. } => "malformed",
        }
    }
}

// ---------------------------------------------------------------------------
// Turn record
// ---------------------------------------------------------------------------

/// How a turn ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnOutcome {
    /// Decision call answered directly.
    Answered,
    /// Fallback directive answered by a tool-less call.
    FallbackAnswered,
    /// Tool result synthesized into an answer.
    Synthesized,
    /// Named tool is not registered.
    ToolNotFound,
    /// Decision payload was malformed.
    Malformed,
    /// An LLM call failed or produced nothing usable.
    LlmUnavailable,
}

impl fmt::Display for TurnOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Answered => write!(f, "answered"),
            Self::FallbackAnswered => write!(f, "fallback_answered"),
            Self::Synthesized => write!(f, "synthesized"),
            Self::ToolNotFound => write!(f, "tool_not_found"),
            Self::Malformed => write!(f, "malformed"),
            Self::LlmUnavailable => write!(f, "llm_unavailable"),
        }
    }
}

/// Ephemeral state of one orchestration pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentTurn {
    pub id: String,
    pub objective: String,
    pub raw_output: Option<LlmOutput>,
    pub directive: Option<Directive>,
    pub tool_name: Option<String>,
    pub tool_result: Option<String>,
    pub final_response: String,
    pub outcome: TurnOutcome,
    pub llm_calls: u32,
    pub dispatches: u32,
}

impl AgentTurn {
    pub fn new(objective: &str) -> Self {
        Self {
            id: ulid::Ulid::new().to_string(),
            objective: objective.to_string(),
            raw_output: None,
            directive: None,
            tool_name: None,
            tool_result: None,
            final_response: String::new(),
            outcome: TurnOutcome::LlmUnavailable,
            llm_calls: 0,
            dispatches: 0,
        }
    }
}
