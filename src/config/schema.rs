//! Configuration schema for smol-agent.toml.

use crate::types::{DirectiveMode, SamplingParams};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Log level (debug, info, warn, error).
    pub log_level: String,

    pub llm: LlmConfig,

    pub sampling: SamplingParams,

    pub agent: AgentSettings,

    pub tools: ToolsConfig,
}

impl AgentConfig {
    /// Fill in provider-dependent defaults left empty by the file.
    pub fn normalized(mut self) -> Self {
        if self.log_level.is_empty() {
            self.log_level = "info".into();
        }
        if self.llm.model.is_empty() {
            self.llm.model = self.llm.provider.default_model().into();
        }
        if self.llm.api_url.is_empty() {
            self.llm.api_url = self.llm.provider.default_api_url().into();
        }
        if self.llm.api_key_env.is_empty() {
            self.llm.api_key_env = self.llm.provider.default_api_key_env().into();
        }
        self
    }
}

/// Which backend the agent talks to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    #[default]
    Gemini,
    /// Any OpenAI-compatible `/v1/chat/completions` endpoint.
    Openai,
}

impl Provider {
    pub fn default_model(&self) -> &'static str {
        match self {
            Self::Gemini => "gemini-2.0-flash",
            Self::Openai => "gpt-4o-mini",
        }
    }

    pub fn default_api_url(&self) -> &'static str {
        match self {
            Self::Gemini => "https://generativelanguage.googleapis.com",
            Self::Openai => "https://api.openai.com",
        }
    }

    pub fn default_api_key_env(&self) -> &'static str {
        match self {
            Self::Gemini => "GEMINI_API_KEY",
            Self::Openai => "OPENAI_API_KEY",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gemini => write!(f, "gemini"),
            Self::Openai => write!(f, "openai"),
        }
    }
}

/// LLM backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: Provider,

    /// Model name; empty means the provider default.
    pub model: String,

    /// API base URL; empty means the provider default.
    pub api_url: String,

    /// API key. When empty, `api_key_env` is consulted.
    pub api_key: String,

    /// Environment variable holding the API key.
    pub api_key_env: String,

    /// Attempts per call before giving up.
    pub max_retries: u32,

    /// Fixed pause between attempts.
    pub retry_delay_ms: u64,

    /// Bound on a single attempt.
    pub request_timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: Provider::default(),
            model: String::new(),
            api_url: String::new(),
            api_key: String::new(),
            api_key_env: String::new(),
            max_retries: 3,
            retry_delay_ms: 500,
            request_timeout_secs: 20,
        }
    }
}

/// Orchestrator behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    pub directive_mode: DirectiveMode,

    /// Returned when the decision call fails or yields nothing usable.
    pub fallback_message: String,

    /// Returned when the synthesis call fails.
    pub synthesis_fallback_message: String,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            directive_mode: DirectiveMode::Native,
            fallback_message: "I apologize, but I was unable to process your request.".into(),
            synthesis_fallback_message:
                "I apologize, but I was unable to process the tool results.".into(),
        }
    }
}

/// Built-in tool settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    /// Bound on a single tool invocation.
    pub timeout_secs: u64,

    /// Built-in tools to register; empty means all of them.
    pub enabled: Vec<String>,

    /// DuckDuckGo instant-answer endpoint.
    pub search_url: String,

    /// DeepSeek chat completions endpoint.
    pub deepseek_api_url: String,

    pub deepseek_api_key_env: String,

    /// JSONL file that records every DeepSeek call.
    pub deepseek_log_path: String,

    /// Command line for the local model tool; the prompt is appended.
    pub local_model_command: Vec<String>,

    /// Characters kept by `summarize_text`.
    pub summary_chars: usize,

    /// Characters kept by `web_scraper`.
    pub scrape_max_chars: usize,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 60,
            enabled: Vec::new(),
            search_url: "https://api.duckduckgo.com/".into(),
            deepseek_api_url: "https://api.deepseek.com/v1/chat/completions".into(),
            deepseek_api_key_env: "DEEPSEEK_API_KEY".into(),
            deepseek_log_path: "~/.smol-agent/deepseek_calls.jsonl".into(),
            local_model_command: vec!["python".into(), "huggingface_inference.py".into()],
            summary_chars: 200,
            scrape_max_chars: 20_000,
        }
    }
}

impl ToolsConfig {
    /// Resolve a path that may contain `~` to an absolute path.
    pub fn resolve_path(&self, path: &str) -> String {
        shellexpand::tilde(path).into_owned()
    }

    pub fn resolved_deepseek_log_path(&self) -> String {
        self.resolve_path(&self.deepseek_log_path)
    }

    pub fn is_enabled(&self, name: &str) -> bool {
        self.enabled.is_empty() || self.enabled.iter().any(|n| n == name)
    }
}
