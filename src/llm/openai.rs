//! OpenAI-compatible chat completions backend.
//!
//! Supports tool-use (function calling) in the OpenAI format.

use super::{http_client, with_retries, LlmClient, RetryPolicy};
use crate::error::LlmError;
use crate::tools::{schema, ToolDefinition};
use crate::types::{LlmOutput, SamplingParams};
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Client for any `/v1/chat/completions` endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    base_url: String,
    api_key: String,
    model: String,
    policy: RetryPolicy,
    http: reqwest::Client,
}

// -- OpenAI-compatible request/response types --------------------------------

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<MessagePayload<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<serde_json::Value>>,
    max_tokens: u32,
    temperature: f64,
    top_p: f64,
}

#[derive(Debug, Serialize)]
struct MessagePayload<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<ToolCallPayload>,
}

#[derive(Debug, Deserialize)]
struct ToolCallPayload {
    function: FunctionCallPayload,
}

#[derive(Debug, Deserialize)]
struct FunctionCallPayload {
    name: String,
    #[serde(default)]
    arguments: String,
}

impl OpenAiClient {
    pub fn new(base_url: &str, api_key: &str, model: &str, policy: RetryPolicy) -> Result<Self> {
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            http: http_client(&policy)?,
            policy,
        })
    }

    async fn send_once(&self, request: &ChatRequest<'_>) -> Result<LlmOutput, LlmError> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let resp = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(LlmError::Http(format!("{}: {}", status, body)));
        }

        let body: ChatResponse = resp.json().await?;
        parse_response(body)
    }
}

/// First tool call of the first choice wins; otherwise its content.
///
/// Arguments arrive as a JSON-encoded string. A string that does not parse
/// is kept verbatim as a JSON string so the orchestrator can report it as
/// malformed instead of guessing.
fn parse_response(body: ChatResponse) -> Result<LlmOutput, LlmError> {
    let message = body
        .choices
        .into_iter()
        .next()
        .map(|c| c.message)
        .ok_or(LlmError::EmptyResponse)?;

    if let Some(tc) = message.tool_calls.into_iter().next() {
        let raw = tc.function.arguments;
        let arguments = if raw.trim().is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_str(&raw).unwrap_or(serde_json::Value::String(raw))
        };
        return Ok(LlmOutput::tool_call(tc.function.name, arguments));
    }

    Ok(LlmOutput::text(message.content.unwrap_or_default()))
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn generate(
        &self,
        prompt: &str,
        tools: Option<&[ToolDefinition]>,
        sampling: &SamplingParams,
    ) -> Result<LlmOutput, LlmError> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![MessagePayload {
                role: "user",
                content: prompt,
            }],
            tools: tools
                .filter(|t| !t.is_empty())
                .map(schema::openai_tools),
            max_tokens: sampling.max_output_tokens,
            temperature: sampling.temperature,
            top_p: sampling.top_p,
        };

        debug!("Inference request to model: {}", self.model);

        with_retries(&self.policy, || self.send_once(&request)).await
    }
}
