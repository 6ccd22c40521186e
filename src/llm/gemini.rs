//! Gemini `generateContent` backend with function-calling support.

use super::{http_client, with_retries, LlmClient, RetryPolicy};
use crate::error::LlmError;
use crate::tools::{schema, ToolDefinition};
use crate::types::{LlmOutput, SamplingParams};
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Client for the Gemini generative language API.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    base_url: String,
    api_key: String,
    model: String,
    policy: RetryPolicy,
    http: reqwest::Client,
}

// -- Request / response types ------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<serde_json::Value>>,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<TextPart>,
}

#[derive(Debug, Serialize)]
struct TextPart {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f64,
    top_p: f64,
    top_k: u32,
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponsePart {
    text: Option<String>,
    function_call: Option<FunctionCall>,
}

#[derive(Debug, Deserialize)]
struct FunctionCall {
    name: String,
    #[serde(default)]
    args: serde_json::Value,
}

impl GeminiClient {
    pub fn new(base_url: &str, api_key: &str, model: &str, policy: RetryPolicy) -> Result<Self> {
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            http: http_client(&policy)?,
            policy,
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }

    async fn send_once(&self, request: &GenerateRequest) -> Result<LlmOutput, LlmError> {
        let resp = self
            .http
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())])
            .json(request)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(LlmError::Http(format!("{}: {}", status, body)));
        }

        let body: GenerateResponse = resp.json().await?;
        parse_response(body)
    }
}

/// Take the first part of the first candidate: a function call if present,
/// otherwise its text (empty when the part carries none).
fn parse_response(body: GenerateResponse) -> Result<LlmOutput, LlmError> {
    let part = body
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .and_then(|c| c.parts.into_iter().next())
        .ok_or(LlmError::EmptyResponse)?;

    if let Some(call) = part.function_call {
        return Ok(LlmOutput::tool_call(call.name, call.args));
    }
    Ok(LlmOutput::text(part.text.unwrap_or_default()))
}

#[async_trait]
impl LlmClient for GeminiClient {
    async fn generate(
        &self,
        prompt: &str,
        tools: Option<&[ToolDefinition]>,
        sampling: &SamplingParams,
    ) -> Result<LlmOutput, LlmError> {
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![TextPart {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: sampling.temperature,
                top_p: sampling.top_p,
                top_k: sampling.top_k,
                max_output_tokens: sampling.max_output_tokens,
            },
            tools: tools
                .filter(|t| !t.is_empty())
                .map(schema::gemini_tools),
        };

        debug!(
            "Gemini request to model {} ({} prompt chars, {} tools)",
            self.model,
            prompt.len(),
            request.tools.as_ref().map_or(0, Vec::len)
        );

        with_retries(&self.policy, || self.send_once(&request)).await
    }
}
