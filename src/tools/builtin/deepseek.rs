//! DeepSeek chat tool: a reasoning pass followed by a final-answer pass.
//!
//! Every call is appended to a JSONL log with its inputs, the captured
//! reasoning and the final answer (or the error).

use crate::config::ToolsConfig;
use crate::tools::{Tool, ToolArgs};
use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

const REASONING_SYSTEM_PROMPT: &str =
    "Think step by step and show your reasoning. Be thorough but concise.";
const ANSWER_SYSTEM_PROMPT: &str =
    "Based on the previous reasoning, provide a clear and concise final answer.";
const ANSWER_FOLLOW_UP: &str =
    "Now provide a clear and concise final answer based on your reasoning.";

pub struct DeepSeekChat {
    http: reqwest::Client,
    api_url: String,
    api_key_env: String,
    log_path: PathBuf,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    stream: bool,
    temperature: f64,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// One line of the call log.
#[derive(Debug, Serialize, Deserialize)]
pub struct CallLogEntry {
    pub timestamp: String,
    pub input: CallInput,
    pub train_of_thought: Option<String>,
    pub final_answer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub success: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CallInput {
    pub prompt: String,
    pub model: String,
}

impl DeepSeekChat {
    pub fn new(http: reqwest::Client, config: &ToolsConfig) -> Self {
        Self {
            http,
            api_url: config.deepseek_api_url.clone(),
            api_key_env: config.deepseek_api_key_env.clone(),
            log_path: PathBuf::from(config.resolved_deepseek_log_path()),
        }
    }

    async fn complete(
        &self,
        api_key: &str,
        model: &str,
        messages: Vec<Message<'_>>,
        temperature: f64,
        max_tokens: u32,
    ) -> Result<String> {
        let request = ChatRequest {
            model,
            messages,
            stream: false,
            temperature,
            max_tokens,
        };
        let resp = self
            .http
            .post(&self.api_url)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .context("Error calling DeepSeek API")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            bail!("Error calling DeepSeek API (Status {}): {}", status.as_u16(), body);
        }

        let body: ChatResponse = resp
            .json()
            .await
            .context("Error parsing DeepSeek API response")?;
        body.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| anyhow!("Error parsing DeepSeek API response: no content"))
    }

    async fn append_log(&self, entry: &CallLogEntry) -> Result<()> {
        if let Some(parent) = self.log_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut line = serde_json::to_string(entry)?;
        line.push('\n');
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)
            .await
            .with_context(|| format!("Failed to open {}", self.log_path.display()))?;
        file.write_all(line.as_bytes()).await?;
        Ok(())
    }
}

#[async_trait]
impl Tool for DeepSeekChat {
    async fn invoke(&self, args: &ToolArgs) -> Result<String> {
        let prompt = args.str("prompt")?;
        let model = args.str("model")?;

        let api_key = match std::env::var(&self.api_key_env) {
            Ok(key) if !key.is_empty() => key,
            _ => {
                return Ok(format!(
                    "Error: {} not found in environment variables",
                    self.api_key_env
                ))
            }
        };

        debug!("DeepSeek reasoning pass with {}", model);
        let reasoning = self
            .complete(
                &api_key,
                model,
                vec![
                    Message { role: "system", content: REASONING_SYSTEM_PROMPT },
                    Message { role: "user", content: prompt },
                ],
                0.7,
                1000,
            )
            .await;

        let answer = match &reasoning {
            Ok(thought) => {
                debug!("DeepSeek final-answer pass ({} chars of reasoning)", thought.len());
                self.complete(
                    &api_key,
                    model,
                    vec![
                        Message { role: "system", content: ANSWER_SYSTEM_PROMPT },
                        Message { role: "user", content: prompt },
                        Message { role: "assistant", content: thought },
                        Message { role: "user", content: ANSWER_FOLLOW_UP },
                    ],
                    0.3,
                    500,
                )
                .await
            }
            Err(e) => Err(anyhow!("{:#}", e)),
        };

        let train_of_thought = reasoning.ok();
        let (final_answer, error) = match answer {
            Ok(a) => (Some(a), None),
            Err(e) => (None, Some(format!("{:#}", e))),
        };

        let entry = CallLogEntry {
            timestamp: Utc::now().to_rfc3339(),
            input: CallInput {
                prompt: prompt.to_string(),
                model: model.to_string(),
            },
            success: train_of_thought.is_some() && final_answer.is_some(),
            train_of_thought,
            final_answer,
            error,
        };
        if let Err(e) = self.append_log(&entry).await {
            warn!("Failed to append DeepSeek call log: {:#}", e);
        }

        match (entry.final_answer, entry.error) {
            (Some(answer), _) => Ok(answer),
            (None, error) => Err(anyhow!(
                "{}\nTrain of thought captured so far: {}",
                error.unwrap_or_else(|| "no answer".into()),
                entry.train_of_thought.as_deref().unwrap_or("None")
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn tool(server_uri: &str, dir: &std::path::Path, key_env: &str) -> DeepSeekChat {
        let config = ToolsConfig {
            deepseek_api_url: format!("{}/v1/chat/completions", server_uri),
            deepseek_api_key_env: key_env.into(),
            deepseek_log_path: dir.join("calls.jsonl").display().to_string(),
            ..ToolsConfig::default()
        };
        DeepSeekChat::new(reqwest::Client::new(), &config)
    }

    fn args() -> ToolArgs {
        ToolArgs::from_iter([("prompt", "What day was it two days ago?"), ("model", "deepseek-reasoner")])
    }

    #[tokio::test]
    async fn test_missing_key_is_soft_error() {
        let dir = tempfile::tempdir().unwrap();
        let t = tool("http://127.0.0.1:9", dir.path(), "SMOL_AGENT_TEST_NO_DEEPSEEK_KEY");
        let out = t.invoke(&args()).await.unwrap();
        assert_eq!(
            out,
            "Error: SMOL_AGENT_TEST_NO_DEEPSEEK_KEY not found in environment variables"
        );
    }

    #[tokio::test]
    async fn test_two_passes_and_log_line() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({"temperature": 0.7})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"content": "Monday minus two days is Saturday."}}]
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({"temperature": 0.3})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"content": "Saturday."}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let key_env = "SMOL_AGENT_TEST_DEEPSEEK_KEY_OK";
        std::env::set_var(key_env, "sk-test");
        let t = tool(&server.uri(), dir.path(), key_env);

        assert_eq!(t.invoke(&args()).await.unwrap(), "Saturday.");

        let log = std::fs::read_to_string(dir.path().join("calls.jsonl")).unwrap();
        let entry: CallLogEntry = serde_json::from_str(log.trim()).unwrap();
        assert!(entry.success);
        assert_eq!(entry.input.model, "deepseek-reasoner");
        assert_eq!(
            entry.train_of_thought.as_deref(),
            Some("Monday minus two days is Saturday.")
        );
        assert_eq!(entry.final_answer.as_deref(), Some("Saturday."));
    }

    #[tokio::test]
    async fn test_failure_is_logged_and_raised() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let key_env = "SMOL_AGENT_TEST_DEEPSEEK_KEY_BAD";
        std::env::set_var(key_env, "sk-wrong");
        let t = tool(&server.uri(), dir.path(), key_env);

        let err = t.invoke(&args()).await.unwrap_err().to_string();
        assert!(err.contains("Status 401"));
        assert!(err.contains("Train of thought captured so far: None"));

        let log = std::fs::read_to_string(dir.path().join("calls.jsonl")).unwrap();
        let entry: CallLogEntry = serde_json::from_str(log.trim()).unwrap();
        assert!(!entry.success);
        assert!(entry.error.unwrap().contains("bad key"));
    }
}
