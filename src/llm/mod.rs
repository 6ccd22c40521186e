//! LLM client contract and the concrete backends behind it.

pub mod gemini;
pub mod openai;

pub use gemini::GeminiClient;
pub use openai::OpenAiClient;

use crate::config::{LlmConfig, Provider};
use crate::error::LlmError;
use crate::tools::ToolDefinition;
use crate::types::{LlmOutput, SamplingParams};
use anyhow::{bail, Result};
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// A backend that turns a prompt into text or a tool directive.
///
/// Implementations retry transient failures internally and resolve to an
/// error once retries are exhausted; they never hang indefinitely.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn generate(
        &self,
        prompt: &str,
        tools: Option<&[ToolDefinition]>,
        sampling: &SamplingParams,
    ) -> Result<LlmOutput, LlmError>;
}

/// Attempt bounds shared by the HTTP backends.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
    pub attempt_timeout: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &LlmConfig) -> Self {
        Self {
            max_attempts: config.max_retries.max(1),
            delay: Duration::from_millis(config.retry_delay_ms),
            attempt_timeout: Duration::from_secs(config.request_timeout_secs),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_millis(500),
            attempt_timeout: Duration::from_secs(20),
        }
    }
}

/// Run `op` until it succeeds, fails permanently, or attempts run out.
///
/// Each attempt is bounded by the policy's timeout. Transient failures
/// are retried after a fixed delay; after the last attempt they fold into
/// `LlmError::Unavailable`. Permanent failures are returned as-is.
pub async fn with_retries<T, F, Fut>(policy: &RetryPolicy, mut op: F) -> Result<T, LlmError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, LlmError>>,
{
    let mut last_error = String::from("no attempt made");

    for attempt in 1..=policy.max_attempts {
        let result = match tokio::time::timeout(policy.attempt_timeout, op()).await {
            Ok(r) => r,
            Err(_) => Err(LlmError::Timeout(policy.attempt_timeout.as_secs())),
        };

        match result {
            Ok(v) => return Ok(v),
            Err(e) if e.is_transient() => {
                warn!(
                    "LLM request failed (attempt {}/{}): {}",
                    attempt, policy.max_attempts, e
                );
                last_error = e.to_string();
                if attempt < policy.max_attempts {
                    tokio::time::sleep(policy.delay).await;
                }
            }
            Err(e) => return Err(e),
        }
    }

    warn!("LLM request failed after {} attempt(s)", policy.max_attempts);
    Err(LlmError::Unavailable {
        attempts: policy.max_attempts,
        last_error,
    })
}

/// Resolve the API key: explicit config value first, then the env var.
pub fn resolve_api_key(config: &LlmConfig) -> Result<String> {
    if !config.api_key.is_empty() {
        return Ok(config.api_key.clone());
    }
    match std::env::var(&config.api_key_env) {
        Ok(key) if !key.is_empty() => Ok(key),
        _ => bail!(
            "API key not provided. Set {} or llm.api_key in the config file.",
            config.api_key_env
        ),
    }
}

/// Build the configured backend.
pub fn build_client(config: &LlmConfig) -> Result<Arc<dyn LlmClient>> {
    let api_key = resolve_api_key(config)?;
    let policy = RetryPolicy::from_config(config);
    let client: Arc<dyn LlmClient> = match config.provider {
        Provider::Gemini => Arc::new(GeminiClient::new(
            &config.api_url,
            &api_key,
            &config.model,
            policy,
        )?),
        Provider::Openai => Arc::new(OpenAiClient::new(
            &config.api_url,
            &api_key,
            &config.model,
            policy,
        )?),
    };
    Ok(client)
}

/// Shared HTTP client with the per-attempt timeout applied.
pub(crate) fn http_client(policy: &RetryPolicy) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(policy.attempt_timeout)
        .build()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            delay: Duration::from_millis(1),
            attempt_timeout: Duration::from_secs(5),
        }
    }

    #[tokio::test]
    async fn test_retries_transient_then_succeeds() {
        let attempts = AtomicU32::new(0);
        let out = with_retries(&fast_policy(3), || async {
            if attempts.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(LlmError::Http("503 Service Unavailable".into()))
            } else {
                Ok("ok")
            }
        })
        .await
        .unwrap();
        assert_eq!(out, "ok");
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhaustion_becomes_unavailable() {
        let attempts = AtomicU32::new(0);
        let err = with_retries(&fast_policy(3), || async {
            attempts.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>(LlmError::Http("connection refused".into()))
        })
        .await
        .unwrap_err();
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        match err {
            LlmError::Unavailable { attempts, last_error } => {
                assert_eq!(attempts, 3);
                assert!(last_error.contains("connection refused"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_permanent_error_is_not_retried() {
        let attempts = AtomicU32::new(0);
        let err = with_retries(&fast_policy(3), || async {
            attempts.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>(LlmError::Decode("not json".into()))
        })
        .await
        .unwrap_err();
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert!(matches!(err, LlmError::Decode(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_attempt_times_out() {
        let policy = RetryPolicy {
            max_attempts: 2,
            delay: Duration::from_millis(10),
            attempt_timeout: Duration::from_secs(1),
        };
        let err = with_retries(&policy, || async {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok::<_, LlmError>(())
        })
        .await
        .unwrap_err();
        match err {
            LlmError::Unavailable { attempts, last_error } => {
                assert_eq!(attempts, 2);
                assert!(last_error.contains("timed out"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_resolve_api_key_prefers_config() {
        let config = LlmConfig {
            api_key: "from-config".into(),
            api_key_env: "SMOL_AGENT_TEST_UNSET_KEY".into(),
            ..LlmConfig::default()
        };
        assert_eq!(resolve_api_key(&config).unwrap(), "from-config");

        let config = LlmConfig {
            api_key_env: "SMOL_AGENT_TEST_UNSET_KEY".into(),
            ..LlmConfig::default()
        };
        let err = resolve_api_key(&config).unwrap_err().to_string();
        assert!(err.contains("SMOL_AGENT_TEST_UNSET_KEY"));
    }
}
