//! Web search via the DuckDuckGo instant-answer API.

use crate::tools::{Tool, ToolArgs};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

pub struct WebSearch {
    http: reqwest::Client,
    url: String,
}

#[derive(Debug, Deserialize)]
struct InstantAnswer {
    #[serde(rename = "AbstractText", default)]
    abstract_text: String,
}

impl WebSearch {
    pub fn new(http: reqwest::Client, url: &str) -> Self {
        Self {
            http,
            url: url.to_string(),
        }
    }

    async fn search(&self, query: &str) -> Result<String> {
        let resp = self
            .http
            .get(&self.url)
            .query(&[("q", query), ("format", "json")])
            .send()
            .await
            .context("search request failed")?
            .error_for_status()
            .context("search request rejected")?;

        // DuckDuckGo answers with a javascript content type, so decode by hand.
        let body = resp.text().await.context("failed to read search response")?;
        let answer: InstantAnswer =
            serde_json::from_str(&body).context("failed to parse search response")?;

        debug!("Search '{}' returned {} chars", query, answer.abstract_text.len());
        if answer.abstract_text.is_empty() {
            Ok(format!("No results found for '{}'.", query))
        } else {
            Ok(answer.abstract_text)
        }
    }
}

#[async_trait]
impl Tool for WebSearch {
    async fn invoke(&self, args: &ToolArgs) -> Result<String> {
        let query = args.text("query")?;
        Ok(match self.search(&query).await {
            Ok(summary) => summary,
            Err(e) => format!("Error during web search: {:#}", e),
        })
    }
}
