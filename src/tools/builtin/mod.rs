//! Built-in tools and their catalog entries.

pub mod calculator;
pub mod deepseek;
pub mod local_model;
pub mod search;
pub mod text;
pub mod web;

use super::{FunctionRegistry, Tool};
use crate::config::ToolsConfig;
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// One catalog entry: name, handler, description, parameters.
type Entry = (
    &'static str,
    Arc<dyn Tool>,
    &'static str,
    Vec<(&'static str, &'static str)>,
);

/// Build every built-in tool from config.
fn catalog(config: &ToolsConfig) -> Result<Vec<Entry>> {
    let http = reqwest::Client::builder()
        .user_agent(concat!("smol-agent/", env!("CARGO_PKG_VERSION")))
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()
        .context("Failed to build HTTP client for tools")?;

    Ok(vec![
        (
            "web_search",
            Arc::new(search::WebSearch::new(http.clone(), &config.search_url)),
            "Searches the web for information.",
            vec![("query", "The search query")],
        ),
        (
            "calculate",
            Arc::new(calculator::Calculator),
            "Calculates a mathematical expression.",
            vec![("expression", "The mathematical expression to calculate")],
        ),
        (
            "web_scraper",
            Arc::new(web::WebScraper::new(http.clone(), config.scrape_max_chars)),
            "Scrapes the content of a webpage.",
            vec![("url", "The URL of the webpage to scrape")],
        ),
        (
            "summarize_text",
            Arc::new(text::Summarizer::new(config.summary_chars)),
            "Summarizes the given text.",
            vec![("text", "The text to be summarized")],
        ),
        (
            "deepseek_chat",
            Arc::new(deepseek::DeepSeekChat::new(http, config)),
            "Makes a call to the DeepSeek API to get AI-generated responses.",
            vec![
                ("prompt", "The text prompt to send to DeepSeek"),
                (
                    "model",
                    "The model to use ('deepseek-chat' for V3 or 'deepseek-reasoner' for R1)",
                ),
            ],
        ),
        (
            "huggingface_tool",
            Arc::new(local_model::LocalModel::new(config.local_model_command.clone())),
            "Runs inference using a Hugging Face model.",
            vec![("prompt", "The prompt to send to the Hugging Face model")],
        ),
    ])
}

/// Register the enabled built-in tools. Fails on duplicate names.
pub fn register_builtins(registry: &FunctionRegistry, config: &ToolsConfig) -> Result<()> {
    let mut count = 0;
    for (name, handler, description, parameters) in catalog(config)? {
        if !config.is_enabled(name) {
            debug!("Built-in tool '{}' disabled by config", name);
            continue;
        }
        registry
            .register(name, handler, description, parameters)
            .with_context(|| format!("Failed to register built-in tool '{}'", name))?;
        count += 1;
    }
    info!("Registered {} built-in tool(s)", count);
    Ok(())
}
