//! Web page scraping: fetch a URL and reduce it to readable text.

use crate::tools::{Tool, ToolArgs};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;

pub struct WebScraper {
    http: reqwest::Client,
    max_chars: usize,
}

impl WebScraper {
    pub fn new(http: reqwest::Client, max_chars: usize) -> Self {
        Self { http, max_chars }
    }

    async fn scrape(&self, url: &str) -> Result<String> {
        let resp = self.http.get(url).send().await.context("request failed")?;
        let status = resp.status();
        if !status.is_success() {
            bail!("HTTP error: {}", status);
        }
        let body = resp.text().await.context("failed to read body")?;
        let text = extract_text_from_html(&body);

        match text.char_indices().nth(self.max_chars) {
            Some((idx, _)) => Ok(format!(
                "{}... [content truncated, showing first {} chars]",
                &text[..idx],
                self.max_chars
            )),
            None => Ok(text),
        }
    }
}

#[async_trait]
impl Tool for WebScraper {
    async fn invoke(&self, args: &ToolArgs) -> Result<String> {
        let url = args.str("url")?;
        Ok(match self.scrape(url).await {
            Ok(text) => text,
            Err(e) => format!("Error during web scraping: {:#}", e),
        })
    }
}

/// Extract readable text from HTML: drop scripts and styles, strip tags,
/// collapse whitespace, decode the common entities.
pub fn extract_text_from_html(html: &str) -> String {
    let without_scripts = remove_blocks(html, "<script", "</script>");
    let text = remove_blocks(&without_scripts, "<style", "</style>");

    let mut result = String::with_capacity(text.len());
    let mut in_tag = false;
    for c in text.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => {
                in_tag = false;
                result.push(' ');
            }
            _ if !in_tag => result.push(c),
            _ => {}
        }
    }

    let collapsed = result.split_whitespace().collect::<Vec<_>>().join(" ");
    html_decode(&collapsed)
}

/// Remove every `open ... close` block, case-insensitively.
fn remove_blocks(html: &str, open: &str, close: &str) -> String {
    let lower = html.to_ascii_lowercase();
    let mut out = String::with_capacity(html.len());
    let mut cursor = 0;

    while let Some(start) = lower[cursor..].find(open).map(|i| cursor + i) {
        out.push_str(&html[cursor..start]);
        match lower[start..].find(close) {
            Some(end) => cursor = start + end + close.len(),
            None => {
                cursor = html.len();
                break;
            }
        }
    }
    out.push_str(&html[cursor..]);
    out
}

/// Basic HTML entity decoding.
fn html_decode(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}
