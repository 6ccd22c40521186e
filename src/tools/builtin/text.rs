//! Text summarization (leading-excerpt summary).

use crate::tools::{Tool, ToolArgs};
use anyhow::Result;
use async_trait::async_trait;

pub struct Summarizer {
    max_chars: usize,
}

impl Summarizer {
    pub fn new(max_chars: usize) -> Self {
        Self { max_chars }
    }

    pub fn summarize(&self, text: &str) -> String {
        match text.char_indices().nth(self.max_chars) {
            Some((idx, _)) => format!("{}...", &text[..idx]),
            None => text.to_string(),
        }
    }
}

#[async_trait]
impl Tool for Summarizer {
    async fn invoke(&self, args: &ToolArgs) -> Result<String> {
        Ok(self.summarize(args.str("text")?))
    }
}
