//! Local model inference through a subprocess.
//!
//! The configured command line is run with the prompt appended as its last
//! argument; stdout is the result.

use crate::tools::{Tool, ToolArgs};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

pub struct LocalModel {
    command: Vec<String>,
}

impl LocalModel {
    pub fn new(command: Vec<String>) -> Self {
        Self { command }
    }
}

#[async_trait]
impl Tool for LocalModel {
    async fn invoke(&self, args: &ToolArgs) -> Result<String> {
        let prompt = args.str("prompt")?;
        let Some((program, rest)) = self.command.split_first() else {
            bail!("local model command is not configured");
        };

        debug!("Running local model: {} ({} args)", program, rest.len() + 1);
        // kill_on_drop: a registry timeout drops this future and must not
        // leave the child running.
        let output = Command::new(program)
            .args(rest)
            .arg(prompt)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .with_context(|| format!("Failed to start '{}'", program))?;

        if !output.status.success() {
            bail!(
                "Error running local model inference ({}): {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
