//! Bounded agent turn: Decide → Act → Synthesize.
//!
//! Every turn:
//! 1. Calls the LLM with the objective and the tool catalog
//! 2. Interprets the answer as text, a tool directive, or a fallback
//! 3. Dispatches at most one tool through the registry
//! 4. Calls the LLM once more to turn the tool result into an answer
//!
//! A turn makes at most two LLM calls and one dispatch. A tool directive
//! in the synthesis response is never dispatched.

use crate::agent::{directive, prompt};
use crate::config::{AgentConfig, AgentSettings};
use crate::error::RegistryError;
use crate::llm::LlmClient;
use crate::tools::{FunctionRegistry, ToolArgs};
use crate::types::*;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Drives one objective at a time to a final string response.
///
/// Cheap to share: turns only borrow `&self`, and the registry is the
/// only state they have in common.
pub struct Agent {
    llm: Arc<dyn LlmClient>,
    registry: Arc<FunctionRegistry>,
    settings: AgentSettings,
    sampling: SamplingParams,
}

impl Agent {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        registry: Arc<FunctionRegistry>,
        settings: AgentSettings,
        sampling: SamplingParams,
    ) -> Self {
        Self {
            llm,
            registry,
            settings,
            sampling,
        }
    }

    pub fn from_config(
        config: &AgentConfig,
        llm: Arc<dyn LlmClient>,
        registry: Arc<FunctionRegistry>,
    ) -> Self {
        Self::new(llm, registry, config.agent.clone(), config.sampling.clone())
    }

    pub fn registry(&self) -> &Arc<FunctionRegistry> {
        &self.registry
    }

    /// Run one turn and return the response text. Never fails: LLM and
    /// tool problems are reported in the returned string.
    pub async fn process_request(&self, objective: &str) -> String {
        self.run_turn(objective).await.final_response
    }

    /// Run one turn and return its full record.
    pub async fn run_turn(&self, objective: &str) -> AgentTurn {
        let mut turn = AgentTurn::new(objective);
        let mode = self.settings.directive_mode;
        info!("[Turn {}] Objective: {}", turn.id, truncate(objective, 200));

        let catalog = self.registry.describe_all();
        let decision_prompt = prompt::decision_prompt(objective, mode, &catalog);
        let tools = match mode {
            DirectiveMode::Native if !catalog.is_empty() => Some(catalog.as_slice()),
            _ => None,
        };

        turn.llm_calls += 1;
        let output = match self.llm.generate(&decision_prompt, tools, &self.sampling).await {
            Ok(output) => output,
            Err(e) => {
                error!("[Turn {}] Decision call failed: {}", turn.id, e);
                let msg = self.settings.fallback_message.clone();
                return finish(turn, TurnOutcome::LlmUnavailable, msg);
            }
        };
        turn.raw_output = Some(output.clone());

        let directive = directive::interpret(output, mode);
        debug!("[Turn {}] Directive: {}", turn.id, directive.label());
        turn.directive = Some(directive.clone());

        match directive {
            Directive::FinalText { text } if text.trim().is_empty() => {
                warn!("[Turn {}] Decision call returned empty text", turn.id);
                let msg = self.settings.fallback_message.clone();
                finish(turn, TurnOutcome::LlmUnavailable, msg)
            }
            Directive::FinalText { text } => finish(turn, TurnOutcome::Answered, text),
            Directive::Malformed { reason, .. } => {
                warn!("[Turn {}] Malformed directive: {}", turn.id, reason);
                finish(
                    turn,
                    TurnOutcome::Malformed,
                    format!("Error when calling tool: {}", reason),
                )
            }
            Directive::Fallback => self.answer_directly(turn).await,
            Directive::ToolCall { name, arguments } => {
                self.dispatch_and_synthesize(turn, name, arguments).await
            }
        }
    }

    /// Fallback arm: ask again without tools and return whatever text comes back.
    async fn answer_directly(&self, mut turn: AgentTurn) -> AgentTurn {
        info!("[Turn {}] No tool selected, answering directly", turn.id);
        turn.llm_calls += 1;
        let prompt = prompt::direct_prompt(&turn.objective);
        match self.llm.generate(&prompt, None, &self.sampling).await {
            Ok(LlmOutput::Text { text }) if !text.trim().is_empty() => {
                finish(turn, TurnOutcome::FallbackAnswered, text)
            }
            Ok(_) => {
                warn!("[Turn {}] Direct answer was empty or a tool directive", turn.id);
                let msg = self.settings.fallback_message.clone();
                finish(turn, TurnOutcome::LlmUnavailable, msg)
            }
            Err(e) => {
                error!("[Turn {}] Direct answer call failed: {}", turn.id, e);
                let msg = self.settings.fallback_message.clone();
                finish(turn, TurnOutcome::LlmUnavailable, msg)
            }
        }
    }

    async fn dispatch_and_synthesize(
        &self,
        mut turn: AgentTurn,
        name: String,
        arguments: Map<String, Value>,
    ) -> AgentTurn {
        let shown = Value::Object(arguments.clone());
        info!("[Turn {}] Tool: {}({})", turn.id, name, shown);
        turn.tool_name = Some(name.clone());
        turn.dispatches += 1;

        let args = ToolArgs::new(arguments);
        let tool_result = match self.registry.dispatch(&name, &args).await {
            Ok(output) => {
                info!("[Turn {}] Tool result: {} chars", turn.id, output.len());
                output
            }
            Err(e @ RegistryError::UnknownTool(_)) => {
                // Nothing ran, so there is nothing to synthesize.
                warn!("[Turn {}] {}", turn.id, e);
                let msg = e.to_result_string();
                turn.tool_result = Some(msg.clone());
                return finish(turn, TurnOutcome::ToolNotFound, msg);
            }
            Err(e) => {
                warn!("[Turn {}] Tool error: {}", turn.id, e);
                e.to_result_string()
            }
        };
        turn.tool_result = Some(tool_result.clone());

        turn.llm_calls += 1;
        let prompt = prompt::synthesis_prompt(&turn.objective, &name, &tool_result);
        match self.llm.generate(&prompt, None, &self.sampling).await {
            Ok(LlmOutput::Text { text }) if !text.trim().is_empty() => {
                finish(turn, TurnOutcome::Synthesized, text)
            }
            Ok(LlmOutput::ToolCall { call }) => {
                warn!(
                    "[Turn {}] Ignoring tool directive '{}' in synthesis response",
                    turn.id, call.name
                );
                let msg = self.settings.synthesis_fallback_message.clone();
                finish(turn, TurnOutcome::LlmUnavailable, msg)
            }
            Ok(_) => {
                warn!("[Turn {}] Synthesis call returned empty text", turn.id);
                let msg = self.settings.synthesis_fallback_message.clone();
                finish(turn, TurnOutcome::LlmUnavailable, msg)
            }
            Err(e) => {
                error!("[Turn {}] Synthesis call failed: {}", turn.id, e);
                let msg = self.settings.synthesis_fallback_message.clone();
                finish(turn, TurnOutcome::LlmUnavailable, msg)
            }
        }
    }
}

fn finish(mut turn: AgentTurn, outcome: TurnOutcome, response: String) -> AgentTurn {
    info!(
        "[Turn {}] Done: {} ({} LLM call(s), {} dispatch(es))",
        turn.id, outcome, turn.llm_calls, turn.dispatches
    );
    turn.outcome = outcome;
    turn.final_response = response;
    turn
}

fn truncate(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("héllo", 2), "hé");
        assert_eq!(truncate("short", 200), "short");
    }
}
