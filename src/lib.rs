//! smol-agent: a minimal tool-augmented LLM agent.
//!
//! An objective goes to the model together with a catalog of tools. The
//! model either answers directly or names one tool; the tool runs through
//! the function registry and its result is handed back to the model for a
//! final answer. A turn never makes more than two LLM calls.

pub mod agent;
pub mod config;
pub mod error;
pub mod llm;
pub mod tools;
pub mod types;

pub use agent::Agent;
pub use error::{LlmError, RegistryError};
pub use llm::LlmClient;
pub use tools::{FunctionRegistry, Tool, ToolArgs};
