//! Agent orchestrator: one objective in, one string out.

pub mod directive;
pub mod loop_;
pub mod prompt;

pub use loop_::Agent;
