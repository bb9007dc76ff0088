//! Agent orchestration core for Drawbridge.
//!
//! The [`Orchestrator`] drives a tool-calling LLM in a bounded loop: it owns
//! the conversation history and the diagram canvas, streams model responses,
//! executes requested tools strictly sequentially, routes canvas replacements
//! through render feedback, and emits a typed [`AgentEvent`] stream for the
//! single observer registered at construction.

pub mod orchestrator;
pub mod prompt;

pub use orchestrator::{Orchestrator, RunState, RunSummary};

pub use drawbridge_core::error::AgentError;
pub use drawbridge_core::event::{AgentEvent, FailureKind};
