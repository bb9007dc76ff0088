//! LLM provider abstraction.
//!
//! The orchestrator consumes a tool-calling chat completion endpoint through
//! the [`LlmProvider`] trait: conversation history plus tool schemas in,
//! a stream of [`CompletionChunk`]s out. [`anthropic`] implements the trait
//! against the Anthropic Messages API.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};

use drawbridge_core::transcript::Turn;

pub mod anthropic;
pub mod sse;

pub use anthropic::AnthropicProvider;

/// Credentials for authenticating with an LLM provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Credentials {
    ApiKey { api_key: String },
    Token { token: String },
}

/// Provider-agnostic tool description; providers format this into their own
/// wire shape.
#[derive(Debug, Clone)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters_schema: serde_json::Value,
}

/// A request to the LLM.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<serde_json::Value>,
    pub max_tokens: u32,
    pub temperature: Option<f64>,
    pub tools: Option<Vec<serde_json::Value>>,
    pub system: Option<String>,
}

/// A streamed chunk from the LLM.
#[derive(Debug, Clone, Default)]
pub struct CompletionChunk {
    /// Incremental assistant text.
    pub delta: Option<String>,
    /// A completed tool invocation request.
    pub tool_use: Option<ToolUseChunk>,
    pub usage: Option<ChunkUsage>,
    pub stop_reason: Option<String>,
}

/// A fully accumulated tool call from the model.
#[derive(Debug, Clone)]
pub struct ToolUseChunk {
    pub id: String,
    pub name: String,
    pub input_json: String,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ChunkUsage {
    pub input_tokens: Option<u64>,
    pub output_tokens: Option<u64>,
}

pub type ChunkStream = Pin<Box<dyn Stream<Item = anyhow::Result<CompletionChunk>> + Send>>;

/// The core LLM provider trait.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider identifier (e.g., "anthropic").
    fn id(&self) -> &str;

    /// Convert conversation history into this provider's message format.
    fn format_messages(&self, history: &[Turn]) -> Vec<serde_json::Value>;

    /// Convert tool definitions into this provider's tool schema format.
    fn format_tools(&self, tools: &[ToolDefinition]) -> Vec<serde_json::Value>;

    /// Whether a stop reason means the model is waiting on tool results.
    fn is_tool_use_stop(&self, stop_reason: &str) -> bool;

    /// Stream a chat completion.
    async fn stream(
        &self,
        request: &CompletionRequest,
        credentials: &Credentials,
    ) -> anyhow::Result<ChunkStream>;
}
