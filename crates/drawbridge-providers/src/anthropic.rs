//! Anthropic Messages API provider.
//!
//! Streams completions from `POST /v1/messages`. Event translation is kept in
//! the pure [`process_event`] so the wire protocol is testable without HTTP:
//! text deltas pass straight through, tool_use blocks accumulate their
//! argument JSON across `input_json_delta` events and surface as one chunk at
//! `content_block_stop`.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tokio_stream::StreamExt;
use tracing::{debug, warn};

use drawbridge_core::transcript::Turn;
use drawbridge_core::types::ContentBlock;

use crate::sse::{SseEvent, sse_stream};
use crate::{
    ChunkStream, ChunkUsage, CompletionChunk, CompletionRequest, Credentials, LlmProvider,
    ToolDefinition, ToolUseChunk,
};

const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";
const API_VERSION: &str = "2023-06-01";

pub struct AnthropicProvider {
    base_url: String,
    client: reqwest::Client,
}

impl AnthropicProvider {
    pub fn new(base_url: Option<&str>) -> Self {
        Self {
            base_url: base_url
                .unwrap_or(ANTHROPIC_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            client: reqwest::Client::new(),
        }
    }
}

// --- Wire types ---

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum StreamEvent {
    MessageStart {
        message: MessageMeta,
    },
    ContentBlockStart {
        index: usize,
        content_block: StartedBlock,
    },
    ContentBlockDelta {
        index: usize,
        delta: BlockDelta,
    },
    ContentBlockStop {
        index: usize,
    },
    MessageDelta {
        delta: StopDelta,
        #[serde(default)]
        usage: Option<WireUsage>,
    },
    MessageStop,
    Ping,
    Error {
        error: WireError,
    },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize)]
struct MessageMeta {
    #[serde(default)]
    usage: Option<WireUsage>,
}

/// Only tool_use starts carry state we need; text arrives via deltas.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum StartedBlock {
    ToolUse {
        id: String,
        name: String,
    },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum BlockDelta {
    TextDelta { text: String },
    InputJsonDelta { partial_json: String },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Default, Deserialize)]
struct StopDelta {
    #[serde(default)]
    stop_reason: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
struct WireUsage {
    #[serde(default)]
    input_tokens: Option<u64>,
    #[serde(default)]
    output_tokens: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct WireError {
    #[serde(rename = "type", default)]
    kind: String,
    message: String,
}

impl From<WireUsage> for ChunkUsage {
    fn from(usage: WireUsage) -> Self {
        ChunkUsage {
            input_tokens: usage.input_tokens,
            output_tokens: usage.output_tokens,
        }
    }
}

/// Accumulates one tool_use block across streaming deltas.
#[derive(Debug)]
struct ToolUseAccumulator {
    id: String,
    name: String,
    input_json: String,
}

#[derive(Debug, Default)]
struct StreamState {
    open_tools: HashMap<usize, ToolUseAccumulator>,
}

/// Translate one SSE event into at most one completion chunk.
fn process_event(
    state: &mut StreamState,
    event: &SseEvent,
) -> anyhow::Result<Option<CompletionChunk>> {
    let parsed: StreamEvent = serde_json::from_str(&event.data)?;

    let chunk = match parsed {
        StreamEvent::MessageStart { message } => message.usage.map(|usage| CompletionChunk {
            usage: Some(usage.into()),
            ..Default::default()
        }),
        StreamEvent::ContentBlockStart {
            index,
            content_block,
        } => {
            if let StartedBlock::ToolUse { id, name } = content_block {
                state.open_tools.insert(
                    index,
                    ToolUseAccumulator {
                        id,
                        name,
                        input_json: String::new(),
                    },
                );
            }
            None
        }
        StreamEvent::ContentBlockDelta { index, delta } => match delta {
            BlockDelta::TextDelta { text } => Some(CompletionChunk {
                delta: Some(text),
                ..Default::default()
            }),
            BlockDelta::InputJsonDelta { partial_json } => {
                match state.open_tools.get_mut(&index) {
                    Some(acc) => acc.input_json.push_str(&partial_json),
                    None => warn!(index, "input_json_delta for unknown block"),
                }
                None
            }
            BlockDelta::Unknown => None,
        },
        StreamEvent::ContentBlockStop { index } => {
            state.open_tools.remove(&index).map(|acc| CompletionChunk {
                tool_use: Some(ToolUseChunk {
                    id: acc.id,
                    name: acc.name,
                    input_json: if acc.input_json.is_empty() {
                        "{}".to_string()
                    } else {
                        acc.input_json
                    },
                }),
                ..Default::default()
            })
        }
        StreamEvent::MessageDelta { delta, usage } => Some(CompletionChunk {
            stop_reason: delta.stop_reason,
            usage: usage.map(Into::into),
            ..Default::default()
        }),
        StreamEvent::Error { error } => {
            anyhow::bail!("Anthropic stream error ({}): {}", error.kind, error.message)
        }
        StreamEvent::MessageStop | StreamEvent::Ping | StreamEvent::Unknown => None,
    };

    Ok(chunk)
}

fn content_block_to_json(block: &ContentBlock) -> serde_json::Value {
    match block {
        ContentBlock::Text { text } => json!({"type": "text", "text": text}),
        ContentBlock::Image { source } => json!({
            "type": "image",
            "source": {
                "type": source.source_type,
                "media_type": source.media_type,
                "data": source.data,
            },
        }),
        ContentBlock::ToolUse { id, name, input } => json!({
            "type": "tool_use",
            "id": id,
            "name": name,
            "input": input,
        }),
        ContentBlock::ToolResult {
            tool_use_id,
            content,
            is_error,
        } => json!({
            "type": "tool_result",
            "tool_use_id": tool_use_id,
            "content": content,
            "is_error": is_error,
        }),
    }
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
    fn id(&self) -> &str {
        "anthropic"
    }

    fn format_messages(&self, history: &[Turn]) -> Vec<serde_json::Value> {
        let mut messages: Vec<serde_json::Value> = Vec::new();

        for turn in history {
            match turn {
                Turn::User { content, .. } => {
                    let blocks: Vec<serde_json::Value> =
                        content.iter().map(content_block_to_json).collect();
                    messages.push(json!({"role": "user", "content": blocks}));
                }
                Turn::Assistant { content, .. } => {
                    let blocks: Vec<serde_json::Value> =
                        content.iter().map(content_block_to_json).collect();
                    if !blocks.is_empty() {
                        messages.push(json!({"role": "assistant", "content": blocks}));
                    }
                }
                Turn::ToolResult {
                    tool_use_id,
                    content,
                    is_error,
                    images,
                    ..
                } => {
                    // Tool results with images carry a block list; plain text
                    // stays a string for compactness.
                    let result_content: serde_json::Value = if images.is_empty() {
                        json!(content)
                    } else {
                        let mut blocks = vec![json!({"type": "text", "text": content})];
                        for image in images {
                            blocks.push(json!({
                                "type": "image",
                                "source": {
                                    "type": image.source_type,
                                    "media_type": image.media_type,
                                    "data": image.data,
                                },
                            }));
                        }
                        json!(blocks)
                    };
                    messages.push(json!({
                        "role": "user",
                        "content": [{
                            "type": "tool_result",
                            "tool_use_id": tool_use_id,
                            "content": result_content,
                            "is_error": is_error,
                        }],
                    }));
                }
                // Embedded in the preceding assistant turn's tool_use blocks.
                Turn::ToolCall { .. } => {}
            }
        }

        messages
    }

    fn format_tools(&self, tools: &[ToolDefinition]) -> Vec<serde_json::Value> {
        tools
            .iter()
            .map(|t| {
                json!({
                    "name": t.name,
                    "description": t.description,
                    "input_schema": t.parameters_schema,
                })
            })
            .collect()
    }

    fn is_tool_use_stop(&self, stop_reason: &str) -> bool {
        stop_reason == "tool_use"
    }

    async fn stream(
        &self,
        request: &CompletionRequest,
        credentials: &Credentials,
    ) -> anyhow::Result<ChunkStream> {
        let mut body = json!({
            "model": request.model,
            "max_tokens": request.max_tokens,
            "messages": request.messages,
            "stream": true,
        });
        if let Some(system) = &request.system {
            body["system"] = json!(system);
        }
        if let Some(temperature) = request.temperature {
            body["temperature"] = json!(temperature);
        }
        if let Some(tools) = &request.tools {
            body["tools"] = json!(tools);
        }

        let mut req = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("anthropic-version", API_VERSION)
            .header("Content-Type", "application/json");
        req = match credentials {
            Credentials::ApiKey { api_key } => req.header("x-api-key", api_key),
            Credentials::Token { token } => req.header("Authorization", format!("Bearer {token}")),
        };

        debug!(model = %request.model, "starting completion stream");
        let resp = req.json(&body).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Anthropic API error (HTTP {status}): {body}");
        }

        let events = Box::pin(sse_stream(resp));
        let chunks = futures::stream::unfold(
            (events, StreamState::default()),
            |(mut events, mut state)| async move {
                loop {
                    match events.next().await {
                        Some(Ok(event)) => match process_event(&mut state, &event) {
                            Ok(Some(chunk)) => return Some((Ok(chunk), (events, state))),
                            Ok(None) => {}
                            Err(e) => return Some((Err(e), (events, state))),
                        },
                        Some(Err(e)) => return Some((Err(e), (events, state))),
                        None => return None,
                    }
                }
            },
        );

        Ok(Box::pin(chunks))
    }
}
