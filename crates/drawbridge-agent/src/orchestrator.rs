//! The agent control loop.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::{Mutex, RwLock, mpsc};
use tokio_stream::StreamExt;
use tracing::{debug, info, warn};

use drawbridge_canvas::{CanvasSnapshot, CanvasState, RenderFeedback};
use drawbridge_core::config::Config;
use drawbridge_core::error::AgentError;
use drawbridge_core::event::{AgentEvent, EventSink};
use drawbridge_core::transcript::Turn;
use drawbridge_core::types::ContentBlock;
use drawbridge_providers::{
    CompletionRequest, Credentials, LlmProvider, ToolDefinition, ToolUseChunk,
};
use drawbridge_render::{DiagramRenderer, RasterConverter};
use drawbridge_tools::{
    BuiltinIconIndex, DocLibrary, IconIndex, ToolContext, ToolOutput, ToolRegistry,
};

use crate::prompt::build_system_prompt;

/// Where the loop currently is. Exactly one state at a time; transitions only
/// through [`Orchestrator::submit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunState {
    Idle,
    AwaitingModel,
    ExecutingTool(String),
}

/// Result of a completed (successful) run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub final_text: String,
    pub iterations: u32,
    pub tool_calls: u32,
    pub duration_ms: u64,
}

/// Drives one conversation: owns the history and the canvas, talks to the
/// model, executes tools, and emits lifecycle events.
///
/// One `submit` runs to completion before another is accepted; a concurrent
/// call is rejected with [`AgentError::AlreadyRunning`] rather than queued.
pub struct Orchestrator {
    config: Config,
    provider: Arc<dyn LlmProvider>,
    credentials: Credentials,
    tools: ToolRegistry,
    history: Mutex<Vec<Turn>>,
    canvas: Arc<Mutex<CanvasState>>,
    feedback: Arc<RenderFeedback>,
    icons: Arc<dyn IconIndex>,
    docs: Arc<DocLibrary>,
    run_state: RwLock<RunState>,
    events: EventSink,
}

impl Orchestrator {
    /// Construct an orchestrator with the built-in three-tool registry and
    /// hand back the single observer's event receiver.
    pub fn new(
        config: Config,
        provider: Arc<dyn LlmProvider>,
        credentials: Credentials,
        renderer: Arc<dyn DiagramRenderer>,
        converter: Arc<dyn RasterConverter>,
    ) -> (Self, mpsc::UnboundedReceiver<AgentEvent>) {
        let (events, rx) = EventSink::channel();
        let orchestrator = Self {
            config,
            provider,
            credentials,
            tools: ToolRegistry::builtin(),
            history: Mutex::new(Vec::new()),
            canvas: Arc::new(Mutex::new(CanvasState::new())),
            feedback: Arc::new(RenderFeedback::new(renderer, converter)),
            icons: Arc::new(BuiltinIconIndex),
            docs: Arc::new(DocLibrary::new()),
            run_state: RwLock::new(RunState::Idle),
            events,
        };
        (orchestrator, rx)
    }

    /// Process one user request through the model/tool loop.
    ///
    /// On failure the history accumulated so far is kept — partial tool
    /// results (a diagram already replaced) are real, observable progress —
    /// so a subsequent `submit` continues from where this one stopped.
    pub async fn submit(&self, user_message: &str) -> Result<RunSummary, AgentError> {
        // Gate before any history mutation or event emission.
        {
            let mut state = self.run_state.write().await;
            if *state != RunState::Idle {
                return Err(AgentError::AlreadyRunning);
            }
            *state = RunState::AwaitingModel;
        }

        let result = self.run(user_message).await;

        *self.run_state.write().await = RunState::Idle;
        match result {
            Ok(summary) => {
                self.events.emit(AgentEvent::RunCompleted);
                Ok(summary)
            }
            Err(err) => {
                warn!(error = %err, "run failed");
                self.events.emit(AgentEvent::RunFailed {
                    kind: err.failure_kind(),
                    message: err.to_string(),
                });
                Err(err)
            }
        }
    }

    /// Clear history and canvas for a fresh conversation.
    pub async fn reset(&self) -> Result<(), AgentError> {
        let state = self.run_state.read().await;
        if *state != RunState::Idle {
            return Err(AgentError::AlreadyRunning);
        }
        self.history.lock().await.clear();
        *self.canvas.lock().await = CanvasState::new();
        Ok(())
    }

    pub async fn run_state(&self) -> RunState {
        self.run_state.read().await.clone()
    }

    pub async fn history(&self) -> Vec<Turn> {
        self.history.lock().await.clone()
    }

    pub async fn canvas(&self) -> CanvasSnapshot {
        self.canvas.lock().await.snapshot()
    }

    async fn run(&self, user_message: &str) -> Result<RunSummary, AgentError> {
        let start = Instant::now();
        let max_iterations = self.config.max_tool_iterations();

        self.history.lock().await.push(Turn::user_text(user_message));
        self.events.emit(AgentEvent::RunStarted);

        let mut tool_calls: u32 = 0;

        for iteration in 0..max_iterations {
            debug!(iteration, "agent loop iteration");

            let request = self.build_request().await;
            let mut stream = self
                .provider
                .stream(&request, &self.credentials)
                .await
                .map_err(|e| AgentError::Provider(e.to_string()))?;

            let mut response_text = String::new();
            let mut tool_uses: Vec<ToolUseChunk> = Vec::new();
            let mut stop_reason: Option<String> = None;

            while let Some(chunk) = stream.next().await {
                let chunk = chunk.map_err(|e| AgentError::Provider(e.to_string()))?;
                if let Some(delta) = chunk.delta {
                    response_text.push_str(&delta);
                    self.events.emit(AgentEvent::AssistantTextDelta { delta });
                }
                if let Some(tool_use) = chunk.tool_use {
                    tool_uses.push(tool_use);
                }
                if let Some(reason) = chunk.stop_reason {
                    stop_reason = Some(reason);
                }
            }

            // Append the accumulated assistant turn, tool_use blocks included,
            // so the next model call sees its own requests.
            let mut content: Vec<ContentBlock> = Vec::new();
            if !response_text.is_empty() {
                content.push(ContentBlock::Text {
                    text: response_text.clone(),
                });
            }
            for tool_use in &tool_uses {
                let input: serde_json::Value =
                    serde_json::from_str(&tool_use.input_json).unwrap_or_else(|_| json!({}));
                content.push(ContentBlock::ToolUse {
                    id: tool_use.id.clone(),
                    name: tool_use.name.clone(),
                    input,
                });
            }
            if !content.is_empty() {
                self.history.lock().await.push(Turn::Assistant {
                    content,
                    timestamp: Utc::now(),
                });
            }

            let wants_tools = stop_reason
                .as_deref()
                .is_some_and(|r| self.provider.is_tool_use_stop(r));

            if !wants_tools || tool_uses.is_empty() {
                return Ok(RunSummary {
                    final_text: response_text,
                    iterations: iteration + 1,
                    tool_calls,
                    duration_ms: start.elapsed().as_millis() as u64,
                });
            }

            // Execute tools strictly sequentially, in the order received. The
            // canvas has a single writer; parallel execution would break it.
            for tool_use in tool_uses {
                tool_calls += 1;
                self.execute_tool(tool_use).await?;
            }
            // Loop: the model sees the new tool results next iteration.
        }

        Err(AgentError::IterationLimitExceeded {
            limit: max_iterations,
        })
    }

    async fn execute_tool(&self, tool_use: ToolUseChunk) -> Result<(), AgentError> {
        let ToolUseChunk {
            id,
            name,
            input_json,
        } = tool_use;
        // Some OpenAI-compatible backends omit ids; synthesize so tool_result
        // turns always pair up.
        let id = if id.is_empty() {
            format!("toolu_{}", uuid::Uuid::new_v4().simple())
        } else {
            id
        };
        let input: serde_json::Value = serde_json::from_str(&input_json).unwrap_or_else(|_| json!({}));

        info!(tool = %name, "executing tool");
        *self.run_state.write().await = RunState::ExecutingTool(name.clone());
        self.events.emit(AgentEvent::ToolStarted {
            name: name.clone(),
            args: input.clone(),
        });
        self.history.lock().await.push(Turn::ToolCall {
            tool: name.clone(),
            params: input.clone(),
            timestamp: Utc::now(),
        });

        let context = ToolContext {
            canvas: self.canvas.clone(),
            feedback: self.feedback.clone(),
            icons: self.icons.clone(),
            docs: self.docs.clone(),
            events: self.events.clone(),
        };

        let output = match self.tools.get(&name) {
            Some(tool) => {
                tool.execute(input, &context)
                    .await
                    .map_err(|e| AgentError::Tool {
                        name: name.clone(),
                        message: e.to_string(),
                    })?
            }
            // The model hallucinated a capability; tell it and keep going.
            None => ToolOutput {
                content: format!("Unknown tool: {name}"),
                is_error: true,
                images: Vec::new(),
            },
        };

        self.history.lock().await.push(Turn::ToolResult {
            tool_use_id: id,
            tool: name,
            content: output.content,
            is_error: output.is_error,
            images: output.images,
            timestamp: Utc::now(),
        });
        *self.run_state.write().await = RunState::AwaitingModel;

        Ok(())
    }

    async fn build_request(&self) -> CompletionRequest {
        let messages = {
            let history = self.history.lock().await;
            self.provider.format_messages(&history)
        };

        let definitions: Vec<ToolDefinition> = self
            .tools
            .tools()
            .iter()
            .map(|t| ToolDefinition {
                name: t.name().to_string(),
                description: t.description().to_string(),
                parameters_schema: t.parameters_schema(),
            })
            .collect();
        let tools = if definitions.is_empty() {
            None
        } else {
            Some(self.provider.format_tools(&definitions))
        };

        let canvas = self.canvas.lock().await.snapshot();
        let system = build_system_prompt(&self.config, &self.tools, &canvas);

        CompletionRequest {
            model: self.config.default_model(),
            messages,
            max_tokens: self.config.max_tokens(),
            temperature: self.config.temperature(),
            tools,
            system: Some(system),
        }
    }
}
