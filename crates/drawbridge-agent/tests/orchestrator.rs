//! Orchestrator integration tests with deterministic scripted collaborators.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex as StdMutex};

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::{Notify, mpsc};

use drawbridge_agent::{AgentError, AgentEvent, FailureKind, Orchestrator, RunState};
use drawbridge_core::config::{AgentConfig, Config};
use drawbridge_core::transcript::Turn;
use drawbridge_providers::{
    ChunkStream, CompletionChunk, CompletionRequest, Credentials, LlmProvider, ToolDefinition,
    ToolUseChunk,
};
use drawbridge_render::{DiagramRenderer, RasterConverter, RenderError};

// --- Scripted collaborators ---

/// Replays canned chunk sequences, one per model call, then the fallback.
struct ScriptedProvider {
    scripts: StdMutex<VecDeque<Vec<CompletionChunk>>>,
    fallback: Option<Vec<CompletionChunk>>,
}

impl ScriptedProvider {
    fn new(scripts: Vec<Vec<CompletionChunk>>) -> Self {
        Self {
            scripts: StdMutex::new(scripts.into()),
            fallback: None,
        }
    }

    fn looping(fallback: Vec<CompletionChunk>) -> Self {
        Self {
            scripts: StdMutex::new(VecDeque::new()),
            fallback: Some(fallback),
        }
    }
}

fn text_response(text: &str) -> Vec<CompletionChunk> {
    vec![
        CompletionChunk {
            delta: Some(text.to_string()),
            ..Default::default()
        },
        CompletionChunk {
            stop_reason: Some("end_turn".into()),
            ..Default::default()
        },
    ]
}

fn tool_response(name: &str, args: serde_json::Value) -> Vec<CompletionChunk> {
    vec![
        CompletionChunk {
            tool_use: Some(ToolUseChunk {
                id: format!("toolu_{name}"),
                name: name.to_string(),
                input_json: args.to_string(),
            }),
            ..Default::default()
        },
        CompletionChunk {
            stop_reason: Some("tool_use".into()),
            ..Default::default()
        },
    ]
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn id(&self) -> &str {
        "scripted"
    }

    fn format_messages(&self, history: &[Turn]) -> Vec<serde_json::Value> {
        history
            .iter()
            .map(|t| serde_json::to_value(t).unwrap())
            .collect()
    }

    fn format_tools(&self, tools: &[ToolDefinition]) -> Vec<serde_json::Value> {
        tools.iter().map(|t| json!({"name": t.name})).collect()
    }

    fn is_tool_use_stop(&self, stop_reason: &str) -> bool {
        stop_reason == "tool_use"
    }

    async fn stream(
        &self,
        _request: &CompletionRequest,
        _credentials: &Credentials,
    ) -> anyhow::Result<ChunkStream> {
        let chunks = self
            .scripts
            .lock()
            .unwrap()
            .pop_front()
            .or_else(|| self.fallback.clone())
            .unwrap_or_default();
        Ok(Box::pin(futures::stream::iter(chunks.into_iter().map(Ok))))
    }
}

/// Blocks each model call until released, to observe an in-flight run.
struct GatedProvider {
    release: Notify,
}

#[async_trait]
impl LlmProvider for GatedProvider {
    fn id(&self) -> &str {
        "gated"
    }

    fn format_messages(&self, _history: &[Turn]) -> Vec<serde_json::Value> {
        Vec::new()
    }

    fn format_tools(&self, _tools: &[ToolDefinition]) -> Vec<serde_json::Value> {
        Vec::new()
    }

    fn is_tool_use_stop(&self, stop_reason: &str) -> bool {
        stop_reason == "tool_use"
    }

    async fn stream(
        &self,
        _request: &CompletionRequest,
        _credentials: &Credentials,
    ) -> anyhow::Result<ChunkStream> {
        self.release.notified().await;
        Ok(Box::pin(futures::stream::iter(
            text_response("released").into_iter().map(Ok),
        )))
    }
}

/// Fails every model call at the transport level.
struct FailingProvider;

#[async_trait]
impl LlmProvider for FailingProvider {
    fn id(&self) -> &str {
        "failing"
    }

    fn format_messages(&self, _history: &[Turn]) -> Vec<serde_json::Value> {
        Vec::new()
    }

    fn format_tools(&self, _tools: &[ToolDefinition]) -> Vec<serde_json::Value> {
        Vec::new()
    }

    fn is_tool_use_stop(&self, _stop_reason: &str) -> bool {
        false
    }

    async fn stream(
        &self,
        _request: &CompletionRequest,
        _credentials: &Credentials,
    ) -> anyhow::Result<ChunkStream> {
        anyhow::bail!("connection refused")
    }
}

struct StubRenderer {
    fail: bool,
}

#[async_trait]
impl DiagramRenderer for StubRenderer {
    async fn render(&self, _source: &str) -> Result<Vec<u8>, RenderError> {
        if self.fail {
            Err(RenderError::Diagram {
                message: "unexpected eof".into(),
            })
        } else {
            Ok(b"<svg/>".to_vec())
        }
    }
}

struct StubConverter;

#[async_trait]
impl RasterConverter for StubConverter {
    async fn to_raster_base64(&self, _image: &[u8]) -> anyhow::Result<String> {
        Ok("cGln".into())
    }
}

fn build(
    provider: Arc<dyn LlmProvider>,
    fail_render: bool,
    config: Config,
) -> (Arc<Orchestrator>, mpsc::UnboundedReceiver<AgentEvent>) {
    let (orchestrator, rx) = Orchestrator::new(
        config,
        provider,
        Credentials::ApiKey {
            api_key: "test-key".into(),
        },
        Arc::new(StubRenderer { fail: fail_render }),
        Arc::new(StubConverter),
    );
    (Arc::new(orchestrator), rx)
}

fn drain(rx: &mut mpsc::UnboundedReceiver<AgentEvent>) -> Vec<AgentEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

fn kinds(history: &[Turn]) -> Vec<&'static str> {
    history.iter().map(Turn::kind).collect()
}

// --- Tests ---

#[tokio::test]
async fn test_plain_text_run_completes() {
    let provider = Arc::new(ScriptedProvider::new(vec![text_response("Here you go.")]));
    let (orchestrator, mut rx) = build(provider, false, Config::default());

    let summary = orchestrator.submit("say hi").await.unwrap();
    assert_eq!(summary.final_text, "Here you go.");
    assert_eq!(summary.iterations, 1);
    assert_eq!(summary.tool_calls, 0);

    assert_eq!(kinds(&orchestrator.history().await), vec!["user", "assistant"]);
    assert_eq!(orchestrator.run_state().await, RunState::Idle);

    let events = drain(&mut rx);
    assert!(matches!(events.first(), Some(AgentEvent::RunStarted)));
    assert!(matches!(events.last(), Some(AgentEvent::RunCompleted)));
    assert!(
        events
            .iter()
            .any(|e| matches!(e, AgentEvent::AssistantTextDelta { delta } if delta == "Here you go."))
    );
}

#[tokio::test]
async fn test_tool_loop_replaces_canvas_and_feeds_back() {
    let provider = Arc::new(ScriptedProvider::new(vec![
        tool_response("replace_canvas", json!({"content": "a -> b"})),
        text_response("Done."),
    ]));
    let (orchestrator, mut rx) = build(provider, false, Config::default());

    let summary = orchestrator.submit("connect a to b").await.unwrap();
    assert_eq!(summary.tool_calls, 1);
    assert_eq!(summary.iterations, 2);

    let canvas = orchestrator.canvas().await;
    assert_eq!(canvas.content, "a -> b");
    assert_eq!(canvas.update_id, 1);

    let history = orchestrator.history().await;
    assert_eq!(
        kinds(&history),
        vec!["user", "assistant", "tool_call", "tool_result", "assistant"]
    );
    // The render feedback image rides on the tool result turn.
    match &history[3] {
        Turn::ToolResult {
            content, images, ..
        } => {
            assert!(content.contains("rendered successfully"));
            assert_eq!(images.len(), 1);
        }
        other => panic!("expected tool_result, got {other:?}"),
    }

    let events = drain(&mut rx);
    assert!(matches!(events.first(), Some(AgentEvent::RunStarted)));
    assert!(matches!(events.last(), Some(AgentEvent::RunCompleted)));
    assert!(events.iter().any(
        |e| matches!(e, AgentEvent::ToolStarted { name, .. } if name == "replace_canvas")
    ));

    let replaced_at = events
        .iter()
        .position(|e| matches!(e, AgentEvent::CanvasReplaced { update_id: 1, .. }))
        .expect("canvas_replaced emitted");
    let rendered_at = events
        .iter()
        .position(|e| matches!(
            e,
            AgentEvent::RenderCompleted { update_id: 1, success: true, .. }
        ))
        .expect("render_completed emitted");
    assert!(replaced_at < rendered_at);
}

#[tokio::test]
async fn test_iteration_cap_stops_at_exactly_ten() {
    let provider = Arc::new(ScriptedProvider::looping(tool_response(
        "replace_canvas",
        json!({"content": "x"}),
    )));
    let (orchestrator, mut rx) = build(provider, false, Config::default());

    let err = orchestrator.submit("loop forever").await.unwrap_err();
    assert!(matches!(err, AgentError::IterationLimitExceeded { limit: 10 }));

    // One replace_canvas per iteration: exactly 10, never 11.
    assert_eq!(orchestrator.canvas().await.update_id, 10);
    assert_eq!(orchestrator.run_state().await, RunState::Idle);

    let events = drain(&mut rx);
    assert!(matches!(
        events.last(),
        Some(AgentEvent::RunFailed {
            kind: FailureKind::IterationLimit,
            ..
        })
    ));
}

#[tokio::test]
async fn test_configured_cap_is_respected() {
    let config = Config {
        agent: Some(AgentConfig {
            max_tool_iterations: Some(3),
            ..Default::default()
        }),
        ..Default::default()
    };
    let provider = Arc::new(ScriptedProvider::looping(tool_response(
        "replace_canvas",
        json!({"content": "x"}),
    )));
    let (orchestrator, _rx) = build(provider, false, config);

    let err = orchestrator.submit("loop").await.unwrap_err();
    assert!(matches!(err, AgentError::IterationLimitExceeded { limit: 3 }));
    assert_eq!(orchestrator.canvas().await.update_id, 3);
}

#[tokio::test]
async fn test_render_failure_is_recoverable() {
    let provider = Arc::new(ScriptedProvider::new(vec![
        tool_response("replace_canvas", json!({"content": "a ->"})),
        text_response("Let me fix that."),
    ]));
    let (orchestrator, mut rx) = build(provider, true, Config::default());

    // The run itself succeeds; the render failure is data.
    orchestrator.submit("draw something broken").await.unwrap();

    // The canvas update still happened.
    let canvas = orchestrator.canvas().await;
    assert_eq!(canvas.content, "a ->");
    assert_eq!(canvas.update_id, 1);

    let history = orchestrator.history().await;
    match &history[3] {
        Turn::ToolResult {
            content,
            is_error,
            images,
            ..
        } => {
            assert!(!is_error);
            assert!(content.contains("rendering failed"));
            assert!(content.contains("unexpected eof"));
            assert!(images.is_empty());
        }
        other => panic!("expected tool_result, got {other:?}"),
    }

    let events = drain(&mut rx);
    assert!(events.iter().any(|e| matches!(
        e,
        AgentEvent::RenderCompleted {
            update_id: 1,
            success: false,
            error: Some(_),
        }
    )));
    assert!(matches!(events.last(), Some(AgentEvent::RunCompleted)));
}

#[tokio::test]
async fn test_submit_while_running_rejected_without_side_effects() {
    let provider = Arc::new(GatedProvider {
        release: Notify::new(),
    });
    let (orchestrator, mut rx) = build(provider.clone(), false, Config::default());

    let first = tokio::spawn({
        let orchestrator = orchestrator.clone();
        async move { orchestrator.submit("first").await }
    });

    // Wait for the first run to actually start.
    while orchestrator.run_state().await == RunState::Idle {
        tokio::task::yield_now().await;
    }

    let err = orchestrator.submit("second").await.unwrap_err();
    assert!(matches!(err, AgentError::AlreadyRunning));
    // The rejected call appended nothing.
    assert_eq!(orchestrator.history().await.len(), 1);

    provider.release.notify_one();
    first.await.unwrap().unwrap();

    // Exactly one run's worth of lifecycle events.
    let events = drain(&mut rx);
    let starts = events
        .iter()
        .filter(|e| matches!(e, AgentEvent::RunStarted))
        .count();
    assert_eq!(starts, 1);
    assert_eq!(kinds(&orchestrator.history().await), vec!["user", "assistant"]);
}

#[tokio::test]
async fn test_history_is_append_only_across_submits() {
    let provider = Arc::new(ScriptedProvider::new(vec![
        text_response("one"),
        text_response("two"),
    ]));
    let (orchestrator, _rx) = build(provider, false, Config::default());

    orchestrator.submit("first").await.unwrap();
    let after_first = orchestrator.history().await;

    orchestrator.submit("second").await.unwrap();
    let after_second = orchestrator.history().await;

    assert!(after_second.len() >= after_first.len());
    let first_json = serde_json::to_value(&after_first).unwrap();
    let prefix_json = serde_json::to_value(&after_second[..after_first.len()]).unwrap();
    assert_eq!(first_json, prefix_json, "earlier turns were mutated");
}

#[tokio::test]
async fn test_provider_failure_preserves_history_and_allows_retry() {
    let provider = Arc::new(FailingProvider);
    let (orchestrator, mut rx) = build(provider, false, Config::default());

    let err = orchestrator.submit("please draw").await.unwrap_err();
    assert!(matches!(err, AgentError::Provider(_)));
    assert_eq!(err.failure_kind(), FailureKind::Protocol);

    // The user turn stays; a later submit continues from it.
    assert_eq!(kinds(&orchestrator.history().await), vec!["user"]);
    assert_eq!(orchestrator.run_state().await, RunState::Idle);

    let events = drain(&mut rx);
    assert!(matches!(
        events.last(),
        Some(AgentEvent::RunFailed {
            kind: FailureKind::Protocol,
            ..
        })
    ));
}

#[tokio::test]
async fn test_malformed_tool_arguments_fail_the_run() {
    let provider = Arc::new(ScriptedProvider::new(vec![tool_response(
        "replace_canvas",
        json!({"wrong_field": 1}),
    )]));
    let (orchestrator, mut rx) = build(provider, false, Config::default());

    let err = orchestrator.submit("draw").await.unwrap_err();
    assert!(matches!(err, AgentError::Tool { .. }));

    // Partial progress is preserved: the invocation made it into history.
    let history = orchestrator.history().await;
    assert_eq!(kinds(&history), vec!["user", "assistant", "tool_call"]);
    assert_eq!(orchestrator.run_state().await, RunState::Idle);

    let events = drain(&mut rx);
    assert!(matches!(
        events.last(),
        Some(AgentEvent::RunFailed {
            kind: FailureKind::Tool,
            ..
        })
    ));
}

#[tokio::test]
async fn test_unknown_tool_is_reported_not_fatal() {
    let provider = Arc::new(ScriptedProvider::new(vec![
        tool_response("make_coffee", json!({})),
        text_response("No such tool, sorry."),
    ]));
    let (orchestrator, _rx) = build(provider, false, Config::default());

    orchestrator.submit("coffee please").await.unwrap();

    let history = orchestrator.history().await;
    match &history[3] {
        Turn::ToolResult {
            content, is_error, ..
        } => {
            assert!(is_error);
            assert!(content.contains("Unknown tool"));
        }
        other => panic!("expected tool_result, got {other:?}"),
    }
}

#[tokio::test]
async fn test_replay_is_structurally_identical_with_offset_ids() {
    let script = || {
        vec![
            tool_response("replace_canvas", json!({"content": "x -> y"})),
            text_response("ok"),
        ]
    };

    // Fresh orchestrator.
    let (fresh, mut fresh_rx) = build(
        Arc::new(ScriptedProvider::new(script())),
        false,
        Config::default(),
    );
    fresh.submit("draw x to y").await.unwrap();
    let fresh_history = fresh.history().await;
    let fresh_ids: Vec<u64> = drain(&mut fresh_rx)
        .iter()
        .filter_map(|e| match e {
            AgentEvent::CanvasReplaced { update_id, .. } => Some(*update_id),
            _ => None,
        })
        .collect();

    // Same conversation on an orchestrator whose canvas carried prior state.
    let mut seeded_scripts = vec![
        tool_response("replace_canvas", json!({"content": "seed"})),
        text_response("seeded"),
    ];
    seeded_scripts.extend(script());
    let (seeded, mut seeded_rx) = build(
        Arc::new(ScriptedProvider::new(seeded_scripts)),
        false,
        Config::default(),
    );
    seeded.submit("seed the canvas").await.unwrap();
    let seed_len = seeded.history().await.len();
    drain(&mut seeded_rx);

    seeded.submit("draw x to y").await.unwrap();
    let seeded_tail = seeded.history().await.split_off(seed_len);
    let seeded_ids: Vec<u64> = drain(&mut seeded_rx)
        .iter()
        .filter_map(|e| match e {
            AgentEvent::CanvasReplaced { update_id, .. } => Some(*update_id),
            _ => None,
        })
        .collect();

    // Same structure...
    assert_eq!(kinds(&fresh_history), kinds(&seeded_tail));
    // ...with update ids shifted by a constant offset (the seed replacement).
    assert_eq!(fresh_ids.len(), seeded_ids.len());
    for (fresh_id, seeded_id) in fresh_ids.iter().zip(&seeded_ids) {
        assert_eq!(seeded_id - fresh_id, 1);
    }
    assert_eq!(fresh.canvas().await.content, seeded.canvas().await.content);
}

#[tokio::test]
async fn test_reset_clears_history_and_canvas() {
    let provider = Arc::new(ScriptedProvider::new(vec![
        tool_response("replace_canvas", json!({"content": "a"})),
        text_response("done"),
        text_response("fresh start"),
    ]));
    let (orchestrator, _rx) = build(provider, false, Config::default());

    orchestrator.submit("draw a").await.unwrap();
    assert_eq!(orchestrator.canvas().await.update_id, 1);

    orchestrator.reset().await.unwrap();
    assert!(orchestrator.history().await.is_empty());
    let canvas = orchestrator.canvas().await;
    assert_eq!(canvas.update_id, 0);
    assert!(canvas.content.is_empty());

    // The counter restarts with the new canvas state.
    orchestrator.submit("hello again").await.unwrap();
    assert_eq!(orchestrator.canvas().await.update_id, 0);
}
