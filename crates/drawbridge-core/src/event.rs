//! Typed lifecycle events emitted during an agent run.
//!
//! One orchestrator owns one [`EventSink`]; the matching receiver is handed to
//! a single observer at construction time. Delivery is ordered and at most
//! once — there is no buffering or replay, so a late-registering observer
//! misses prior events.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::trace;

/// Events emitted by the orchestrator during a run.
///
/// For a single user request the partial order is fixed: `run_started` first,
/// `run_completed` or `run_failed` last, and `canvas_replaced` for update id
/// *k* always precedes `render_completed` referencing *k*.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    RunStarted,

    /// Streaming chunk of assistant text.
    AssistantTextDelta { delta: String },

    ToolStarted {
        name: String,
        args: serde_json::Value,
    },

    /// The canvas was overwritten with new diagram source.
    CanvasReplaced { update_id: u64, content: String },

    /// Outcome of rendering the canvas content for update `update_id`.
    RenderCompleted {
        update_id: u64,
        success: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },

    RunFailed {
        kind: FailureKind,
        message: String,
    },

    RunCompleted,
}

/// Coarse classification of a failed run, surfaced so callers can decide
/// whether to retry, simplify the request, or raise the iteration cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Model/network failure or malformed tool arguments.
    Protocol,
    /// A tool invocation returned an error.
    Tool,
    /// The model never converged to a final answer.
    IterationLimit,
}

/// Sending half of the event channel.
///
/// Cloneable so the tool execution path can emit `canvas_replaced` and
/// `render_completed` from within the orchestrator's (sequential) loop.
/// A dropped receiver is tolerated; events are then discarded.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::UnboundedSender<AgentEvent>,
}

impl EventSink {
    /// Create a sink and the single observer's receiving end.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<AgentEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// A sink with no observer. Events go nowhere.
    pub fn disconnected() -> Self {
        let (tx, _rx) = mpsc::unbounded_channel();
        Self { tx }
    }

    pub fn emit(&self, event: AgentEvent) {
        if self.tx.send(event).is_err() {
            trace!("event observer dropped, discarding event");
        }
    }
}
