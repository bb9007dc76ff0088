//! Canvas state — the single current diagram source.

use serde::{Deserialize, Serialize};

/// The one mutable diagram "canvas" of a conversation.
///
/// At most one value is current at any time; [`replace`](CanvasState::replace)
/// swaps content and update id together, so observers never see a half-written
/// state. The update counter is scoped to the owning orchestrator instance,
/// never shared process-wide.
#[derive(Debug, Default)]
pub struct CanvasState {
    content: String,
    update_id: u64,
}

/// Immutable view of the canvas at a point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanvasSnapshot {
    pub content: String,
    pub update_id: u64,
}

impl CanvasState {
    /// An empty canvas. The first replacement gets update id 1.
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the canvas entirely (never a patch or merge) and return the
    /// newly assigned update id. Ids are strictly increasing.
    pub fn replace(&mut self, content: String) -> u64 {
        self.update_id += 1;
        self.content = content;
        self.update_id
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn update_id(&self) -> u64 {
        self.update_id
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    pub fn snapshot(&self) -> CanvasSnapshot {
        CanvasSnapshot {
            content: self.content.clone(),
            update_id: self.update_id,
        }
    }
}
