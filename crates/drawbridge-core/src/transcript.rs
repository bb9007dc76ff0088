//! Conversation history — an ordered, append-only sequence of turns.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{ContentBlock, ImageSource};

/// One atomic unit of conversation history.
///
/// History is never reordered or mutated in place; corrections happen only by
/// appending new turns. One orchestrator instance owns the history exclusively
/// for the lifetime of one conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Turn {
    User {
        content: Vec<ContentBlock>,
        timestamp: DateTime<Utc>,
    },
    Assistant {
        content: Vec<ContentBlock>,
        timestamp: DateTime<Utc>,
    },
    ToolCall {
        tool: String,
        params: serde_json::Value,
        timestamp: DateTime<Utc>,
    },
    ToolResult {
        tool_use_id: String,
        tool: String,
        content: String,
        is_error: bool,
        /// Render feedback and icon previews ride along as images.
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        images: Vec<ImageSource>,
        timestamp: DateTime<Utc>,
    },
}

impl Turn {
    pub fn user_text(text: impl Into<String>) -> Self {
        Turn::User {
            content: vec![ContentBlock::Text { text: text.into() }],
            timestamp: Utc::now(),
        }
    }

    /// Structural tag, ignoring timestamps. Used by replay comparisons.
    pub fn kind(&self) -> &'static str {
        match self {
            Turn::User { .. } => "user",
            Turn::Assistant { .. } => "assistant",
            Turn::ToolCall { .. } => "tool_call",
            Turn::ToolResult { .. } => "tool_result",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_turn_tags() {
        let turn = Turn::user_text("draw a vpc");
        assert_eq!(turn.kind(), "user");
        let json = serde_json::to_value(&turn).unwrap();
        assert_eq!(json["type"], "user");
        assert_eq!(json["content"][0]["text"], "draw a vpc");
    }

    #[test]
    fn test_tool_result_images_skipped_when_empty() {
        let turn = Turn::ToolResult {
            tool_use_id: "toolu_1".into(),
            tool: "find_icon".into(),
            content: "No icons found".into(),
            is_error: false,
            images: Vec::new(),
            timestamp: Utc::now(),
        };
        let json = serde_json::to_value(&turn).unwrap();
        assert!(json.get("images").is_none());
    }
}
