use serde::{Deserialize, Serialize};

/// Content block in a conversation turn (text, image, tool_use, tool_result).
///
/// Mirrors the block model of the Anthropic Messages API so providers can
/// format multimodal turns without an intermediate representation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    Image {
        source: ImageSource,
    },
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
    ToolResult {
        tool_use_id: String,
        content: String,
        is_error: bool,
    },
}

/// Base64-encoded image payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageSource {
    #[serde(rename = "type")]
    pub source_type: String,
    pub media_type: String,
    pub data: String,
}

impl ImageSource {
    /// A base64 PNG source — the only raster format the render pipeline emits.
    pub fn png_base64(data: impl Into<String>) -> Self {
        Self {
            source_type: "base64".into(),
            media_type: "image/png".into(),
            data: data.into(),
        }
    }
}
