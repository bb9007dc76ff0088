//! replace_canvas tool — overwrite the diagram canvas and report the render.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use drawbridge_core::event::AgentEvent;

use crate::{Tool, ToolContext, ToolOutput};

/// The only write path to the canvas. Replaces the whole source (never a
/// patch), then routes the new content through the render feedback bridge so
/// the model sees the visual outcome as the tool result.
pub struct ReplaceCanvasTool;

#[derive(Deserialize)]
struct Params {
    content: String,
}

#[async_trait]
impl Tool for ReplaceCanvasTool {
    fn name(&self) -> &str {
        "replace_canvas"
    }

    fn description(&self) -> &str {
        "Replace the entire diagram canvas with new D2 source. The previous \
         content is discarded, so always send the complete diagram. The result \
         reports whether the new source rendered, attaching the rendered image \
         on success or the renderer's error message on failure."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "content": {
                    "type": "string",
                    "description": "Complete D2 source for the whole diagram"
                }
            },
            "required": ["content"]
        })
    }

    async fn execute(
        &self,
        params: serde_json::Value,
        context: &ToolContext,
    ) -> anyhow::Result<ToolOutput> {
        let p: Params = serde_json::from_value(params)?;

        let update_id = {
            let mut canvas = context.canvas.lock().await;
            canvas.replace(p.content.clone())
        };
        info!(update_id, bytes = p.content.len(), "canvas replaced");
        context.events.emit(AgentEvent::CanvasReplaced {
            update_id,
            content: p.content.clone(),
        });

        let feedback = context
            .feedback
            .on_canvas_replaced(&p.content, update_id, &context.events)
            .await;

        Ok(ToolOutput {
            content: feedback.text,
            is_error: false,
            images: feedback.image.into_iter().collect(),
        })
    }
}
