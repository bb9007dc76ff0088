//! Built-in tool implementations for the Drawbridge agent loop.
//!
//! Tools are the capabilities exposed to the LLM during a run. The set is
//! closed and fixed at construction: `replace_canvas`, `find_icon`, and
//! `get_reference_doc`, each implementing the [`Tool`] trait and selected by
//! name through the [`ToolRegistry`].

use std::sync::Arc;

use async_trait::async_trait;

use drawbridge_canvas::{CanvasState, RenderFeedback};
use drawbridge_core::event::EventSink;
use drawbridge_core::types::ImageSource;

pub mod docs;
pub mod find_icon;
pub mod icons;
pub mod reference_doc;
pub mod replace_canvas;

pub use docs::DocLibrary;
pub use find_icon::FindIconTool;
pub use icons::{BuiltinIconIndex, IconEntry, IconIndex};
pub use reference_doc::ReferenceDocTool;
pub use replace_canvas::ReplaceCanvasTool;

/// Context provided to tools during execution.
///
/// The canvas handle is shared with the owning orchestrator; tool execution is
/// strictly sequential within the run loop, so the mutex is never contended
/// across tools.
pub struct ToolContext {
    pub canvas: Arc<tokio::sync::Mutex<CanvasState>>,
    pub feedback: Arc<RenderFeedback>,
    pub icons: Arc<dyn IconIndex>,
    pub docs: Arc<DocLibrary>,
    pub events: EventSink,
}

/// Output from a tool execution.
///
/// A recoverable domain condition ("no icons found", "render failed") is a
/// successful output whose text tells the model what happened; `is_error` is
/// reserved for conditions the tool could detect but not act on. Anything
/// returned as `Err` from [`Tool::execute`] aborts the whole run.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub content: String,
    pub is_error: bool,
    pub images: Vec<ImageSource>,
}

impl ToolOutput {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: false,
            images: Vec::new(),
        }
    }

    pub fn with_image(content: impl Into<String>, image: ImageSource) -> Self {
        Self {
            content: content.into(),
            is_error: false,
            images: vec![image],
        }
    }
}

/// The core tool trait. Every capability exposed to the model implements this.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name as exposed to the LLM (e.g., "replace_canvas").
    fn name(&self) -> &str;

    /// Human-readable description for the LLM.
    fn description(&self) -> &str;

    /// JSON Schema describing the tool's parameters.
    fn parameters_schema(&self) -> serde_json::Value;

    /// Execute the tool with the given parameters.
    async fn execute(
        &self,
        params: serde_json::Value,
        context: &ToolContext,
    ) -> anyhow::Result<ToolOutput>;
}

/// Registry of available tools, fixed at construction.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The standard three-tool set.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(ReplaceCanvasTool));
        registry.register(Box::new(FindIconTool));
        registry.register(Box::new(ReferenceDocTool));
        registry
    }

    pub fn register(&mut self, tool: Box<dyn Tool>) {
        self.tools.push(tool);
    }

    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools
            .iter()
            .find(|t| t.name() == name)
            .map(|t| t.as_ref())
    }

    pub fn list(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn tools(&self) -> &[Box<dyn Tool>] {
        &self.tools
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_registry_exposes_three_tools() {
        let registry = ToolRegistry::builtin();
        assert_eq!(
            registry.list(),
            vec!["replace_canvas", "find_icon", "get_reference_doc"]
        );
        assert!(registry.get("replace_canvas").is_some());
        assert!(registry.get("unknown_tool").is_none());
    }
}
