//! System prompt builder for the diagram agent.

use drawbridge_canvas::CanvasSnapshot;
use drawbridge_core::config::Config;
use drawbridge_tools::ToolRegistry;

const DEFAULT_IDENTITY: &str = "You are a diagramming assistant. You build and refine \
architecture diagrams written in the D2 declarative diagram language, one user request \
at a time.";

const GUIDANCE: &str = "Working rules:\n\
- The canvas holds the one current diagram. To change anything, call replace_canvas \
with the COMPLETE new D2 source; partial snippets overwrite the whole diagram.\n\
- After every replacement you receive the rendered result or the renderer's error. \
Inspect it and correct the diagram before giving your final answer.\n\
- Use find_icon to discover icon URLs before referencing them in the diagram.\n\
- Use get_reference_doc before writing syntax you are not certain about.\n\
- When the diagram matches the request, reply with a short confirmation and stop \
calling tools.";

/// Build the system prompt for one loop iteration.
///
/// The current canvas is injected each time so the model always reasons from
/// the real state rather than its memory of earlier turns.
pub fn build_system_prompt(config: &Config, tools: &ToolRegistry, canvas: &CanvasSnapshot) -> String {
    let mut parts = Vec::new();

    let identity = config.system_prompt_override().unwrap_or(DEFAULT_IDENTITY);
    parts.push(identity.to_string());

    let tool_names = tools.list();
    if !tool_names.is_empty() {
        parts.push(format!("Available tools: {}", tool_names.join(", ")));
    }

    if canvas.content.is_empty() {
        parts.push("The canvas is currently empty.".to_string());
    } else {
        parts.push(format!(
            "Current canvas (revision {}):\n```d2\n{}\n```",
            canvas.update_id, canvas.content
        ));
    }

    parts.push(GUIDANCE.to_string());

    parts.join("\n\n")
}
