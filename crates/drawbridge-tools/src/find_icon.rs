//! find_icon tool — search the icon catalog, with a rendered preview.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::{IconEntry, Tool, ToolContext, ToolOutput};

/// Upper bound on matches returned to the model.
const MAX_RESULTS: usize = 10;

pub struct FindIconTool;

#[derive(Deserialize)]
struct Params {
    query: String,
}

/// Format the match list the model reads.
fn format_matches(matches: &[IconEntry]) -> String {
    let mut out = String::new();
    for (i, entry) in matches.iter().enumerate() {
        out.push_str(&format!("{}. **{}**\n   {}\n", i + 1, entry.name, entry.url));
    }
    out
}

/// Build a small D2 arrangement showing each matched icon as an image shape.
fn preview_source(matches: &[IconEntry]) -> String {
    let mut source = String::from("direction: right\n");
    for (i, entry) in matches.iter().enumerate() {
        source.push_str(&format!(
            "icon{i}: \"{}\" {{\n  shape: image\n  icon: {}\n}}\n",
            entry.name.replace('"', "'"),
            entry.url
        ));
    }
    source
}

#[async_trait]
impl Tool for FindIconTool {
    fn name(&self) -> &str {
        "find_icon"
    }

    fn description(&self) -> &str {
        "Search the icon catalog by name (case-insensitive substring match, at \
         most 10 results). Returns icon names with their URLs for use in D2 \
         `icon:` attributes, plus a rendered preview of the matches when \
         available."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Icon name or fragment, e.g. 'S3' or 'postgres'"
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(
        &self,
        params: serde_json::Value,
        context: &ToolContext,
    ) -> anyhow::Result<ToolOutput> {
        let p: Params = serde_json::from_value(params)?;
        debug!(query = %p.query, "find_icon");

        let matches = context.icons.search(&p.query, MAX_RESULTS).await;
        if matches.is_empty() {
            // A miss is an answer the model can adapt to, not an error.
            return Ok(ToolOutput::text(format!(
                "No icons found matching '{}'. Try a shorter or more generic term.",
                p.query
            )));
        }

        let listing = format!(
            "Found {} icon(s) matching '{}':\n{}",
            matches.len(),
            p.query,
            format_matches(&matches)
        );

        match context.feedback.preview(&preview_source(&matches)).await {
            Some(image) => Ok(ToolOutput::with_image(
                format!("{listing}\nA preview of the matches is attached."),
                image,
            )),
            None => Ok(ToolOutput::text(listing)),
        }
    }
}
