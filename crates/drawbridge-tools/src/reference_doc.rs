//! get_reference_doc tool — keyword lookup against the fixed doc library.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::{Tool, ToolContext, ToolOutput};

pub struct ReferenceDocTool;

#[derive(Deserialize)]
struct Params {
    keyword: String,
}

#[async_trait]
impl Tool for ReferenceDocTool {
    fn name(&self) -> &str {
        "get_reference_doc"
    }

    fn description(&self) -> &str {
        "Look up reference documentation for a D2 language topic by keyword \
         (e.g. 'connections', 'sql-tables', 'styles'). Consult this before \
         using syntax you are not sure about."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "keyword": {
                    "type": "string",
                    "description": "Topic keyword, e.g. 'shapes' or 'connections'"
                }
            },
            "required": ["keyword"]
        })
    }

    async fn execute(
        &self,
        params: serde_json::Value,
        context: &ToolContext,
    ) -> anyhow::Result<ToolOutput> {
        let p: Params = serde_json::from_value(params)?;
        debug!(keyword = %p.keyword, "get_reference_doc");

        match context.docs.resolve(&p.keyword) {
            Some(doc) => Ok(ToolOutput::text(doc)),
            None => Ok(ToolOutput::text(format!(
                "Unknown keyword '{}'. Valid keywords: {}.",
                p.keyword,
                context.docs.keywords().join(", ")
            ))),
        }
    }
}
