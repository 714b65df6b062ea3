//! MCP tool implementations.
//!
//! This module contains all tools exposed by the artarchive server.

pub mod sites_list;
pub mod slide_get;
pub mod slide_render;
pub mod slide_update;
pub mod slides_ingest;
pub mod slides_list;

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use serde::Serialize;

pub use sites_list::sites_list_impl;
pub use slide_get::{SlideGetParams, get_impl};
pub use slide_render::{SlideRenderParams, render_impl};
pub use slide_update::{SlideUpdateParams, update_impl};
pub use slides_ingest::{SlidesIngestParams, ingest_impl};
pub use slides_list::{SlidesListParams, list_impl};

/// Wrap a tool output as pretty-printed JSON text content.
pub(crate) fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output)
        .map_err(|e| McpError::internal_error(format!("failed to serialize output: {e}"), None))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

/// Parse the JSON text content of a tool result back into a value.
#[cfg(test)]
pub(crate) fn output_json(result: &CallToolResult) -> serde_json::Value {
    let text = result.content.first().and_then(|c| c.as_text()).map(|t| t.text.clone()).unwrap();
    serde_json::from_str(&text).unwrap()
}
