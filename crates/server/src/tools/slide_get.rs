//! slide_get tool implementation.
//!
//! Retrieves one slide by GUID hash.

use artarchive_core::Archive;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;

/// Parameters for the slide_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SlideGetParams {
    /// Identity key of the slide.
    pub guid_hash: String,
}

/// Implementation of the slide_get tool.
pub async fn get_impl(archive: &Archive, params: SlideGetParams) -> Result<CallToolResult, McpError> {
    let slide = archive.get_slide(&params.guid_hash).await?;
    json_result(&slide)
}
