//! slide_update tool implementation.
//!
//! Applies a partial update to a stored slide using the ingestion merge rule.

use artarchive_core::{Archive, Candidate};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;

/// Parameters for the slide_update tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SlideUpdateParams {
    /// Identity key of the slide to update.
    pub guid_hash: String,

    /// Fields to overwrite. Absent fields keep their stored value.
    pub update: Candidate,
}

/// Implementation of the slide_update tool.
pub async fn update_impl(archive: &Archive, params: SlideUpdateParams) -> Result<CallToolResult, McpError> {
    let slide = archive.update_slide(&params.guid_hash, params.update).await?;
    json_result(&slide)
}
