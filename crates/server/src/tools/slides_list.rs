//! slides_list tool implementation.
//!
//! Pages through every stored slide in write order.

use artarchive_core::{Archive, Cursor, Error};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;

const MAX_LIMIT: usize = 500;

/// Parameters for the slides_list tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct SlidesListParams {
    /// Cursor returned by a previous call; omit to start from the beginning.
    #[serde(default)]
    pub cursor: Option<Cursor>,

    /// Maximum slides to return (default: 50, max: 500).
    #[serde(default)]
    pub limit: Option<usize>,
}

/// Implementation of the slides_list tool.
pub async fn list_impl(archive: &Archive, params: SlidesListParams) -> Result<CallToolResult, McpError> {
    let limit = params.limit.unwrap_or(50);
    if limit == 0 || limit > MAX_LIMIT {
        return Err(Error::InvalidInput(format!("limit must be between 1 and {MAX_LIMIT}")).into());
    }

    let page = archive.list_slides(params.cursor, limit).await?;
    json_result(&page)
}
