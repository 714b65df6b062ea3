//! slide_render tool implementation.
//!
//! Serves the rendered artifact of a slide, rendering it when the stored one
//! is stale.

use artarchive_core::{Archive, CacheStatus, RenderKind, RenderOutcome};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;

/// Parameters for the slide_render tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SlideRenderParams {
    /// Identity key of the slide.
    pub guid_hash: String,

    /// Render kind: "blog" or "slide".
    pub kind: RenderKind,
}

/// Output from the slide_render tool.
#[derive(Debug, Clone, Serialize)]
pub struct SlideRenderOutput {
    pub guid_hash: String,
    pub kind: RenderKind,
    /// `hit` when the stored artifact was current.
    pub cache: CacheStatus,
    /// Whether the artifact was rendered by this call.
    pub rendered: bool,
    /// Content fingerprint the artifact is versioned by.
    pub token: String,
    /// Artifact bytes, base64-encoded; absent when nothing could be rendered.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_base64: Option<String>,
}

/// Implementation of the slide_render tool.
pub async fn render_impl(archive: &Archive, params: SlideRenderParams) -> Result<CallToolResult, McpError> {
    let outcome = archive.render_slide(&params.guid_hash, params.kind).await?;

    let output = SlideRenderOutput {
        guid_hash: params.guid_hash,
        kind: params.kind,
        cache: outcome.status(),
        rendered: matches!(outcome, RenderOutcome::Rendered { .. }),
        token: outcome.token().to_string(),
        content_base64: outcome.bytes().map(|bytes| STANDARD.encode(bytes)),
    };
    json_result(&output)
}
