//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.
use crate::tools::{
    SlideGetParams, SlideRenderParams, SlideUpdateParams, SlidesIngestParams, SlidesListParams, get_impl, ingest_impl,
    list_impl, render_impl, sites_list_impl, update_impl,
};

use std::sync::Arc;

use artarchive_core::{Archive, Error, IngestRouter, PipelineConfig};
use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};

/// The main MCP server handler for artarchive.
#[derive(Clone)]
pub struct ArtArchiveServer {
    archive: Archive,
    ingest: Arc<IngestRouter>,
    tool_router: ToolRouter<Self>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl ArtArchiveServer {
    /// Create a new server handler around an opened archive.
    ///
    /// Starts the ingestion workers shared by every `slides_ingest` call.
    pub fn new(archive: Archive, pipeline: PipelineConfig) -> Result<Self, Error> {
        let ingest = Arc::new(IngestRouter::spawn(archive.db().clone(), pipeline)?);
        Ok(Self { archive, ingest, tool_router: Self::tool_router() })
    }

    #[tool(description = "List archived slides in write order. Returns a page of slides and a cursor for the next page.")]
    async fn slides_list(&self, params: Parameters<SlidesListParams>) -> Result<CallToolResult, McpError> {
        list_impl(&self.archive, params.0).await
    }

    #[tool(description = "Get one archived slide by its guid_hash.")]
    async fn slide_get(&self, params: Parameters<SlideGetParams>) -> Result<CallToolResult, McpError> {
        get_impl(&self.archive, params.0).await
    }

    /// Partial update of a stored slide.
    ///
    /// Present fields overwrite, absent fields are kept.
    #[tool(description = "Update an archived slide. Fields present in `update` overwrite the stored values; absent fields are kept.")]
    async fn slide_update(&self, params: Parameters<SlideUpdateParams>) -> Result<CallToolResult, McpError> {
        update_impl(&self.archive, params.0).await
    }

    #[tool(description = "List the distinct source sites slides were archived from.")]
    async fn sites_list(&self) -> Result<CallToolResult, McpError> {
        sites_list_impl(&self.archive).await
    }

    #[tool(
        description = "Get the rendered artifact (kind \"blog\" or \"slide\") of a slide, rendering it if the stored one is stale. Content is base64."
    )]
    async fn slide_render(&self, params: Parameters<SlideRenderParams>) -> Result<CallToolResult, McpError> {
        render_impl(&self.archive, params.0).await
    }

    /// Ingest a batch of candidates through the bounded pipeline.
    #[tool(description = "Insert or merge slides. Returns one result per candidate, in input order.")]
    async fn slides_ingest(&self, params: Parameters<SlidesIngestParams>) -> Result<CallToolResult, McpError> {
        ingest_impl(&self.ingest, params.0).await
    }
}

impl ServerHandler for ArtArchiveServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "artarchive".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}
