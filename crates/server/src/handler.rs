//! MCP server handler implementation.
//!
//! Routes tool calls to the worker and the cache partitions behind it.
use std::sync::Arc;

use crate::tools::cache::{CacheMatchParams, keys_impl, match_impl};
use crate::tools::fetch::{SwFetchParams, fetch_impl};

use egecache_client::{Network, Worker};
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

/// What the tools operate on: an active worker and the network it falls
/// back to for requests it does not intercept.
pub struct AppState {
    pub worker: Worker,
    pub network: Arc<dyn Network>,
}

#[derive(Clone)]
pub struct EgecacheServer {
    state: Arc<AppState>,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl EgecacheServer {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state, tool_router: Self::tool_router() }
    }

    #[tool(
        description = "Dispatch a GET fetch event through the offline worker. Returns status, source (network, cache, offline or passthrough), headers and body."
    )]
    async fn sw_fetch(&self, params: Parameters<SwFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.state.worker, self.state.network.as_ref(), params.0).await
    }

    #[tool(description = "List cache partitions with their kind, version and entry count.")]
    async fn cache_keys(&self) -> Result<CallToolResult, McpError> {
        let store = self.state.worker.store();
        keys_impl(store.cache(), store.version()).await
    }

    #[tool(description = "Look up the stored entry for a URL in the partition it is routed to. Never uses the network.")]
    async fn cache_match(&self, params: Parameters<CacheMatchParams>) -> Result<CallToolResult, McpError> {
        match_impl(&self.state.worker, params.0).await
    }
}

impl ServerHandler for EgecacheServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "egecache".into(),
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::{StubNetwork, active_worker};
    use egecache_core::CacheDb;

    #[tokio::test]
    async fn test_lists_all_tools() {
        let cache = CacheDb::open_in_memory().await.unwrap();
        let network = StubNetwork::site();
        let worker = active_worker(&cache, &network).await;
        let server = EgecacheServer::new(Arc::new(AppState { worker, network }));

        let mut names: Vec<String> = server.tool_router.list_all().into_iter().map(|t| t.name.to_string()).collect();
        names.sort();
        assert_eq!(names, vec!["cache_keys", "cache_match", "sw_fetch"]);
    }
}
