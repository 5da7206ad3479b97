//! sw_fetch tool implementation.
//!
//! Dispatches a fetch event through the worker. Requests the worker does not
//! intercept get default network handling.

use egecache_client::{FetchRequest, FetchResponse, Network, Worker, canonicalize};
use rmcp::{ErrorData as McpError, model::*};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::ToolError;

/// Input parameters for the sw_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwFetchParams {
    /// Absolute URL, or a path resolved against the site origin.
    pub url: String,

    /// Optional Accept header. Include `text/html` to fetch as a page navigation.
    #[serde(default)]
    pub accept: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct HeaderField {
    pub name: String,
    pub value: String,
}

/// Output structure for the sw_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwFetchOutput {
    /// The canonical request URL.
    pub url: String,
    pub status: u16,
    pub status_text: String,
    /// One of `network`, `cache`, `offline` or `passthrough`.
    pub source: String,
    pub headers: Vec<HeaderField>,
    /// Body size in bytes.
    pub body_bytes: usize,
    /// Body as text, when it is valid UTF-8.
    pub body: Option<String>,
    pub fetch_ms: u64,
}

impl SwFetchOutput {
    fn new(response: &FetchResponse, source: &str) -> Self {
        let headers = response
            .headers
            .iter()
            .filter_map(|(name, value)| {
                value.to_str().ok().map(|v| HeaderField { name: name.as_str().to_string(), value: v.to_string() })
            })
            .collect();

        Self {
            url: response.url.to_string(),
            status: response.status.as_u16(),
            status_text: response.status_text.clone(),
            source: source.to_string(),
            headers,
            body_bytes: response.bytes.len(),
            body: std::str::from_utf8(&response.bytes).ok().map(str::to_owned),
            fetch_ms: response.fetch_ms,
        }
    }
}

/// Implementation of the sw_fetch tool.
pub async fn fetch_impl(
    worker: &Worker, network: &dyn Network, params: SwFetchParams,
) -> Result<CallToolResult, McpError> {
    let url = canonicalize(&params.url, &worker.settings().origin).map_err(ToolError::from)?;

    let mut request = FetchRequest::get(url);
    if let Some(accept) = params.accept.as_deref() {
        request = request.with_accept(accept);
    }

    let output = match worker.handle_fetch(request.clone()).await {
        Some(response) => SwFetchOutput::new(&response, response.source.as_str()),
        None => {
            tracing::debug!(url = %request.url, "passing through to the network");
            let response = network.fetch(&request).await?;
            SwFetchOutput::new(&response, "passthrough")
        }
    };

    let json = serde_json::to_string_pretty(&output).map_err(ToolError::from)?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}
