//! cache_match tool implementation.
//!
//! Classifies a URL and reports what its partition holds for it.

use egecache_client::{Worker, canonicalize};
use egecache_core::Error;
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::ToolError;
use crate::tools::fetch::HeaderField;

/// Parameters for the cache_match tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheMatchParams {
    /// Absolute URL, or a path resolved against the site origin.
    pub url: String,
}

/// Output from the cache_match tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheMatchOutput {
    pub url: String,
    pub partition: String,
    pub strategy: String,
    pub status: u16,
    pub status_text: String,
    pub headers: Vec<HeaderField>,
    pub body_bytes: usize,
    /// RFC 3339 timestamp of the write.
    pub stored_at: String,
    /// The entry's `Date` header, if it parses.
    pub date: Option<String>,
}

/// Implementation of the cache_match tool.
pub async fn match_impl(worker: &Worker, params: CacheMatchParams) -> Result<CallToolResult, McpError> {
    let url = canonicalize(&params.url, &worker.settings().origin).map_err(ToolError::from)?;
    let route = worker.settings().classifier.route(&url);
    let partition = worker.store().partition(route.partition);

    let entry = worker
        .store()
        .cache()
        .match_entry(&partition, "GET", url.as_str())
        .await?
        .ok_or_else(|| Error::CacheMiss(format!("{url} not in {partition}")))?;

    let output = CacheMatchOutput {
        url: entry.url.clone(),
        partition: partition.name(),
        strategy: route.strategy.name().to_string(),
        status: entry.status,
        status_text: entry.status_text.clone(),
        headers: entry
            .headers
            .iter()
            .map(|(name, value)| HeaderField { name: name.clone(), value: value.clone() })
            .collect(),
        body_bytes: entry.body.len(),
        date: entry.date().map(|d| d.to_rfc3339()),
        stored_at: entry.stored_at,
    };

    let json = serde_json::to_string_pretty(&output).map_err(ToolError::from)?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::{StubNetwork, active_worker, output_json, site};
    use egecache_core::CacheDb;

    #[tokio::test]
    async fn test_match_precached_entry() {
        let cache = CacheDb::open_in_memory().await.unwrap();
        let network = StubNetwork::site();
        let worker = active_worker(&cache, &network).await;

        let result = match_impl(&worker, CacheMatchParams { url: "/offline.html".into() }).await.unwrap();
        let output = output_json(&result);
        assert_eq!(output["url"], site("/offline.html"));
        assert_eq!(output["partition"], "page-cache-v3");
        assert_eq!(output["strategy"], "stale-while-revalidate");
        assert_eq!(output["status"], 200);
    }

    #[tokio::test]
    async fn test_match_miss() {
        let cache = CacheDb::open_in_memory().await.unwrap();
        let network = StubNetwork::site();
        let worker = active_worker(&cache, &network).await;

        let err = match_impl(&worker, CacheMatchParams { url: "/images/hero.jpg".into() })
            .await
            .unwrap_err();
        assert_eq!(err.code.0, -32001);
        assert!(err.message.contains("image-cache-v3"));
    }
}
