//! cache_keys tool implementation.
//!
//! Lists every cache partition with its entry count.

use egecache_core::{CacheDb, PartitionKind};
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::ToolError;

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PartitionSummary {
    pub name: String,
    pub kind: PartitionKind,
    pub version: String,
    pub entries: u64,
    /// Whether the partition belongs to the running worker's version.
    pub active: bool,
}

/// Output from the cache_keys tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheKeysOutput {
    pub version: String,
    pub partitions: Vec<PartitionSummary>,
}

/// Implementation of the cache_keys tool.
pub async fn keys_impl(cache: &CacheDb, version: &str) -> Result<CallToolResult, McpError> {
    let partitions = cache
        .list_partitions()
        .await?
        .into_iter()
        .map(|record| PartitionSummary {
            active: record.version == version,
            name: record.name,
            kind: record.kind,
            version: record.version,
            entries: record.entry_count,
        })
        .collect();

    let output = CacheKeysOutput { version: version.to_string(), partitions };
    let json = serde_json::to_string_pretty(&output).map_err(ToolError::from)?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::{StubNetwork, active_worker, output_json};

    #[tokio::test]
    async fn test_keys_empty() {
        let cache = CacheDb::open_in_memory().await.unwrap();
        let output = output_json(&keys_impl(&cache, "v3").await.unwrap());
        assert_eq!(output["partitions"].as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_keys_after_install() {
        let cache = CacheDb::open_in_memory().await.unwrap();
        let network = StubNetwork::site();
        active_worker(&cache, &network).await;

        let output = output_json(&keys_impl(&cache, "v3").await.unwrap());
        let partitions = output["partitions"].as_array().unwrap();
        assert_eq!(partitions.len(), 1);
        assert_eq!(partitions[0]["name"], "page-cache-v3");
        assert_eq!(partitions[0]["kind"], "page");
        assert_eq!(partitions[0]["entries"], 3);
        assert_eq!(partitions[0]["active"], true);
    }
}
