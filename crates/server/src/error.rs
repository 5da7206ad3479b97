//! Errors raised by the tool layer itself.
//!
//! Worker and storage failures arrive as `egecache_core::Error` and convert
//! directly; these cover what only the tool surface can get wrong.

use egecache_client::fetch::UrlError;
use rmcp::model::{ErrorCode, ErrorData as McpError};

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// The requested URL could not be resolved against the origin.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(#[from] UrlError),

    /// Tool output could not be encoded.
    #[error("OUTPUT_FAILED: {0}")]
    Output(#[from] serde_json::Error),
}

impl From<ToolError> for McpError {
    fn from(err: ToolError) -> Self {
        let code = match &err {
            ToolError::InvalidUrl(_) => -32602,
            ToolError::Output(_) => -32603,
        };

        McpError { code: ErrorCode(code), message: err.to_string().into(), data: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_url_maps_to_invalid_params() {
        let err: McpError = ToolError::InvalidUrl(UrlError::UnsupportedScheme("ftp".into())).into();
        assert_eq!(err.code.0, -32602);
        assert!(err.message.contains("INVALID_URL"));
    }
}
