//! MCP error types.

use thiserror::Error;

/// Errors in a `tools/call` request, reported as JSON-RPC errors
#[derive(Debug, Error)]
pub enum McpError {
    #[error("invalid params: {0}")]
    InvalidParams(String),

    #[error("tool not found: {0}")]
    ToolNotFound(String),
}

impl McpError {
    /// JSON-RPC error code for errors reported at the protocol level
    pub fn code(&self) -> i64 {
        match self {
            Self::InvalidParams(_) | Self::ToolNotFound(_) => crate::protocol::INVALID_PARAMS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_call_errors_are_invalid_params() {
        assert_eq!(McpError::InvalidParams("missing 'namespace'".into()).code(), -32602);
        assert_eq!(McpError::ToolNotFound("delete_pod".into()).code(), -32602);
    }
}
