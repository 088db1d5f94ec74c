use std::time::Duration;

use thiserror::Error;

use crate::transport::TransportKind;

/// MCP-related errors
#[derive(Error, Debug)]
pub enum McpError {
    /// The configuration file could not be read or parsed.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A single server entry is missing a required field or is malformed.
    #[error("Invalid configuration for server '{server}': {reason}")]
    Validation { server: String, reason: String },

    /// Transport open, handshake or discovery failed for one server.
    #[error("Failed to connect to MCP server '{server}' ({transport}): {reason}")]
    Connect {
        server: String,
        transport: TransportKind,
        reason: String,
    },

    #[error("Failed to start MCP server process: {0}")]
    StartFailed(String),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("Transport closed: {0}")]
    TransportClosed(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("JSON-RPC error {code}: {message}")]
    JsonRpc { code: i32, message: String },

    /// The owning session was torn down before the call.
    #[error("Session for MCP server '{0}' is closed")]
    SessionClosed(String),

    #[error("Invalid connection state: {0}")]
    InvalidState(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl McpError {
    pub(crate) fn validation(server: &str, reason: impl Into<String>) -> Self {
        Self::Validation {
            server: server.to_string(),
            reason: reason.into(),
        }
    }

    /// Frames any failure from a connect attempt as a `Connect` error.
    pub(crate) fn into_connect(self, server: &str, transport: TransportKind) -> Self {
        match self {
            connect @ Self::Connect { .. } => connect,
            other => Self::Connect {
                server: server.to_string(),
                transport,
                reason: other.to_string(),
            },
        }
    }
}

/// Result type alias for MCP operations
pub type McpResult<T> = Result<T, McpError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_connect_wraps_cause() {
        let err = McpError::TransportClosed("stdout closed".to_string())
            .into_connect("files", TransportKind::Stdio);
        let message = err.to_string();
        assert!(message.contains("'files'"));
        assert!(message.contains("stdio"));
        assert!(message.contains("stdout closed"));
    }

    #[test]
    fn test_into_connect_keeps_existing_connect_error() {
        let err = McpError::Connect {
            server: "a".to_string(),
            transport: TransportKind::Sse,
            reason: "refused".to_string(),
        }
        .into_connect("b", TransportKind::Stdio);
        match err {
            McpError::Connect { server, transport, .. } => {
                assert_eq!(server, "a");
                assert_eq!(transport, TransportKind::Sse);
            }
            other => panic!("expected Connect, got {other:?}"),
        }
    }
}
