//! Uniform tool interface and the MCP tool wrapper.

use std::sync::Weak;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::{McpError, McpResult};
use crate::protocol::{CallToolResult, Content, ToolDescriptor};
use crate::session::McpSession;

/// Named tool arguments.
pub type JsonMap = Map<String, JsonValue>;

/// Error text for a tool that flagged its own failure.
pub const REMOTE_TOOL_ERROR: &str = "Tool returned error";

/// Outcome of one tool invocation.
///
/// On success `error` is empty; on failure `content` is empty and `error`
/// is not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolResult {
    pub success: bool,
    pub content: String,
    pub error: String,
}

impl ToolResult {
    pub fn success(content: impl Into<String>) -> Self {
        Self {
            success: true,
            content: content.into(),
            error: String::new(),
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        let error = error.into();
        Self {
            success: false,
            content: String::new(),
            error: if error.is_empty() { "Unknown error".to_string() } else { error },
        }
    }
}

impl From<CallToolResult> for ToolResult {
    fn from(result: CallToolResult) -> Self {
        if result.is_error() {
            Self::failure(REMOTE_TOOL_ERROR)
        } else {
            Self::success(normalize_content(&result.content))
        }
    }
}

/// Joins content items with newlines: text verbatim, anything else as
/// compact JSON.
pub fn normalize_content(content: &[Content]) -> String {
    content
        .iter()
        .map(Content::to_display_string)
        .collect::<Vec<_>>()
        .join("\n")
}

/// A callable tool, local or remote.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn parameters_schema(&self) -> JsonValue;

    /// Runs the tool. Failures are reported in the result, never raised.
    async fn invoke(&self, arguments: JsonMap) -> ToolResult;
}

/// A tool discovered on an MCP server.
///
/// Holds only a weak reference to the session: once its connection is torn
/// down, invocations fail instead of keeping the server alive.
pub struct McpTool {
    server: String,
    descriptor: ToolDescriptor,
    session: Weak<Mutex<McpSession>>,
    call_timeout: Duration,
}

impl McpTool {
    pub fn new(
        server: impl Into<String>,
        descriptor: ToolDescriptor,
        session: Weak<Mutex<McpSession>>,
        call_timeout: Duration,
    ) -> Self {
        Self {
            server: server.into(),
            descriptor,
            session,
            call_timeout,
        }
    }

    /// Name of the server providing this tool.
    pub fn server(&self) -> &str {
        &self.server
    }

    pub fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    async fn call(&self, arguments: JsonMap) -> McpResult<CallToolResult> {
        let session = self
            .session
            .upgrade()
            .ok_or_else(|| McpError::SessionClosed(self.server.clone()))?;

        let call = async {
            let mut session = session.lock().await;
            session.call_tool(&self.descriptor.name, arguments).await
        };

        tokio::time::timeout(self.call_timeout, call)
            .await
            .map_err(|_| McpError::Timeout(self.call_timeout))?
    }
}

#[async_trait]
impl Tool for McpTool {
    fn name(&self) -> &str {
        &self.descriptor.name
    }

    fn description(&self) -> &str {
        &self.descriptor.description
    }

    fn parameters_schema(&self) -> JsonValue {
        self.descriptor.input_schema.clone()
    }

    async fn invoke(&self, arguments: JsonMap) -> ToolResult {
        match self.call(arguments).await {
            Ok(result) => {
                if result.is_error() {
                    debug!(server = %self.server, tool = %self.descriptor.name, "Tool reported an error");
                }
                ToolResult::from(result)
            }
            Err(e) => {
                warn!(server = %self.server, tool = %self.descriptor.name, "MCP tool call failed: {}", e);
                ToolResult::failure(format!("MCP tool execution failed: {}", e))
            }
        }
    }
}

impl std::fmt::Debug for McpTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("McpTool")
            .field("server", &self.server)
            .field("name", &self.descriptor.name)
            .field("call_timeout", &self.call_timeout)
            .finish()
    }
}
