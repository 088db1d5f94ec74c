//! MCP Session
//!
//! [`McpSession`] runs the protocol over an established [`Transport`]: the
//! `initialize` handshake, tool discovery and tool invocation.
//!
//! # Example
//!
//! ```ignore
//! use toolhost_mcp::{ServerConfig, DefaultConnector, Connector, McpSession};
//!
//! let config = ServerConfig::stdio("files", "mcp-server-filesystem");
//! let transport = DefaultConnector::new().open(&config).await?;
//! let mut session = McpSession::new("files", transport);
//!
//! let info = session.initialize().await?;
//! println!("Connected to: {}", info.server_info.name);
//!
//! for tool in session.list_tools().await? {
//!     println!("{}: {}", tool.name, tool.description);
//! }
//!
//! session.close().await?;
//! ```

use serde::de::DeserializeOwned;
use serde_json::{Map, Value as JsonValue, json};
use tracing::{debug, info, warn};

use crate::error::{McpError, McpResult};
use crate::protocol::{
    CallToolParams, CallToolResult, ClientCapabilities, Implementation, IncomingMessage,
    InitializeParams, InitializeResult, JsonRpcErrorObject, JsonRpcNotification, JsonRpcRequest,
    JsonRpcResponse, ListToolsParams, ListToolsResult, ToolDescriptor, error_codes,
};
use crate::transport::Transport;

/// Client name sent in `initialize`.
const CLIENT_NAME: &str = "toolhost";

/// One protocol conversation with one server.
pub struct McpSession {
    server: String,
    transport: Box<dyn Transport>,
    next_id: u64,
    initialized: bool,
    closed: bool,
}

impl McpSession {
    pub fn new(server: impl Into<String>, transport: Box<dyn Transport>) -> Self {
        Self {
            server: server.into(),
            transport,
            next_id: 1,
            initialized: false,
            closed: false,
        }
    }

    /// Performs the `initialize` handshake and sends
    /// `notifications/initialized`.
    pub async fn initialize(&mut self) -> McpResult<InitializeResult> {
        let params = InitializeParams::new(
            ClientCapabilities::default(),
            Implementation::new(CLIENT_NAME, env!("CARGO_PKG_VERSION")),
        );

        let result: InitializeResult = self
            .request("initialize", Some(serde_json::to_value(params)?))
            .await?;

        info!(
            "[MCP:{}] Initialized: {} v{} (protocol {})",
            self.server, result.server_info.name, result.server_info.version, result.protocol_version
        );

        self.notify("notifications/initialized", None).await?;
        self.initialized = true;
        Ok(result)
    }

    /// Lists every tool the server exposes, following `nextCursor` pages.
    pub async fn list_tools(&mut self) -> McpResult<Vec<ToolDescriptor>> {
        self.ensure_initialized()?;

        let mut tools = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let params = ListToolsParams { cursor: cursor.take() };
            let page: ListToolsResult = self
                .request("tools/list", Some(serde_json::to_value(params)?))
                .await?;
            tools.extend(page.tools);

            match page.next_cursor {
                Some(next) if !next.is_empty() => cursor = Some(next),
                _ => break,
            }
        }

        debug!("[MCP:{}] Listed {} tools", self.server, tools.len());
        Ok(tools)
    }

    /// Calls a tool. A tool-side failure is an `Ok` result with the error
    /// flag set; only transport and protocol failures are errors.
    pub async fn call_tool(&mut self, name: &str, arguments: Map<String, JsonValue>) -> McpResult<CallToolResult> {
        self.ensure_initialized()?;

        let params = CallToolParams {
            name: name.to_string(),
            arguments,
        };
        debug!("[MCP:{}] Calling tool: {}", self.server, name);
        self.request("tools/call", Some(serde_json::to_value(params)?)).await
    }

    /// Closes the transport. Later calls are no-ops.
    pub async fn close(&mut self) -> McpResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.initialized = false;
        debug!("[MCP:{}] Closing session", self.server);
        self.transport.close().await
    }

    fn ensure_initialized(&self) -> McpResult<()> {
        if self.closed {
            return Err(McpError::SessionClosed(self.server.clone()));
        }
        if !self.initialized {
            return Err(McpError::Protocol("Server not initialized".to_string()));
        }
        Ok(())
    }

    async fn notify(&mut self, method: &str, params: Option<JsonValue>) -> McpResult<()> {
        let notification = JsonRpcNotification::new(method, params);
        self.transport.send(serde_json::to_value(notification)?).await
    }

    /// Sends a request and waits for the response with the same id.
    ///
    /// Notifications and stale responses received meanwhile are dropped;
    /// server requests are answered so the server is never left waiting.
    async fn request<T: DeserializeOwned>(&mut self, method: &str, params: Option<JsonValue>) -> McpResult<T> {
        if self.closed {
            return Err(McpError::SessionClosed(self.server.clone()));
        }

        let id = self.next_id;
        self.next_id += 1;

        let request = JsonRpcRequest::new(id, method, params);
        self.transport.send(serde_json::to_value(request)?).await?;

        loop {
            let raw = self.transport.receive().await?;
            let message = IncomingMessage::from_value(raw)
                .map_err(|e| McpError::Protocol(format!("Malformed message: {}", e)))?;

            match message {
                IncomingMessage::Response(response) if response.answers(id) => {
                    let result = response
                        .into_result()
                        .map_err(|e| McpError::JsonRpc { code: e.code, message: e.message })?;
                    return serde_json::from_value(result)
                        .map_err(|e| McpError::Protocol(format!("Invalid '{}' result: {}", method, e)));
                }
                IncomingMessage::Response(response) => {
                    warn!("[MCP:{}] Ignoring response for unknown id {}", self.server, response.id);
                }
                IncomingMessage::Notification(notification) => {
                    debug!("[MCP:{}] Notification: {}", self.server, notification.method);
                }
                IncomingMessage::Request(server_request) => {
                    self.answer_server_request(server_request).await?;
                }
            }
        }
    }

    async fn answer_server_request(&mut self, request: JsonRpcRequest) -> McpResult<()> {
        let response = if request.method == "ping" {
            JsonRpcResponse::success(request.id, json!({}))
        } else {
            debug!("[MCP:{}] Rejecting server request: {}", self.server, request.method);
            JsonRpcResponse::error(
                request.id,
                JsonRpcErrorObject::new(
                    error_codes::METHOD_NOT_FOUND,
                    format!("Method not found: {}", request.method),
                ),
            )
        };
        self.transport.send(serde_json::to_value(response)?).await
    }
}
