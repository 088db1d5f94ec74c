//! In-memory MCP servers and connectors for tests.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value as JsonValue, json};

use crate::config::ServerConfig;
use crate::error::{McpError, McpResult};
use crate::protocol::{PROTOCOL_VERSION, ToolDescriptor};
use crate::transport::{Connector, Transport, TransportKind};

pub fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Runtime::new().unwrap()
}

/// Scripted behavior of a fake server.
#[derive(Debug, Clone, Default)]
pub struct ScriptedServer {
    tools: Vec<ToolDescriptor>,
    page_size: Option<usize>,
    chatter: bool,
    failing: Vec<String>,
    hanging: Vec<String>,
    results: HashMap<String, JsonValue>,
}

impl ScriptedServer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tool(mut self, name: &str, description: &str) -> Self {
        self.tools.push(ToolDescriptor::new(
            name,
            description,
            json!({"type": "object", "properties": {}}),
        ));
        self
    }

    /// Splits `tools/list` into pages of `size` tools.
    pub fn with_page_size(mut self, size: usize) -> Self {
        self.page_size = Some(size);
        self
    }

    /// Sends a notification and two server requests before every response.
    pub fn with_chatter_before_responses(mut self) -> Self {
        self.chatter = true;
        self
    }

    /// Answers `method` with a JSON-RPC error.
    pub fn failing_method(mut self, method: &str) -> Self {
        self.failing.push(method.to_string());
        self
    }

    /// Never answers `method`.
    pub fn hanging_method(mut self, method: &str) -> Self {
        self.hanging.push(method.to_string());
        self
    }

    /// The raw `tools/call` result for `tool`. Tools without one echo their
    /// arguments as text.
    pub fn with_call_result(mut self, tool: &str, result: JsonValue) -> Self {
        self.results.insert(tool.to_string(), result);
        self
    }

    fn answer(&self, id: &JsonValue, method: &str, params: &JsonValue) -> JsonValue {
        if self.failing.iter().any(|m| m == method) {
            return json!({
                "jsonrpc": "2.0",
                "id": id,
                "error": {"code": -32000, "message": format!("{} failed", method)}
            });
        }

        let result = match method {
            "initialize" => json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": {"tools": {}},
                "serverInfo": {"name": "scripted", "version": "1.0.0"}
            }),
            "tools/list" => {
                let start: usize = params["cursor"].as_str().and_then(|c| c.parse().ok()).unwrap_or(0);
                let size = self.page_size.unwrap_or(self.tools.len().max(1));
                let end = (start + size).min(self.tools.len());
                let mut page = json!({"tools": self.tools[start..end]});
                if end < self.tools.len() {
                    page["nextCursor"] = json!(end.to_string());
                }
                page
            }
            "tools/call" => {
                let name = params["name"].as_str().unwrap_or_default();
                self.results.get(name).cloned().unwrap_or_else(|| {
                    json!({"content": [{"type": "text", "text": params["arguments"].to_string()}]})
                })
            }
            _ => json!({}),
        };
        json!({"jsonrpc": "2.0", "id": id, "result": result})
    }
}

#[derive(Debug, Default)]
struct ProbeState {
    methods: Vec<String>,
    replies: Vec<JsonValue>,
    close_calls: usize,
    released: bool,
}

/// Observes a [`ScriptedTransport`] after it moved into a session.
#[derive(Debug, Clone, Default)]
pub struct Probe(Arc<Mutex<ProbeState>>);

impl Probe {
    /// Methods of every request and notification sent, in order.
    pub fn methods(&self) -> Vec<String> {
        self.0.lock().unwrap().methods.clone()
    }

    /// Responses the client sent to server requests.
    pub fn replies(&self) -> Vec<JsonValue> {
        self.0.lock().unwrap().replies.clone()
    }

    pub fn close_calls(&self) -> usize {
        self.0.lock().unwrap().close_calls
    }

    /// Whether the transport was closed or dropped.
    pub fn is_released(&self) -> bool {
        self.0.lock().unwrap().released
    }
}

/// A transport answering from a [`ScriptedServer`].
pub struct ScriptedTransport {
    server: ScriptedServer,
    queue: VecDeque<JsonValue>,
    hung: bool,
    probe: Probe,
}

impl ScriptedTransport {
    pub fn new(server: ScriptedServer) -> (Self, Probe) {
        let probe = Probe::default();
        let transport = Self {
            server,
            queue: VecDeque::new(),
            hung: false,
            probe: probe.clone(),
        };
        (transport, probe)
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&mut self, message: JsonValue) -> McpResult<()> {
        let Some(method) = message["method"].as_str() else {
            self.probe.0.lock().unwrap().replies.push(message);
            return Ok(());
        };
        self.probe.0.lock().unwrap().methods.push(method.to_string());

        let id = &message["id"];
        if id.is_null() {
            return Ok(());
        }
        if self.server.hanging.iter().any(|m| m == method) {
            self.hung = true;
            return Ok(());
        }

        if self.server.chatter {
            self.queue.push_back(json!({"jsonrpc": "2.0", "method": "notifications/message", "params": {}}));
            self.queue.push_back(json!({"jsonrpc": "2.0", "id": "srv-ping", "method": "ping"}));
            self.queue.push_back(json!({"jsonrpc": "2.0", "id": "srv-sample", "method": "sampling/createMessage"}));
            self.queue.push_back(json!({"jsonrpc": "2.0", "id": 9999, "result": {}}));
        }
        let response = self.server.answer(id, method, &message["params"]);
        self.queue.push_back(response);
        Ok(())
    }

    async fn receive(&mut self) -> McpResult<JsonValue> {
        if let Some(message) = self.queue.pop_front() {
            return Ok(message);
        }
        if self.hung {
            std::future::pending::<()>().await;
        }
        Err(McpError::TransportClosed("scripted server has nothing to send".to_string()))
    }

    async fn close(&mut self) -> McpResult<()> {
        let mut state = self.probe.0.lock().unwrap();
        state.close_calls += 1;
        state.released = true;
        Ok(())
    }

    fn kind(&self) -> TransportKind {
        TransportKind::Stdio
    }
}

impl Drop for ScriptedTransport {
    fn drop(&mut self) {
        if let Ok(mut state) = self.probe.0.lock() {
            state.released = true;
        }
    }
}

/// Connector serving scripted servers by name and recording every attempt.
#[derive(Clone, Default)]
pub struct RecordingConnector {
    servers: HashMap<String, ScriptedServer>,
    delays: HashMap<String, Duration>,
    attempts: Arc<Mutex<Vec<String>>>,
    probes: Arc<Mutex<HashMap<String, Probe>>>,
}

impl RecordingConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_server(mut self, name: &str, server: ScriptedServer) -> Self {
        self.servers.insert(name.to_string(), server);
        self
    }

    /// Delays opening `name`'s transport.
    pub fn with_delay(mut self, name: &str, delay: Duration) -> Self {
        self.delays.insert(name.to_string(), delay);
        self
    }

    /// Server names in the order they were opened.
    pub fn attempts(&self) -> Vec<String> {
        self.attempts.lock().unwrap().clone()
    }

    pub fn probe(&self, name: &str) -> Option<Probe> {
        self.probes.lock().unwrap().get(name).cloned()
    }
}

#[async_trait]
impl Connector for RecordingConnector {
    async fn open(&self, config: &ServerConfig) -> McpResult<Box<dyn Transport>> {
        self.attempts.lock().unwrap().push(config.name.clone());

        if let Some(delay) = self.delays.get(&config.name) {
            tokio::time::sleep(*delay).await;
        }

        let server = self.servers.get(&config.name).cloned().ok_or_else(|| {
            McpError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                format!("no server named '{}'", config.name),
            ))
        })?;

        let (transport, probe) = ScriptedTransport::new(server);
        self.probes.lock().unwrap().insert(config.name.clone(), probe);
        Ok(Box::new(transport))
    }
}
