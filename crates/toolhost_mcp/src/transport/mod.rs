//! MCP Transport Abstraction
//!
//! Supported transports:
//! - **Stdio**: local processes via stdin/stdout, newline-delimited JSON
//! - **SSE**: an HTTP event stream for inbound messages, POSTs for outbound
//! - **Streamable HTTP**: one POST per outbound message, replies in the
//!   response body (JSON or an event stream)
//!
//! A [`Connector`] turns a [`ServerConfig`] into a boxed [`Transport`];
//! [`DefaultConnector`] is the factory over [`TransportKind`].

mod sse;
mod stdio;
mod streamable_http;

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde_json::Value as JsonValue;

use crate::config::{ServerConfig, TransportConfig};
use crate::error::{McpError, McpResult};

pub use sse::SseTransport;
pub use stdio::StdioTransport;
pub use streamable_http::StreamableHttpTransport;

/// The three ways of reaching a server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportKind {
    Stdio,
    Sse,
    StreamableHttp,
}

impl TransportKind {
    /// Parses a config `type` value, case-insensitively.
    ///
    /// `http` and `streamable_http` both name the streamable HTTP transport.
    pub fn from_type_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "stdio" => Some(Self::Stdio),
            "sse" => Some(Self::Sse),
            "http" | "streamable_http" => Some(Self::StreamableHttp),
            _ => None,
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stdio => write!(f, "stdio"),
            Self::Sse => write!(f, "sse"),
            Self::StreamableHttp => write!(f, "streamable_http"),
        }
    }
}

/// A bidirectional JSON-RPC message channel to one server.
#[async_trait]
pub trait Transport: Send {
    /// Sends one message.
    async fn send(&mut self, message: JsonValue) -> McpResult<()>;

    /// Waits for the next inbound message.
    async fn receive(&mut self) -> McpResult<JsonValue>;

    /// Releases the underlying process or connection.
    async fn close(&mut self) -> McpResult<()>;

    fn kind(&self) -> TransportKind;
}

/// Opens transports for server configurations.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn open(&self, config: &ServerConfig) -> McpResult<Box<dyn Transport>>;
}

/// Connector for the real transports.
#[derive(Debug, Clone, Default)]
pub struct DefaultConnector {
    http_client: reqwest::Client,
}

impl DefaultConnector {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Connector for DefaultConnector {
    async fn open(&self, config: &ServerConfig) -> McpResult<Box<dyn Transport>> {
        let transport: Box<dyn Transport> = match &config.transport {
            TransportConfig::Stdio(params) => Box::new(StdioTransport::spawn(&config.name, params)?),
            TransportConfig::Sse(params) => Box::new(
                SseTransport::connect(&config.name, params, self.http_client.clone()).await?,
            ),
            TransportConfig::StreamableHttp(params) => Box::new(StreamableHttpTransport::new(
                &config.name,
                params,
                self.http_client.clone(),
            )?),
        };
        Ok(transport)
    }
}

/// Builds a header map from configured name/value pairs.
pub(crate) fn header_map(headers: &HashMap<String, String>) -> McpResult<HeaderMap> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        let header_name = HeaderName::try_from(name.as_str())
            .map_err(|e| McpError::Protocol(format!("Invalid header name '{}': {}", name, e)))?;
        let header_value = HeaderValue::try_from(value.as_str())
            .map_err(|e| McpError::Protocol(format!("Invalid value for header '{}': {}", name, e)))?;
        map.insert(header_name, header_value);
    }
    Ok(map)
}
