//! Streamable HTTP transport: each outbound message is its own POST and the
//! replies come back in that POST's body.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::StreamExt;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap};
use reqwest::{Client as HttpClient, Response, StatusCode, Url};
use serde_json::Value as JsonValue;
use tracing::debug;

use super::{Transport, TransportKind, header_map};
use crate::config::RemoteParams;
use crate::error::{McpError, McpResult};

/// Header carrying the server-assigned session identifier.
pub(crate) const SESSION_ID_HEADER: &str = "mcp-session-id";

const DELETE_TIMEOUT: Duration = Duration::from_secs(5);

/// Streamable HTTP transport.
pub struct StreamableHttpTransport {
    server: String,
    http_client: HttpClient,
    url: Url,
    headers: HeaderMap,
    session_id: Option<String>,
    inbox: VecDeque<JsonValue>,
}

impl StreamableHttpTransport {
    /// Prepares the transport. No request is made until the first send.
    pub fn new(server: &str, params: &RemoteParams, http_client: HttpClient) -> McpResult<Self> {
        let url = Url::parse(&params.url)
            .map_err(|e| McpError::Protocol(format!("Invalid URL '{}': {}", params.url, e)))?;

        Ok(Self {
            server: server.to_string(),
            http_client,
            url,
            headers: header_map(&params.headers)?,
            session_id: None,
            inbox: VecDeque::new(),
        })
    }

    /// Queues every message of an event-stream body, stopping after the
    /// response to `request_id`.
    async fn read_event_stream(&mut self, response: Response, request_id: Option<&JsonValue>) -> McpResult<()> {
        let mut events = response.bytes_stream().eventsource();

        while let Some(event) = events.next().await {
            let event = event.map_err(|e| McpError::Protocol(format!("Invalid event stream: {}", e)))?;
            if event.data.trim().is_empty() {
                continue;
            }

            let value = match serde_json::from_str::<JsonValue>(&event.data) {
                Ok(value) => value,
                Err(e) => {
                    debug!("[MCP:{}] Skipping non-JSON event: {}", self.server, e);
                    continue;
                }
            };

            let answered = request_id
                .is_some_and(|id| value.get("method").is_none() && value.get("id") == Some(id));
            self.inbox.push_back(value);
            if answered {
                break;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Transport for StreamableHttpTransport {
    async fn send(&mut self, message: JsonValue) -> McpResult<()> {
        let request_id = message
            .get("method")
            .and(message.get("id"))
            .filter(|id| !id.is_null())
            .cloned();

        debug!("[MCP:{}] HTTP POST to: {}", self.server, self.url);

        let mut request = self
            .http_client
            .post(self.url.clone())
            .headers(self.headers.clone())
            .header(ACCEPT, "application/json, text/event-stream")
            .json(&message);
        if let Some(session_id) = &self.session_id {
            request = request.header(SESSION_ID_HEADER, session_id);
        }

        let response = request.send().await?;
        let status = response.status();

        if let Some(session_id) = response
            .headers()
            .get(SESSION_ID_HEADER)
            .and_then(|value| value.to_str().ok())
        {
            self.session_id = Some(session_id.to_string());
        }

        if status == StatusCode::ACCEPTED {
            return Ok(());
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(McpError::Protocol(format!("HTTP {}: {}", status, body)));
        }

        let is_event_stream = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.to_ascii_lowercase().starts_with("text/event-stream"));

        if is_event_stream {
            return self.read_event_stream(response, request_id.as_ref()).await;
        }

        let body = response.bytes().await?;
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(());
        }
        match serde_json::from_slice::<JsonValue>(&body)? {
            JsonValue::Array(batch) => self.inbox.extend(batch),
            single => self.inbox.push_back(single),
        }
        Ok(())
    }

    async fn receive(&mut self) -> McpResult<JsonValue> {
        self.inbox
            .pop_front()
            .ok_or_else(|| McpError::Protocol("Server sent no response to the last request".to_string()))
    }

    async fn close(&mut self) -> McpResult<()> {
        self.inbox.clear();

        let Some(session_id) = self.session_id.take() else {
            return Ok(());
        };

        let request = self
            .http_client
            .delete(self.url.clone())
            .headers(self.headers.clone())
            .header(SESSION_ID_HEADER, session_id)
            .send();
        match tokio::time::timeout(DELETE_TIMEOUT, request).await {
            Ok(Ok(response)) => debug!("[MCP:{}] Session closed: HTTP {}", self.server, response.status()),
            Ok(Err(e)) => debug!("[MCP:{}] Session DELETE failed: {}", self.server, e),
            Err(_) => debug!("[MCP:{}] Session DELETE timed out", self.server),
        }
        Ok(())
    }

    fn kind(&self) -> TransportKind {
        TransportKind::StreamableHttp
    }
}
