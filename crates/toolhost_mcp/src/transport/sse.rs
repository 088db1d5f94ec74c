//! SSE transport: inbound messages arrive on a long-lived event stream,
//! outbound messages are POSTed to the endpoint the stream announces.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::HeaderMap;
use reqwest::{Client as HttpClient, Url};
use reqwest_eventsource::{Event, EventSource, retry};
use serde_json::Value as JsonValue;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{Transport, TransportKind, header_map};
use crate::config::RemoteParams;
use crate::error::{McpError, McpResult};

const INBOX_CAPACITY: usize = 64;

/// HTTP + Server-Sent Events transport.
pub struct SseTransport {
    server: String,
    http_client: HttpClient,
    headers: HeaderMap,
    endpoint: Url,
    inbox: mpsc::Receiver<McpResult<JsonValue>>,
    reader: Option<JoinHandle<()>>,
}

impl SseTransport {
    /// Opens the event stream and waits for the server's `endpoint` event.
    pub async fn connect(server: &str, params: &RemoteParams, http_client: HttpClient) -> McpResult<Self> {
        let url = Url::parse(&params.url)
            .map_err(|e| McpError::Protocol(format!("Invalid URL '{}': {}", params.url, e)))?;
        let headers = header_map(&params.headers)?;

        info!(server, url = %url, "Opening MCP event stream");

        // EventSource adds `Accept: text/event-stream` itself.
        let request = http_client.get(url.clone()).headers(headers.clone());
        let mut events = EventSource::new(request)
            .map_err(|_| McpError::Protocol("Event stream request cannot be cloned".to_string()))?;
        events.set_retry_policy(Box::new(retry::Never));

        let endpoint = loop {
            match events.next().await {
                Some(Ok(Event::Open)) => continue,
                Some(Ok(Event::Message(message))) if message.event == "endpoint" => {
                    match resolve_endpoint(&url, &message.data) {
                        Ok(endpoint) => break endpoint,
                        Err(e) => {
                            events.close();
                            return Err(e);
                        }
                    }
                }
                Some(Ok(Event::Message(message))) => {
                    debug!("[MCP:{}] Ignoring '{}' event before endpoint", server, message.event);
                }
                Some(Err(e)) => {
                    events.close();
                    return Err(McpError::TransportClosed(format!("event stream failed: {}", e)));
                }
                None => {
                    return Err(McpError::TransportClosed(
                        "event stream ended before the endpoint event".to_string(),
                    ));
                }
            }
        };

        debug!("[MCP:{}] Message endpoint: {}", server, endpoint);

        let (tx, inbox) = mpsc::channel(INBOX_CAPACITY);
        let reader = tokio::spawn(read_events(server.to_string(), events, tx));

        Ok(Self {
            server: server.to_string(),
            http_client,
            headers,
            endpoint,
            inbox,
            reader: Some(reader),
        })
    }
}

/// Resolves the `endpoint` event payload against the stream URL.
///
/// The endpoint must share the stream's origin.
pub(crate) fn resolve_endpoint(base: &Url, data: &str) -> McpResult<Url> {
    let endpoint = base
        .join(data.trim())
        .map_err(|e| McpError::Protocol(format!("Invalid endpoint '{}': {}", data, e)))?;

    if endpoint.origin() != base.origin() {
        return Err(McpError::Protocol(format!(
            "Endpoint origin does not match the stream origin: {}",
            endpoint
        )));
    }
    Ok(endpoint)
}

async fn read_events(server: String, mut events: EventSource, inbox: mpsc::Sender<McpResult<JsonValue>>) {
    while let Some(event) = events.next().await {
        let item = match event {
            Ok(Event::Open) => continue,
            Ok(Event::Message(message)) if message.event == "message" => {
                match serde_json::from_str::<JsonValue>(&message.data) {
                    Ok(value) => Ok(value),
                    Err(e) => {
                        warn!("[MCP:{}] Dropping malformed event payload: {}", server, e);
                        continue;
                    }
                }
            }
            Ok(Event::Message(message)) => {
                debug!("[MCP:{}] Ignoring '{}' event", server, message.event);
                continue;
            }
            Err(reqwest_eventsource::Error::StreamEnded) => break,
            Err(e) => Err(McpError::TransportClosed(format!("event stream failed: {}", e))),
        };

        let failed = item.is_err();
        if inbox.send(item).await.is_err() || failed {
            break;
        }
    }
    events.close();
}

#[async_trait]
impl Transport for SseTransport {
    async fn send(&mut self, message: JsonValue) -> McpResult<()> {
        debug!("[MCP:{}] HTTP POST to: {}", self.server, self.endpoint);

        let response = self
            .http_client
            .post(self.endpoint.clone())
            .headers(self.headers.clone())
            .json(&message)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(McpError::Protocol(format!("HTTP {}: {}", status, body)));
        }
        Ok(())
    }

    async fn receive(&mut self) -> McpResult<JsonValue> {
        match self.inbox.recv().await {
            Some(item) => item,
            None => Err(McpError::TransportClosed("event stream ended".to_string())),
        }
    }

    async fn close(&mut self) -> McpResult<()> {
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
        self.inbox.close();
        Ok(())
    }

    fn kind(&self) -> TransportKind {
        TransportKind::Sse
    }
}

impl Drop for SseTransport {
    fn drop(&mut self) {
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
    }
}
