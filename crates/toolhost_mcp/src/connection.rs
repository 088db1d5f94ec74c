//! One configured server: transport, session and discovered tools.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, error, info};

use crate::config::{LoaderOptions, ServerConfig};
use crate::error::{McpError, McpResult};
use crate::protocol::ToolDescriptor;
use crate::session::McpSession;
use crate::tool::McpTool;
use crate::transport::{Connector, TransportKind};

/// Longest tool description shown in connect logs.
const LOG_DESCRIPTION_CHARS: usize = 60;

/// Upper bound on releasing a session whose connect attempt failed.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Lifecycle of a [`ServerConnection`].
///
/// `Unconnected → Connecting → Ready → Disconnected`, with `Failed`
/// reachable from `Connecting`. `Failed` and `Disconnected` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Unconnected,
    Connecting,
    Ready,
    Disconnected,
    Failed,
}

/// Owns the session with one server and the tools discovered on it.
pub struct ServerConnection {
    config: ServerConfig,
    connect_timeout: Duration,
    call_timeout: Duration,
    state: ConnectionState,
    session: Option<Arc<Mutex<McpSession>>>,
    tools: Vec<Arc<McpTool>>,
}

impl ServerConnection {
    pub fn new(config: ServerConfig, options: &LoaderOptions) -> Self {
        Self {
            config,
            connect_timeout: options.connect_timeout,
            call_timeout: options.call_timeout,
            state: ConnectionState::Unconnected,
            session: None,
            tools: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn transport_kind(&self) -> TransportKind {
        self.config.kind()
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Tools discovered on the last successful connect, in server order.
    pub fn tools(&self) -> &[Arc<McpTool>] {
        &self.tools
    }

    /// Opens the transport, initializes the session and discovers tools,
    /// all within the connect timeout.
    ///
    /// On failure everything opened during the attempt is released and the
    /// connection ends in [`ConnectionState::Failed`].
    pub async fn connect(&mut self, connector: &dyn Connector) -> McpResult<()> {
        if self.state != ConnectionState::Unconnected {
            return Err(McpError::InvalidState(format!(
                "cannot connect '{}' from state {:?}",
                self.config.name, self.state
            )));
        }

        let kind = self.config.kind();
        self.state = ConnectionState::Connecting;
        debug!(server = %self.config.name, transport = %kind, "Connecting");

        match open_and_discover(connector, &self.config, self.connect_timeout).await {
            Ok((session, descriptors)) => {
                let session = Arc::new(Mutex::new(session));
                self.tools = descriptors
                    .into_iter()
                    .map(|descriptor| {
                        Arc::new(McpTool::new(
                            self.config.name.clone(),
                            descriptor,
                            Arc::downgrade(&session),
                            self.call_timeout,
                        ))
                    })
                    .collect();
                self.session = Some(session);
                self.state = ConnectionState::Ready;
                self.log_connected();
                Ok(())
            }
            Err(e) => {
                self.state = ConnectionState::Failed;
                let err = e.into_connect(&self.config.name, kind);
                error!(server = %self.config.name, transport = %kind, "{}", err);
                Err(err)
            }
        }
    }

    /// Closes the session and drops the tools. Safe to call in any state.
    pub async fn disconnect(&mut self) -> McpResult<()> {
        self.tools.clear();
        if self.state == ConnectionState::Ready {
            self.state = ConnectionState::Disconnected;
        }

        let Some(session) = self.session.take() else {
            return Ok(());
        };

        debug!(server = %self.config.name, "Disconnecting");
        let mut session = session.lock().await;
        session.close().await
    }

    fn log_connected(&self) {
        info!(
            server = %self.config.name,
            transport = %self.config.kind(),
            "Connected to MCP server '{}' ({}: {}) - loaded {} tools",
            self.config.name,
            self.config.kind(),
            self.config.transport.endpoint(),
            self.tools.len()
        );
        for tool in &self.tools {
            let descriptor = tool.descriptor();
            info!(
                server = %self.config.name,
                tool = %descriptor.name,
                "  - {}: {}",
                descriptor.name,
                truncate_description(&descriptor.description)
            );
        }
    }
}

/// Opens the transport and runs the handshake within `connect_timeout`.
/// A session that fails or runs out of time is closed before returning.
async fn open_and_discover(
    connector: &dyn Connector,
    config: &ServerConfig,
    connect_timeout: Duration,
) -> McpResult<(McpSession, Vec<ToolDescriptor>)> {
    let deadline = Instant::now() + connect_timeout;
    let transport = match tokio::time::timeout_at(deadline, connector.open(config)).await {
        Ok(transport) => transport?,
        Err(_) => return Err(McpError::Timeout(connect_timeout)),
    };
    let mut session = McpSession::new(config.name.clone(), transport);

    let error = match tokio::time::timeout_at(deadline, handshake(&mut session)).await {
        Ok(Ok(tools)) => return Ok((session, tools)),
        Ok(Err(e)) => e,
        Err(_) => McpError::Timeout(connect_timeout),
    };

    match tokio::time::timeout(CLOSE_TIMEOUT, session.close()).await {
        Ok(Ok(())) => {}
        Ok(Err(close_err)) => debug!(server = %config.name, "Close after failed handshake: {}", close_err),
        Err(_) => debug!(server = %config.name, "Close after failed handshake timed out"),
    }
    Err(error)
}

async fn handshake(session: &mut McpSession) -> McpResult<Vec<ToolDescriptor>> {
    session.initialize().await?;
    session.list_tools().await
}

fn truncate_description(description: &str) -> String {
    match description.char_indices().nth(LOG_DESCRIPTION_CHARS) {
        Some((cut, _)) => format!("{}...", &description[..cut]),
        None => description.to_string(),
    }
}
