//! MCP Registry - loads configured servers and owns their connections
//!
//! [`McpRegistry`] reads a server file, connects every enabled entry and
//! hands back one flat list of tools. The connections stay registered until
//! [`McpRegistry::cleanup_all`] tears them down.
//!
//! # Example
//!
//! ```ignore
//! use toolhost_mcp::{McpRegistry, Tool};
//!
//! let registry = McpRegistry::new();
//! let tools = registry.load_tools("mcp.json").await;
//! for tool in &tools {
//!     println!("{}: {}", tool.name(), tool.description());
//! }
//! registry.cleanup_all().await;
//! ```

use std::path::Path;
use std::sync::Arc;

use futures::{StreamExt, stream};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::config::{EntryStatus, LoaderOptions, McpServersConfig, ServerConfig};
use crate::connection::ServerConnection;
use crate::tool::McpTool;
use crate::transport::{Connector, DefaultConnector};

/// A live connection, for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerSummary {
    pub name: String,
    pub transport: String,
    pub endpoint: String,
    pub tool_count: usize,
}

/// Registry of live server connections for one load/run cycle.
///
/// Loading and cleanup hold the registry lock for their whole duration, so
/// they never interleave on one instance.
pub struct McpRegistry {
    connector: Arc<dyn Connector>,
    options: LoaderOptions,
    connections: Mutex<Vec<ServerConnection>>,
}

impl Default for McpRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl McpRegistry {
    /// Creates a registry using the real transports and default options.
    pub fn new() -> Self {
        Self::with_options(LoaderOptions::default())
    }

    pub fn with_options(options: LoaderOptions) -> Self {
        Self::with_connector(Arc::new(DefaultConnector::new()), options)
    }

    /// Creates a registry that opens transports through `connector`.
    pub fn with_connector(connector: Arc<dyn Connector>, options: LoaderOptions) -> Self {
        Self {
            connector,
            options,
            connections: Mutex::new(Vec::new()),
        }
    }

    /// Loads tools from every enabled server in the file.
    ///
    /// A missing file or one that cannot be read or parsed yields no tools.
    /// Servers that fail validation or connection are logged and skipped.
    pub async fn load_tools(&self, config_path: impl AsRef<Path>) -> Vec<Arc<McpTool>> {
        let config_path = config_path.as_ref();

        if !config_path.exists() {
            info!("MCP config not found: {}", config_path.display());
            return Vec::new();
        }

        let config = match McpServersConfig::load(config_path) {
            Ok(config) => config,
            Err(e) => {
                error!("Error loading MCP config: {}", e);
                return Vec::new();
            }
        };

        self.load_from_config(&config).await
    }

    /// Loads tools from an already parsed configuration.
    pub async fn load_from_config(&self, config: &McpServersConfig) -> Vec<Arc<McpTool>> {
        let mut connections = self.connections.lock().await;

        if config.is_empty() {
            info!("No MCP servers configured");
            return Vec::new();
        }

        let mut servers = Vec::with_capacity(config.len());
        for (name, status) in config.resolve() {
            match status {
                EntryStatus::Disabled => info!(server = %name, "Skipping disabled server: {}", name),
                EntryStatus::Invalid(e) => warn!(server = %name, "{}", e),
                EntryStatus::Ready(server) => servers.push(server),
            }
        }

        self.connect_all(&mut connections, servers).await
    }

    /// Connects the given servers, skipping disabled ones.
    pub async fn load_servers(&self, servers: Vec<ServerConfig>) -> Vec<Arc<McpTool>> {
        let mut connections = self.connections.lock().await;
        self.connect_all(&mut connections, servers).await
    }

    async fn connect_all(
        &self,
        connections: &mut Vec<ServerConnection>,
        servers: Vec<ServerConfig>,
    ) -> Vec<Arc<McpTool>> {
        let connector = self.connector.as_ref();
        let options = &self.options;

        let enabled = servers.into_iter().filter(|server| {
            if !server.enabled {
                info!(server = %server.name, "Skipping disabled server: {}", server.name);
            }
            server.enabled
        });

        // `buffered` keeps results in configuration order.
        let mut attempts = stream::iter(enabled.map(|server| async move {
            let mut connection = ServerConnection::new(server, options);
            let outcome = connection.connect(connector).await;
            (connection, outcome)
        }))
        .buffered(options.max_concurrent_connects.max(1));

        let mut tools = Vec::new();
        while let Some((connection, outcome)) = attempts.next().await {
            match outcome {
                Ok(()) => {
                    tools.extend(connection.tools().iter().cloned());
                    connections.push(connection);
                }
                // Already logged by the connection.
                Err(e) => debug!(server = %connection.name(), "Not registered: {}", e),
            }
        }

        info!("Total MCP tools loaded: {}", tools.len());
        tools
    }

    /// Disconnects every registered connection and empties the registry.
    pub async fn cleanup_all(&self) {
        let mut connections = self.connections.lock().await;
        if connections.is_empty() {
            return;
        }

        let count = connections.len();
        for mut connection in connections.drain(..) {
            if let Err(e) = connection.disconnect().await {
                warn!(server = %connection.name(), "Error while disconnecting: {}", e);
            }
        }
        info!("Closed {} MCP connections", count);
    }

    /// Number of registered connections.
    pub async fn len(&self) -> usize {
        self.connections.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.connections.lock().await.is_empty()
    }

    /// Registered connections, in load order.
    pub async fn servers(&self) -> Vec<ServerSummary> {
        self.connections
            .lock()
            .await
            .iter()
            .map(|connection| ServerSummary {
                name: connection.name().to_string(),
                transport: connection.transport_kind().to_string(),
                endpoint: connection.config().transport.endpoint(),
                tool_count: connection.tools().len(),
            })
            .collect()
    }
}
