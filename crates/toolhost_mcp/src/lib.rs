//! Model Context Protocol (MCP) client
//!
//! Connects to the MCP servers declared in a configuration file, discovers
//! the tools each one exposes and wraps them behind the uniform [`Tool`]
//! interface, so remote tools can be called like local functions.
//!
//! # Overview
//!
//! - [`McpRegistry`] loads a configuration file, connects every enabled
//!   server and returns one flat list of tools. It keeps the connections
//!   alive until [`McpRegistry::cleanup_all`].
//! - [`ServerConnection`] drives one server through connect, handshake and
//!   discovery, and owns its teardown.
//! - [`McpSession`] speaks the protocol over a [`Transport`].
//! - Three transports: stdio subprocesses, SSE and streamable HTTP.
//!
//! # Example
//!
//! ```ignore
//! use toolhost_mcp::{McpRegistry, Tool};
//!
//! let registry = McpRegistry::new();
//! let tools = registry.load_tools("mcp.json").await;
//!
//! if let Some(tool) = tools.iter().find(|t| t.name() == "read_file") {
//!     let mut args = serde_json::Map::new();
//!     args.insert("path".into(), "README.md".into());
//!     let result = tool.invoke(args).await;
//!     println!("{}", if result.success { &result.content } else { &result.error });
//! }
//!
//! registry.cleanup_all().await;
//! ```

pub mod config;
pub mod connection;
pub mod error;
pub mod protocol;
pub mod registry;
pub mod session;
pub mod tool;
pub mod transport;

#[cfg(test)]
mod tests;

pub use config::{
    EntryStatus, LoaderOptions, McpServersConfig, RemoteParams, ServerConfig, ServerEntry,
    StdioParams, TransportConfig,
};
pub use connection::{ConnectionState, ServerConnection};
pub use error::{McpError, McpResult};
pub use protocol::{CallToolResult, Content, ToolDescriptor};
pub use registry::{McpRegistry, ServerSummary};
pub use session::McpSession;
pub use tool::{JsonMap, McpTool, Tool, ToolResult};
pub use transport::{Connector, DefaultConnector, Transport, TransportKind};
