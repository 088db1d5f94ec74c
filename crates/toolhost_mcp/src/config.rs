//! MCP Server Configuration Types
//!
//! Servers are declared in a file with a top-level `mcpServers` mapping.
//! JSON is the default format; a path ending in `.toml` is read as TOML.
//! Entry order is preserved.
//!
//! # Example
//!
//! ```json
//! {
//!   "mcpServers": {
//!     "files": { "command": "npx", "args": ["-y", "@modelcontextprotocol/server-filesystem", "."] },
//!     "search": { "url": "https://mcp.example.com/sse", "type": "sse",
//!                 "headers": { "Authorization": "Bearer sk-search-123" } },
//!     "notes": { "url": "https://notes.example.com/mcp", "disabled": true }
//!   }
//! }
//! ```
//!
//! The transport is the explicit `type` when it names a known transport,
//! otherwise streamable HTTP when a `url` is present, otherwise stdio.

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value as JsonValue};
use tracing::warn;

use crate::error::{McpError, McpResult};
use crate::transport::TransportKind;

// =============================================================================
// Validated server configuration
// =============================================================================

/// A validated, connectable server configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub name: String,
    pub transport: TransportConfig,
    pub enabled: bool,
}

/// Transport parameters. Each variant carries exactly the fields its kind
/// needs, so a stdio server without a command cannot be represented.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportConfig {
    Stdio(StdioParams),
    Sse(RemoteParams),
    StreamableHttp(RemoteParams),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StdioParams {
    pub command: String,
    pub args: Vec<String>,
    /// Layered over the parent environment.
    pub env: HashMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteParams {
    pub url: String,
    pub headers: HashMap<String, String>,
}

impl TransportConfig {
    pub fn kind(&self) -> TransportKind {
        match self {
            Self::Stdio(_) => TransportKind::Stdio,
            Self::Sse(_) => TransportKind::Sse,
            Self::StreamableHttp(_) => TransportKind::StreamableHttp,
        }
    }

    /// The command line or URL, for display.
    pub fn endpoint(&self) -> String {
        match self {
            Self::Stdio(params) if params.args.is_empty() => params.command.clone(),
            Self::Stdio(params) => format!("{} {}", params.command, params.args.join(" ")),
            Self::Sse(params) | Self::StreamableHttp(params) => params.url.clone(),
        }
    }
}

impl ServerConfig {
    /// Creates a stdio server configuration.
    pub fn stdio(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self::with_transport(
            name,
            TransportConfig::Stdio(StdioParams {
                command: command.into(),
                ..Default::default()
            }),
        )
    }

    /// Creates an SSE server configuration.
    pub fn sse(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self::with_transport(
            name,
            TransportConfig::Sse(RemoteParams {
                url: url.into(),
                ..Default::default()
            }),
        )
    }

    /// Creates a streamable HTTP server configuration.
    pub fn streamable_http(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self::with_transport(
            name,
            TransportConfig::StreamableHttp(RemoteParams {
                url: url.into(),
                ..Default::default()
            }),
        )
    }

    fn with_transport(name: impl Into<String>, transport: TransportConfig) -> Self {
        Self {
            name: name.into(),
            transport,
            enabled: true,
        }
    }

    /// Sets the command-line arguments. No effect on remote servers.
    pub fn with_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        if let TransportConfig::Stdio(params) = &mut self.transport {
            params.args = args.into_iter().map(Into::into).collect();
        }
        self
    }

    /// Adds an environment variable. No effect on remote servers.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        if let TransportConfig::Stdio(params) = &mut self.transport {
            params.env.insert(key.into(), value.into());
        }
        self
    }

    /// Adds an HTTP header. No effect on stdio servers.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        if let TransportConfig::Sse(params) | TransportConfig::StreamableHttp(params) = &mut self.transport {
            params.headers.insert(name.into(), value.into());
        }
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn kind(&self) -> TransportKind {
        self.transport.kind()
    }
}

// =============================================================================
// Raw file entries
// =============================================================================

/// One entry of `mcpServers` as written in the file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,

    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub env: HashMap<String, String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub transport_type: Option<String>,

    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub headers: HashMap<String, String>,

    #[serde(default)]
    pub disabled: bool,
}

impl ServerEntry {
    /// Determines the transport kind for this entry.
    pub fn transport_kind(&self) -> TransportKind {
        if let Some(kind) = self.transport_type.as_deref().and_then(TransportKind::from_type_name) {
            return kind;
        }
        if non_empty(&self.url).is_some() {
            TransportKind::StreamableHttp
        } else {
            TransportKind::Stdio
        }
    }

    /// Checks the required field for the entry's transport and builds the
    /// connectable configuration. Header values are passed on as written.
    pub fn validate(&self, name: &str) -> McpResult<ServerConfig> {
        let kind = self.transport_kind();

        let transport = match kind {
            TransportKind::Stdio => {
                let command = non_empty(&self.command)
                    .ok_or_else(|| McpError::validation(name, "no command specified for stdio server"))?;
                TransportConfig::Stdio(StdioParams {
                    command: command.to_string(),
                    args: self.args.clone(),
                    env: self.env.clone(),
                })
            }
            TransportKind::Sse | TransportKind::StreamableHttp => {
                let url = non_empty(&self.url)
                    .ok_or_else(|| McpError::validation(name, format!("no url specified for {} server", kind)))?;
                let params = RemoteParams {
                    url: url.to_string(),
                    headers: self.headers.clone(),
                };
                if kind == TransportKind::Sse {
                    TransportConfig::Sse(params)
                } else {
                    TransportConfig::StreamableHttp(params)
                }
            }
        };

        Ok(ServerConfig {
            name: name.to_string(),
            transport,
            enabled: !self.disabled,
        })
    }
}

fn non_empty(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|value| !value.is_empty())
}

// =============================================================================
// Configuration file
// =============================================================================

/// The whole configuration file.
///
/// Entries are kept as raw JSON so that one malformed entry is reported on
/// its own instead of failing the file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct McpServersConfig {
    #[serde(rename = "mcpServers", default, deserialize_with = "null_as_empty")]
    pub mcp_servers: Map<String, JsonValue>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Map<String, JsonValue>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Map<String, JsonValue>>::deserialize(deserializer)?.unwrap_or_default())
}

/// What to do with one entry of the file.
#[derive(Debug)]
pub enum EntryStatus {
    Disabled,
    Ready(ServerConfig),
    Invalid(McpError),
}

impl McpServersConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a configuration file, as TOML when the extension is `.toml`.
    pub fn load(path: &Path) -> McpResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| McpError::Config(format!("Failed to read {}: {}", path.display(), e)))?;

        let is_toml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));

        let value = if is_toml {
            let table: toml::Table = toml::from_str(&content)
                .map_err(|e| McpError::Config(format!("Failed to parse {}: {}", path.display(), e)))?;
            serde_json::to_value(table)?
        } else {
            serde_json::from_str(&content)
                .map_err(|e| McpError::Config(format!("Failed to parse {}: {}", path.display(), e)))?
        };

        Self::from_value(value)
    }

    pub fn from_value(value: JsonValue) -> McpResult<Self> {
        serde_json::from_value(value).map_err(|e| McpError::Config(format!("Invalid configuration: {}", e)))
    }

    /// Adds or replaces an entry.
    pub fn with_server(mut self, name: impl Into<String>, entry: ServerEntry) -> Self {
        // ServerEntry always serializes to an object.
        if let Ok(value) = serde_json::to_value(entry) {
            self.mcp_servers.insert(name.into(), value);
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.mcp_servers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.mcp_servers.len()
    }

    /// Classifies every entry, in file order, without connecting anything.
    pub fn resolve(&self) -> Vec<(String, EntryStatus)> {
        self.mcp_servers
            .iter()
            .map(|(name, value)| (name.clone(), resolve_entry(name, value)))
            .collect()
    }
}

fn resolve_entry(name: &str, value: &JsonValue) -> EntryStatus {
    if !value.is_object() {
        return EntryStatus::Invalid(McpError::validation(name, "server entry must be an object"));
    }
    if value.get("disabled").and_then(JsonValue::as_bool) == Some(true) {
        return EntryStatus::Disabled;
    }

    match ServerEntry::deserialize(value) {
        Ok(entry) => match entry.validate(name) {
            Ok(config) => EntryStatus::Ready(config),
            Err(e) => EntryStatus::Invalid(e),
        },
        Err(e) => EntryStatus::Invalid(McpError::validation(name, e.to_string())),
    }
}

// =============================================================================
// Loader tuning
// =============================================================================

/// Timeouts and concurrency for loading servers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderOptions {
    /// Covers transport open, handshake and tool discovery.
    pub connect_timeout: Duration,
    /// Covers one tool invocation.
    pub call_timeout: Duration,
    /// 1 connects servers one after another.
    pub max_concurrent_connects: usize,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            call_timeout: Duration::from_secs(60),
            max_concurrent_connects: 1,
        }
    }
}

impl LoaderOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Values below 1 are raised to 1.
    pub fn with_max_concurrent_connects(mut self, max: usize) -> Self {
        self.max_concurrent_connects = max.max(1);
        self
    }

    /// Build from environment variables
    ///
    /// Reads:
    /// - `TOOLHOST_CONNECT_TIMEOUT_SECS` → connect_timeout
    /// - `TOOLHOST_CALL_TIMEOUT_SECS` → call_timeout
    /// - `TOOLHOST_MAX_CONCURRENT_CONNECTS` → max_concurrent_connects
    ///
    /// Unset or unparsable values keep their defaults.
    pub fn from_env() -> Self {
        let mut options = Self::default();

        if let Some(secs) = env_number("TOOLHOST_CONNECT_TIMEOUT_SECS") {
            options.connect_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = env_number("TOOLHOST_CALL_TIMEOUT_SECS") {
            options.call_timeout = Duration::from_secs(secs);
        }
        if let Some(max) = env_number("TOOLHOST_MAX_CONCURRENT_CONNECTS") {
            options = options.with_max_concurrent_connects(max as usize);
        }
        options
    }
}

fn env_number(key: &str) -> Option<u64> {
    let raw = env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("Ignoring {}={:?}: not a non-negative integer", key, raw);
            None
        }
    }
}
