//! Configuration for logging

use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Receives each formatted log line. Called from the tracing layer; must not block.
pub type LogSink = Arc<dyn Fn(String) + Send + Sync>;

/// Observability configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Service name, logged once at start-up
    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// Log level filter (e.g., "info", "toolhost_mcp=debug")
    /// Falls back to `TOOLHOST_LOG`, then `RUST_LOG`, then "info"
    #[serde(default)]
    pub log_level: Option<String>,

    /// Write formatted logs to stderr
    #[serde(default = "default_true")]
    pub enable_console: bool,

    /// Use ANSI colors on the console
    #[serde(default = "default_true")]
    pub ansi: bool,

    /// Optional sink for each formatted log line. Not serialized.
    #[serde(skip)]
    pub log_sink: Option<LogSink>,
}

fn default_service_name() -> String {
    "toolhost".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            service_name: default_service_name(),
            log_level: None,
            enable_console: true,
            ansi: true,
            log_sink: None,
        }
    }
}

impl std::fmt::Debug for ObservabilityConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObservabilityConfig")
            .field("service_name", &self.service_name)
            .field("log_level", &self.log_level)
            .field("enable_console", &self.enable_console)
            .field("ansi", &self.ansi)
            .field("log_sink", &self.log_sink.as_ref().map(|_| "Some(LogSink)"))
            .finish()
    }
}

impl ObservabilityConfig {
    /// Create a new configuration with service name
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            ..Default::default()
        }
    }

    /// Enable or disable console output
    pub fn with_console(mut self, enable: bool) -> Self {
        self.enable_console = enable;
        self
    }

    pub fn with_ansi(mut self, ansi: bool) -> Self {
        self.ansi = ansi;
        self
    }

    /// Set log level
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = Some(level.into());
        self
    }

    /// Sink for formatted log lines; must not block.
    pub fn with_log_sink(mut self, sink: LogSink) -> Self {
        self.log_sink = Some(sink);
        self
    }

    /// Build from environment variables
    ///
    /// Reads:
    /// - `TOOLHOST_SERVICE_NAME` → service_name
    /// - `TOOLHOST_LOG` or `RUST_LOG` → log_level
    /// - `NO_COLOR` (any value) → disables ANSI colors
    pub fn from_env() -> Self {
        let service_name = std::env::var("TOOLHOST_SERVICE_NAME").unwrap_or_else(|_| default_service_name());

        let log_level = std::env::var("TOOLHOST_LOG")
            .or_else(|_| std::env::var("RUST_LOG"))
            .ok();

        Self {
            service_name,
            log_level,
            enable_console: true,
            ansi: std::env::var_os("NO_COLOR").is_none(),
            log_sink: None,
        }
    }
}
