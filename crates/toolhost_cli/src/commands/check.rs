//! `toolhost check`: classify every configured server without connecting.

use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::Serialize;
use toolhost_mcp::{EntryStatus, McpServersConfig};

use crate::output;

#[derive(Debug, Serialize)]
struct EntryReport {
    name: String,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    transport: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    endpoint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl EntryReport {
    fn new(name: String, status: EntryStatus) -> Self {
        match status {
            EntryStatus::Disabled => Self {
                name,
                status: "disabled",
                transport: None,
                endpoint: None,
                error: None,
            },
            EntryStatus::Ready(server) => Self {
                name,
                status: "ok",
                transport: Some(server.kind().to_string()),
                endpoint: Some(server.transport.endpoint()),
                error: None,
            },
            EntryStatus::Invalid(e) => Self {
                name,
                status: "invalid",
                transport: None,
                endpoint: None,
                error: Some(e.to_string()),
            },
        }
    }
}

pub fn handle(config_path: &Path) -> Result<()> {
    if !config_path.exists() {
        bail!("Config file not found: {}", config_path.display());
    }
    let config = McpServersConfig::load(config_path)
        .with_context(|| format!("Cannot use {}", config_path.display()))?;

    let reports: Vec<_> = config
        .resolve()
        .into_iter()
        .map(|(name, status)| EntryReport::new(name, status))
        .collect();

    if reports.is_empty() {
        output::warning("No MCP servers configured.");
        return Ok(());
    }

    output::header(&format!("MCP servers in {}", config_path.display()));
    let mut table = output::table(&["Server", "Status", "Transport", "Endpoint / Error"]);
    for report in &reports {
        let detail = report
            .error
            .as_deref()
            .or(report.endpoint.as_deref())
            .unwrap_or("");
        output::table_row(
            &mut table,
            &[report.name.as_str(), report.status, report.transport.as_deref().unwrap_or("-"), detail],
        );
    }
    output::table_print(&table, &reports);

    let invalid = reports.iter().filter(|r| r.status == "invalid").count();
    if invalid > 0 {
        bail!("{} of {} server entries are invalid", invalid, reports.len());
    }
    output::success("Configuration is valid");
    Ok(())
}

#[cfg(test)]
mod tests {
    use toolhost_mcp::{McpError, ServerConfig};

    use super::*;

    #[test]
    fn test_report_for_each_status() {
        let ready = EntryReport::new(
            "docs".into(),
            EntryStatus::Ready(ServerConfig::streamable_http("docs", "https://docs.example/mcp")),
        );
        assert_eq!(ready.status, "ok");
        assert_eq!(ready.transport.as_deref(), Some("streamable_http"));
        assert_eq!(ready.endpoint.as_deref(), Some("https://docs.example/mcp"));

        let invalid = EntryReport::new("x".into(), EntryStatus::Invalid(McpError::Validation {
                server: "x".into(),
                reason: "missing command".into(),
            }));
        assert_eq!(invalid.status, "invalid");
        assert!(invalid.error.unwrap().contains("missing command"));

        let disabled = EntryReport::new("y".into(), EntryStatus::Disabled);
        let json = serde_json::to_value(&disabled).unwrap();
        assert_eq!(json, serde_json::json!({ "name": "y", "status": "disabled" }));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(handle(&dir.path().join("none.json")).is_err());
    }
}
