//! `toolhost list`: connect every enabled server and list its tools.

use std::path::Path;

use anyhow::Result;
use serde::Serialize;
use toolhost_mcp::{LoaderOptions, McpRegistry, Tool};

use crate::output;

#[derive(Serialize)]
struct ToolRow<'a> {
    server: &'a str,
    name: &'a str,
    description: &'a str,
}

pub async fn handle(config_path: &Path) -> Result<()> {
    let registry = McpRegistry::with_options(LoaderOptions::from_env());

    let spinner = output::spinner(&format!("Connecting MCP servers from {}", config_path.display()));
    let tools = registry.load_tools(config_path).await;
    let servers = registry.servers().await;

    if tools.is_empty() {
        output::spinner_warning(&spinner, "No tools available.");
        output::dim("Run `toolhost check` to validate the configuration.");
    } else {
        output::spinner_success(
            &spinner,
            &format!("{} tools from {} servers", tools.len(), servers.len()),
        );

        let rows: Vec<_> = tools
            .iter()
            .map(|tool| ToolRow {
                server: tool.server(),
                name: tool.name(),
                description: tool.description(),
            })
            .collect();

        let mut table = output::table(&["Server", "Tool", "Description"]);
        for row in &rows {
            output::table_row(&mut table, &[row.server, row.name, row.description]);
        }
        output::table_print(&table, &rows);
    }

    registry.cleanup_all().await;
    Ok(())
}
