//! `toolhost call`: invoke one tool by name.

use std::path::Path;

use anyhow::{Context, Result, anyhow, bail};
use serde_json::Value as JsonValue;
use toolhost_mcp::{JsonMap, LoaderOptions, McpRegistry, Tool};

use crate::output;

pub async fn handle(config_path: &Path, tool_name: &str, args: Option<&str>) -> Result<()> {
    let arguments = parse_args(args)?;
    let registry = McpRegistry::with_options(LoaderOptions::from_env());

    let spinner = output::spinner("Connecting MCP servers");
    let tools = registry.load_tools(config_path).await;
    spinner.finish_and_clear();

    let outcome = match tools.iter().find(|tool| tool.name() == tool_name) {
        Some(tool) => {
            output::dim(&format!("Calling {} on {}", tool_name, tool.server()));
            Ok(tool.invoke(arguments).await)
        }
        None => Err(anyhow!(
            "Tool '{}' not found ({} tools loaded). Run `toolhost list` to see them.",
            tool_name,
            tools.len()
        )),
    };

    // Cleanup runs whatever the outcome.
    registry.cleanup_all().await;

    let result = outcome?;
    if !result.success {
        bail!("{}: {}", tool_name, result.error);
    }
    output::data(tool_name, &result, &result.content);
    Ok(())
}

/// Parses `--args`, which must be a JSON object when given.
fn parse_args(args: Option<&str>) -> Result<JsonMap> {
    let Some(raw) = args else {
        return Ok(JsonMap::new());
    };
    let value: JsonValue = serde_json::from_str(raw).context("--args is not valid JSON")?;
    match value {
        JsonValue::Object(map) => Ok(map),
        other => bail!("--args must be a JSON object, got: {}", other),
    }
}
