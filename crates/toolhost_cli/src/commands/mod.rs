//! Command dispatch.

pub mod call;
pub mod check;
pub mod list;

use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::cli::{Cli, Command};

const CONFIG_FILE: &str = "mcp.json";

pub async fn handle(cli: Cli) -> Result<()> {
    let config = cli.config.unwrap_or_else(default_config_path);
    match cli.command {
        Command::Check => check::handle(&config),
        Command::List => list::handle(&config).await,
        Command::Call { tool, args } => call::handle(&config, &tool, args.as_deref()).await,
    }
}

/// `./mcp.json` when present, else `<config dir>/toolhost/mcp.json`.
fn default_config_path() -> PathBuf {
    resolve_config_path(Path::new(CONFIG_FILE), dirs::config_dir())
}

fn resolve_config_path(local: &Path, config_dir: Option<PathBuf>) -> PathBuf {
    if local.exists() {
        return local.to_path_buf();
    }
    match config_dir {
        Some(dir) => dir.join("toolhost").join(CONFIG_FILE),
        None => local.to_path_buf(),
    }
}
