//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Connect to MCP servers and call their tools
#[derive(Parser)]
#[command(name = "toolhost", about, version, propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Server configuration file (default: ./mcp.json, then <config dir>/toolhost/mcp.json)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format: text (human-readable) or json (machine-readable)
    #[arg(short, long, global = true, default_value = "text")]
    pub output: OutputFormat,
}

#[derive(Clone, Copy, Debug, Default, ValueEnum)]
pub enum OutputFormat {
    /// Colored terminal output for humans
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Validate the configuration without connecting
    Check,
    /// Connect every enabled server and list its tools
    List,
    /// Call a tool by name
    Call {
        /// Tool name as reported by `toolhost list`
        tool: String,
        /// Arguments as a JSON object, e.g. '{"path": "README.md"}'
        #[arg(long)]
        args: Option<String>,
    },
}
