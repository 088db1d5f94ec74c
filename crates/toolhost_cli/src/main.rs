//! CLI entry point for toolhost.

mod cli;
mod commands;
mod output;

use clap::Parser;
use toolhost_observability::ObservabilityConfig;

use crate::cli::Cli;

/// Loads the nearest `.env` from the working directory upwards, so
/// `TOOLHOST_*` settings can live next to the server config. Variables
/// already set in the environment win.
fn load_dotenv() {
    let Ok(cwd) = std::env::current_dir() else {
        return;
    };
    if let Some(env_file) = cwd.ancestors().map(|dir| dir.join(".env")).find(|f| f.exists()) {
        let _ = dotenvy::from_path(&env_file);
    }
}

#[tokio::main]
async fn main() {
    load_dotenv();
    let cli = Cli::parse();
    output::init(cli.output);

    let mut observability = ObservabilityConfig::from_env();
    if output::is_json() {
        observability = observability.with_ansi(false);
    }
    if cli.verbose {
        observability = observability.with_log_level("debug");
    } else if observability.log_level.is_none() {
        observability = observability.with_log_level("warn");
    }
    if let Err(e) = toolhost_observability::init(observability) {
        output::warning(&format!("Logging disabled: {e}"));
    }

    if let Err(e) = commands::handle(cli).await {
        output::error(&format!("{e:#}"));
        std::process::exit(1);
    }
}
