//! Stdio transport: the server is a child process speaking newline-delimited
//! JSON on stdin/stdout.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{Transport, TransportKind};
use crate::config::StdioParams;
use crate::error::{McpError, McpResult};

/// How long a server gets to exit after its stdin closes before it is killed.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Stdio-based transport for local MCP server processes.
pub struct StdioTransport {
    server: String,
    process: Option<Child>,
    stdin: Option<ChildStdin>,
    stdout: Lines<BufReader<ChildStdout>>,
    stderr_task: Option<JoinHandle<()>>,
}

impl StdioTransport {
    /// Spawns the server process with the configured environment layered
    /// over the current one.
    pub fn spawn(server: &str, params: &StdioParams) -> McpResult<Self> {
        info!(server, command = %params.command, args = ?params.args, "Starting MCP server process");

        let mut cmd = Command::new(&params.command);
        cmd.args(&params.args)
            .envs(&params.env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut process = cmd
            .spawn()
            .map_err(|e| McpError::StartFailed(format!("Failed to start '{}': {}", params.command, e)))?;

        let stdin = process
            .stdin
            .take()
            .ok_or_else(|| McpError::StartFailed("Could not capture stdin".to_string()))?;
        let stdout = process
            .stdout
            .take()
            .ok_or_else(|| McpError::StartFailed("Could not capture stdout".to_string()))?;

        let stderr_task = process.stderr.take().map(|stderr| {
            let server = server.to_string();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    debug!(server = %server, "stderr: {}", line);
                }
            })
        });

        Ok(Self {
            server: server.to_string(),
            process: Some(process),
            stdin: Some(stdin),
            stdout: BufReader::new(stdout).lines(),
            stderr_task,
        })
    }
}

#[async_trait]
impl Transport for StdioTransport {
    async fn send(&mut self, message: JsonValue) -> McpResult<()> {
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| McpError::TransportClosed("stdin already closed".to_string()))?;

        let mut line = serde_json::to_string(&message)?;
        debug!("[MCP:{}] Sending: {}", self.server, line);
        line.push('\n');

        stdin.write_all(line.as_bytes()).await?;
        stdin.flush().await?;
        Ok(())
    }

    async fn receive(&mut self) -> McpResult<JsonValue> {
        loop {
            let Some(line) = self.stdout.next_line().await? else {
                return Err(McpError::TransportClosed(
                    "server stdout closed (process may have exited)".to_string(),
                ));
            };

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            match serde_json::from_str::<JsonValue>(trimmed) {
                Ok(message) => {
                    debug!("[MCP:{}] Received: {}", self.server, trimmed);
                    return Ok(message);
                }
                // Servers sometimes print banners on stdout.
                Err(_) => debug!("[MCP:{}] Skipping non-JSON output: {}", self.server, trimmed),
            }
        }
    }

    async fn close(&mut self) -> McpResult<()> {
        // Closing stdin is the protocol's shutdown signal for stdio servers.
        drop(self.stdin.take());

        if let Some(mut process) = self.process.take() {
            match tokio::time::timeout(SHUTDOWN_GRACE, process.wait()).await {
                Ok(Ok(status)) => debug!("[MCP:{}] Process exited: {}", self.server, status),
                Ok(Err(e)) => warn!("[MCP:{}] Failed to wait for process: {}", self.server, e),
                Err(_) => {
                    debug!("[MCP:{}] Process did not exit, killing", self.server);
                    process.kill().await?;
                }
            }
        }

        if let Some(task) = self.stderr_task.take() {
            task.abort();
        }
        Ok(())
    }

    fn kind(&self) -> TransportKind {
        TransportKind::Stdio
    }
}

impl Drop for StdioTransport {
    fn drop(&mut self) {
        if let Some(mut process) = self.process.take() {
            let _ = process.start_kill();
        }
        if let Some(task) = self.stderr_task.take() {
            task.abort();
        }
    }
}
