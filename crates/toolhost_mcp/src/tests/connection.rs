use std::time::Duration;

use crate::config::{LoaderOptions, ServerConfig};
use crate::connection::{ConnectionState, ServerConnection};
use crate::error::McpError;
use crate::tests::support::{RecordingConnector, ScriptedServer, runtime};
use crate::tool::Tool;
use crate::transport::TransportKind;

fn options() -> LoaderOptions {
    LoaderOptions::new()
        .with_connect_timeout(Duration::from_millis(500))
        .with_call_timeout(Duration::from_millis(500))
}

#[test]
fn test_connect_discovers_tools_in_order() {
    runtime().block_on(async {
        let connector = RecordingConnector::new().with_server(
            "files",
            ScriptedServer::new()
                .with_tool("read_file", "Read a file")
                .with_tool("write_file", "Write a file"),
        );
        let mut connection = ServerConnection::new(ServerConfig::stdio("files", "mcp-files"), &options());
        assert_eq!(connection.state(), ConnectionState::Unconnected);

        connection.connect(&connector).await.unwrap();

        assert_eq!(connection.state(), ConnectionState::Ready);
        let names: Vec<_> = connection.tools().iter().map(|t| t.name().to_string()).collect();
        assert_eq!(names, ["read_file", "write_file"]);
        assert!(connection.tools().iter().all(|t| t.server() == "files"));
    });
}

#[test]
fn test_failed_handshake_releases_transport() {
    runtime().block_on(async {
        let connector = RecordingConnector::new()
            .with_server("broken", ScriptedServer::new().failing_method("initialize"));
        let mut connection = ServerConnection::new(ServerConfig::stdio("broken", "x"), &options());

        let err = connection.connect(&connector).await.unwrap_err();

        match err {
            McpError::Connect { server, transport, reason } => {
                assert_eq!(server, "broken");
                assert_eq!(transport, TransportKind::Stdio);
                assert!(reason.contains("initialize failed"));
            }
            other => panic!("expected Connect error, got {other:?}"),
        }
        assert_eq!(connection.state(), ConnectionState::Failed);
        assert!(connection.tools().is_empty());

        let probe = connector.probe("broken").unwrap();
        assert!(probe.is_released());
        assert_eq!(probe.close_calls(), 1);
    });
}

#[test]
fn test_failed_discovery_releases_transport() {
    runtime().block_on(async {
        let connector = RecordingConnector::new().with_server(
            "lister",
            ScriptedServer::new().with_tool("a", "").failing_method("tools/list"),
        );
        let mut connection = ServerConnection::new(ServerConfig::stdio("lister", "x"), &options());

        assert!(connection.connect(&connector).await.is_err());
        assert_eq!(connection.state(), ConnectionState::Failed);
        assert!(connector.probe("lister").unwrap().is_released());
    });
}

#[test]
fn test_connect_timeout_fails_and_releases() {
    runtime().block_on(async {
        let connector = RecordingConnector::new()
            .with_server("slow", ScriptedServer::new().hanging_method("initialize"));
        let options = options().with_connect_timeout(Duration::from_millis(50));
        let mut connection = ServerConnection::new(ServerConfig::stdio("slow", "x"), &options);

        let err = connection.connect(&connector).await.unwrap_err();

        assert!(err.to_string().contains("Timed out"));
        assert_eq!(connection.state(), ConnectionState::Failed);
        let probe = connector.probe("slow").unwrap();
        assert!(probe.is_released());
        assert_eq!(probe.close_calls(), 1);
    });
}

#[test]
fn test_transport_open_failure_is_connect_error() {
    runtime().block_on(async {
        let connector = RecordingConnector::new();
        let mut connection = ServerConnection::new(
            ServerConfig::streamable_http("ghost", "https://ghost.invalid/mcp"),
            &options(),
        );

        let err = connection.connect(&connector).await.unwrap_err();

        assert!(matches!(
            err,
            McpError::Connect { transport: TransportKind::StreamableHttp, .. }
        ));
        assert_eq!(connection.state(), ConnectionState::Failed);
    });
}

#[test]
fn test_connect_is_rejected_outside_unconnected() {
    runtime().block_on(async {
        let connector = RecordingConnector::new().with_server("s", ScriptedServer::new());
        let mut connection = ServerConnection::new(ServerConfig::stdio("s", "x"), &options());

        connection.connect(&connector).await.unwrap();
        let err = connection.connect(&connector).await.unwrap_err();

        assert!(matches!(err, McpError::InvalidState(_)));
        assert_eq!(connection.state(), ConnectionState::Ready);
        assert_eq!(connector.attempts(), ["s"]);
    });
}

#[test]
fn test_disconnect_is_idempotent() {
    runtime().block_on(async {
        let connector = RecordingConnector::new()
            .with_server("s", ScriptedServer::new().with_tool("echo", "Echo"));
        let mut connection = ServerConnection::new(ServerConfig::stdio("s", "x"), &options());
        connection.connect(&connector).await.unwrap();

        connection.disconnect().await.unwrap();
        connection.disconnect().await.unwrap();

        assert_eq!(connection.state(), ConnectionState::Disconnected);
        assert!(connection.tools().is_empty());
        assert_eq!(connector.probe("s").unwrap().close_calls(), 1);

        let mut unconnected = ServerConnection::new(ServerConfig::stdio("u", "x"), &options());
        unconnected.disconnect().await.unwrap();
        assert_eq!(unconnected.state(), ConnectionState::Unconnected);
    });
}

#[test]
fn test_tools_fail_after_disconnect() {
    runtime().block_on(async {
        let connector = RecordingConnector::new()
            .with_server("s", ScriptedServer::new().with_tool("echo", "Echo"));
        let mut connection = ServerConnection::new(ServerConfig::stdio("s", "x"), &options());
        connection.connect(&connector).await.unwrap();
        let tool = connection.tools()[0].clone();

        connection.disconnect().await.unwrap();
        let result = tool.invoke(Default::default()).await;

        assert!(!result.success);
        assert!(result.content.is_empty());
        assert!(result.error.starts_with("MCP tool execution failed: "));
    });
}
