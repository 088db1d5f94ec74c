use std::time::Duration;

use serde_json::json;

use crate::config::{LoaderOptions, ServerConfig};
use crate::connection::ServerConnection;
use crate::tests::support::{RecordingConnector, ScriptedServer, runtime};
use crate::tool::{JsonMap, REMOTE_TOOL_ERROR, Tool};

async fn connect(server: ScriptedServer, call_timeout: Duration) -> ServerConnection {
    let connector = RecordingConnector::new().with_server("s", server);
    let options = LoaderOptions::new().with_call_timeout(call_timeout);
    let mut connection = ServerConnection::new(ServerConfig::stdio("s", "x"), &options);
    connection.connect(&connector).await.unwrap();
    connection
}

fn args(value: serde_json::Value) -> JsonMap {
    value.as_object().cloned().unwrap()
}

#[test]
fn test_tool_exposes_descriptor() {
    runtime().block_on(async {
        let connection = connect(ScriptedServer::new().with_tool("search", "Search things"), Duration::from_secs(1)).await;
        let tool = &connection.tools()[0];

        assert_eq!(tool.name(), "search");
        assert_eq!(tool.description(), "Search things");
        assert_eq!(tool.parameters_schema()["type"], "object");
    });
}

#[test]
fn test_invoke_joins_text_items() {
    runtime().block_on(async {
        let server = ScriptedServer::new().with_tool("abc", "").with_call_result(
            "abc",
            json!({"content": [
                {"type": "text", "text": "a"},
                {"type": "text", "text": "b"},
                {"type": "text", "text": "c"}
            ]}),
        );
        let connection = connect(server, Duration::from_secs(1)).await;

        let result = connection.tools()[0].invoke(JsonMap::new()).await;

        assert!(result.success);
        assert_eq!(result.content, "a\nb\nc");
        assert_eq!(result.error, "");
    });
}

#[test]
fn test_invoke_passes_arguments() {
    runtime().block_on(async {
        let connection = connect(ScriptedServer::new().with_tool("echo", ""), Duration::from_secs(1)).await;

        let result = connection.tools()[0].invoke(args(json!({"text": "hi", "n": 2}))).await;

        assert!(result.success);
        assert_eq!(result.content, r#"{"text":"hi","n":2}"#);
    });
}

#[test]
fn test_invoke_with_remote_error_flag() {
    runtime().block_on(async {
        let server = ScriptedServer::new().with_tool("fail", "").with_call_result(
            "fail",
            json!({"content": [{"type": "text", "text": "disk full"}], "isError": true}),
        );
        let connection = connect(server, Duration::from_secs(1)).await;

        let result = connection.tools()[0].invoke(JsonMap::new()).await;

        assert!(!result.success);
        assert_eq!(result.content, "");
        assert_eq!(result.error, REMOTE_TOOL_ERROR);
    });
}

#[test]
fn test_invoke_with_non_text_content() {
    runtime().block_on(async {
        let server = ScriptedServer::new().with_tool("shot", "").with_call_result(
            "shot",
            json!({"content": [
                {"type": "text", "text": "screenshot:"},
                {"type": "image", "data": "AAAA", "mimeType": "image/png"}
            ]}),
        );
        let connection = connect(server, Duration::from_secs(1)).await;

        let result = connection.tools()[0].invoke(JsonMap::new()).await;

        assert!(result.success);
        let mut lines = result.content.lines();
        assert_eq!(lines.next(), Some("screenshot:"));
        let image: serde_json::Value = serde_json::from_str(lines.next().unwrap()).unwrap();
        assert_eq!(image["mimeType"], "image/png");
    });
}

#[test]
fn test_invoke_protocol_error_becomes_failure() {
    runtime().block_on(async {
        let server = ScriptedServer::new().with_tool("echo", "").failing_method("tools/call");
        let connection = connect(server, Duration::from_secs(1)).await;

        let result = connection.tools()[0].invoke(JsonMap::new()).await;

        assert!(!result.success);
        assert!(result.content.is_empty());
        assert!(result.error.starts_with("MCP tool execution failed: "));
        assert!(result.error.contains("tools/call failed"));
    });
}

#[test]
fn test_invoke_timeout_becomes_failure() {
    runtime().block_on(async {
        let server = ScriptedServer::new().with_tool("slow", "").hanging_method("tools/call");
        let connection = connect(server, Duration::from_millis(50)).await;

        let result = connection.tools()[0].invoke(JsonMap::new()).await;

        assert!(!result.success);
        assert!(result.error.contains("Timed out"));
    });
}
