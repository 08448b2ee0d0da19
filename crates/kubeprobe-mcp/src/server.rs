//! MCP stdio server: reads JSON-RPC from stdin, writes to stdout.

use std::io;
use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, info};

use crate::protocol::*;
use crate::tools;
use kubeprobe_query::QueryDispatcher;

/// MCP Server that communicates over stdin/stdout.
pub struct McpServer {
    dispatcher: Arc<QueryDispatcher>,
    name: String,
}

impl McpServer {
    pub fn new(dispatcher: Arc<QueryDispatcher>) -> Self {
        Self {
            dispatcher,
            name: "kubeprobe".into(),
        }
    }

    /// Run the server on stdin/stdout until EOF.
    pub async fn run(&self) -> io::Result<()> {
        let stdin = BufReader::new(tokio::io::stdin());
        let stdout = tokio::io::stdout();
        self.serve(stdin, stdout).await
    }

    /// Serve line-delimited JSON-RPC from `reader`, writing responses to `writer`.
    pub async fn serve<R, W>(&self, mut reader: R, mut writer: W) -> io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        info!("MCP server ready");
        let mut line = String::new();

        loop {
            line.clear();
            let n = reader.read_line(&mut line).await?;
            if n == 0 {
                break;
            }

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            let Some(response) = self.handle_message(trimmed).await else {
                continue;
            };
            let mut out = serde_json::to_string(&response)?;
            out.push('\n');
            writer.write_all(out.as_bytes()).await?;
            writer.flush().await?;
        }

        info!("stdin closed, MCP server stopping");
        Ok(())
    }

    /// Handle a single JSON-RPC message. Notifications produce no response.
    pub async fn handle_message(&self, msg: &str) -> Option<JsonRpcResponse> {
        let req: JsonRpcRequest = match serde_json::from_str(msg) {
            Ok(r) => r,
            Err(e) => {
                return Some(JsonRpcResponse::error(
                    None,
                    PARSE_ERROR,
                    format!("parse error: {e}"),
                ));
            }
        };

        debug!(method = %req.method, "received request");
        if req.is_notification() {
            return None;
        }

        let id = req.id.clone();
        let response = match req.method.as_str() {
            "initialize" => self.handle_initialize(id),
            "tools/list" => self.handle_tools_list(id),
            "tools/call" => self.handle_tools_call(id, &req.params).await,
            "ping" => JsonRpcResponse::success(id, serde_json::json!({})),
            _ => JsonRpcResponse::error(
                id,
                METHOD_NOT_FOUND,
                format!("method not found: {}", req.method),
            ),
        };
        Some(response)
    }

    fn handle_initialize(&self, id: Option<serde_json::Value>) -> JsonRpcResponse {
        let result = InitializeResult {
            protocol_version: PROTOCOL_VERSION.into(),
            capabilities: ServerCapabilities {
                tools: ToolCapability { list_changed: false },
            },
            server_info: ServerInfo {
                name: self.name.clone(),
                version: env!("CARGO_PKG_VERSION").into(),
            },
        };
        JsonRpcResponse::success(id, serde_json::to_value(&result).unwrap_or_default())
    }

    fn handle_tools_list(&self, id: Option<serde_json::Value>) -> JsonRpcResponse {
        let tool_list = tools::list_tools();
        JsonRpcResponse::success(id, serde_json::json!({ "tools": tool_list }))
    }

    async fn handle_tools_call(
        &self,
        id: Option<serde_json::Value>,
        params: &serde_json::Value,
    ) -> JsonRpcResponse {
        let Some(name) = params.get("name").and_then(|v| v.as_str()) else {
            return JsonRpcResponse::error(id, INVALID_PARAMS, "missing tool name".into());
        };

        let args = params
            .get("arguments")
            .cloned()
            .unwrap_or(serde_json::json!({}));

        match tools::call_tool(name, &args, &self.dispatcher).await {
            Ok(result) => {
                JsonRpcResponse::success(id, serde_json::to_value(&result).unwrap_or_default())
            }
            Err(e) => JsonRpcResponse::error(id, e.code(), e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kubeprobe_k8s::ClusterError;
    use kubeprobe_k8s::testing::FakeClusterClient;

    fn test_server(client: FakeClusterClient) -> McpServer {
        let dispatcher = QueryDispatcher::new(Arc::new(client));
        McpServer::new(Arc::new(dispatcher))
    }

    fn namespace(name: &str) -> kubeprobe_k8s::k8s_openapi::api::core::v1::Namespace {
        serde_json::from_value(serde_json::json!({
            "apiVersion": "v1",
            "kind": "Namespace",
            "metadata": { "name": name },
            "status": { "phase": "Active" }
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn handle_initialize() {
        let server = test_server(FakeClusterClient::new());
        let resp = server
            .handle_message(
                r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{"protocolVersion":"2024-11-05","capabilities":{}}}"#,
            )
            .await
            .unwrap();
        let r = resp.result.unwrap();
        assert_eq!(r["protocolVersion"], "2024-11-05");
        assert_eq!(r["serverInfo"]["name"], "kubeprobe");
    }

    #[tokio::test]
    async fn initialized_notification_has_no_response() {
        let server = test_server(FakeClusterClient::new());
        let resp = server
            .handle_message(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
            .await;
        assert!(resp.is_none());
    }

    #[tokio::test]
    async fn handle_tools_list() {
        let server = test_server(FakeClusterClient::new());
        let resp = server
            .handle_message(r#"{"jsonrpc":"2.0","id":2,"method":"tools/list","params":{}}"#)
            .await
            .unwrap();
        let r = resp.result.unwrap();
        let tools = r["tools"].as_array().unwrap();
        assert_eq!(tools.len(), 12);
        assert!(tools.iter().any(|t| t["name"] == "get_resource_yaml"));
    }

    #[tokio::test]
    async fn handle_tools_call_get_namespaces() {
        let server =
            test_server(FakeClusterClient::new().with_namespaces(vec![namespace("default")]));
        let resp = server
            .handle_message(
                r#"{"jsonrpc":"2.0","id":3,"method":"tools/call","params":{"name":"get_namespaces","arguments":{}}}"#,
            )
            .await
            .unwrap();
        let r = resp.result.unwrap();
        assert!(r.get("isError").is_none());
        let text = r["content"][0]["text"].as_str().unwrap();
        let namespaces: serde_json::Value = serde_json::from_str(text).unwrap();
        assert_eq!(namespaces[0]["name"], "default");
    }

    #[tokio::test]
    async fn tools_call_unsupported_kind_is_tool_error() {
        let server = test_server(FakeClusterClient::new());
        let resp = server
            .handle_message(
                r#"{"jsonrpc":"2.0","id":4,"method":"tools/call","params":{"name":"get_resource_yaml","arguments":{"namespace":"default","resource_type":"ingress","resource_name":"web"}}}"#,
            )
            .await
            .unwrap();
        let r = resp.result.unwrap();
        assert_eq!(r["isError"], true);
        assert_eq!(r["_meta"]["status"], 400);
        assert!(
            r["content"][0]["text"]
                .as_str()
                .unwrap()
                .contains("Unsupported resource type: ingress")
        );
    }

    #[tokio::test]
    async fn tools_call_cluster_failure_is_tool_error() {
        let server = test_server(FakeClusterClient::failing(ClusterError::new("unreachable")));
        let resp = server
            .handle_message(
                r#"{"jsonrpc":"2.0","id":5,"method":"tools/call","params":{"name":"list_nodes"}}"#,
            )
            .await
            .unwrap();
        let r = resp.result.unwrap();
        assert_eq!(r["isError"], true);
        assert_eq!(r["_meta"]["status"], 500);
    }

    #[tokio::test]
    async fn tools_call_missing_argument() {
        let server = test_server(FakeClusterClient::new());
        let resp = server
            .handle_message(
                r#"{"jsonrpc":"2.0","id":6,"method":"tools/call","params":{"name":"get_resource_yaml","arguments":{"namespace":"default"}}}"#,
            )
            .await
            .unwrap();
        assert_eq!(resp.error.unwrap().code, INVALID_PARAMS);
    }

    #[tokio::test]
    async fn tools_call_unknown_tool() {
        let server = test_server(FakeClusterClient::new());
        let resp = server
            .handle_message(
                r#"{"jsonrpc":"2.0","id":7,"method":"tools/call","params":{"name":"delete_pod"}}"#,
            )
            .await
            .unwrap();
        let err = resp.error.unwrap();
        assert_eq!(err.code, INVALID_PARAMS);
        assert!(err.message.contains("delete_pod"));
    }

    #[tokio::test]
    async fn handle_unknown_method() {
        let server = test_server(FakeClusterClient::new());
        let resp = server
            .handle_message(r#"{"jsonrpc":"2.0","id":8,"method":"bogus","params":{}}"#)
            .await
            .unwrap();
        assert_eq!(resp.error.unwrap().code, METHOD_NOT_FOUND);
    }

    #[tokio::test]
    async fn handle_invalid_json() {
        let server = test_server(FakeClusterClient::new());
        let resp = server.handle_message("not json").await.unwrap();
        assert_eq!(resp.error.unwrap().code, PARSE_ERROR);
    }

    #[tokio::test]
    async fn serve_writes_one_line_per_request() {
        let server = test_server(FakeClusterClient::new());
        let input = concat!(
            r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#,
            "\n",
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
            "\n\n",
            r#"{"jsonrpc":"2.0","id":2,"method":"tools/call","params":{"name":"failed_pods"}}"#,
            "\n",
        );
        let mut output = Vec::new();

        server.serve(input.as_bytes(), &mut output).await.unwrap();

        let output = String::from_utf8(output).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 2);
        let second: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second["id"], 2);
        assert_eq!(second["result"]["content"][0]["text"], "[]");
    }
}
