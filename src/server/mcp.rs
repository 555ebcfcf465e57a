use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::io;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, error, info, warn};

use crate::api::{ExchangeRatesApi, RatesClient};
use crate::config::Config;
use crate::error::GatewayError;
use crate::server::registry::ToolRegistry;
use crate::tools::ToolRequest;

pub const PROTOCOL_VERSION: &str = "2024-11-05";
pub const SERVER_NAME: &str = "exchange-rates-mcp-server";
pub const INFO_RESOURCE_URI: &str = "exchangerates://info";

/// JSON-RPC 2.0 Request format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default)]
    pub params: Value,
    /// Absent for notifications
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
}

/// JSON-RPC 2.0 Response format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
    pub id: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcError {
    pub const PARSE_ERROR: i32 = -32700;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;

    fn new(code: i32, message: String) -> Self {
        JsonRpcError {
            code,
            message,
            data: None,
        }
    }
}

impl JsonRpcResponse {
    pub fn parse_error(detail: String) -> Self {
        JsonRpcResponse {
            jsonrpc: "2.0".to_string(),
            result: None,
            error: Some(JsonRpcError {
                code: JsonRpcError::PARSE_ERROR,
                message: "Parse error".to_string(),
                data: Some(Value::String(detail)),
            }),
            id: Value::Null,
        }
    }
}

/// MCP server exposing the exchange rate tools
pub struct McpServer {
    registry: Arc<ToolRegistry>,
}

impl McpServer {
    pub fn new(registry: ToolRegistry) -> Self {
        McpServer {
            registry: Arc::new(registry),
        }
    }

    /// Build the server with the HTTP provider client described by `config`
    pub fn from_config(config: &Config) -> crate::error::Result<Self> {
        info!(
            "Initializing MCP server against provider {}",
            config.base_url
        );

        let client: Arc<dyn ExchangeRatesApi> = Arc::new(RatesClient::new(config)?);
        let registry = ToolRegistry::with_exchange_tools(client)?;

        info!("MCP server initialized successfully");
        Ok(McpServer::new(registry))
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Handle a JSON-RPC message; notifications yield no response
    pub async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        debug!(
            "Handling MCP request: {} with params: {:?}",
            request.method, request.params
        );

        let Some(id) = request.id else {
            debug!("Received notification {}", request.method);
            return None;
        };

        let response = match request.method.as_str() {
            "initialize" => Ok(self.handle_initialize()),
            "ping" => Ok(json!({})),
            "tools/list" => self.handle_tools_list(),
            "tools/call" => self.handle_tool_call(&request.params).await,
            "resources/list" => Ok(self.handle_resources_list()),
            "resources/read" => self.handle_resource_read(&request.params),
            _ => Err(JsonRpcError::new(
                JsonRpcError::METHOD_NOT_FOUND,
                format!("Method not found: {}", request.method),
            )),
        };

        Some(match response {
            Ok(result) => JsonRpcResponse {
                jsonrpc: "2.0".to_string(),
                result: Some(result),
                error: None,
                id,
            },
            Err(err) => JsonRpcResponse {
                jsonrpc: "2.0".to_string(),
                result: None,
                error: Some(err),
                id,
            },
        })
    }

    fn handle_initialize(&self) -> Value {
        json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {
                "tools": {"listChanged": false},
                "resources": {"listChanged": false}
            },
            "serverInfo": {
                "name": SERVER_NAME,
                "version": env!("CARGO_PKG_VERSION")
            }
        })
    }

    fn handle_tools_list(&self) -> Result<Value, JsonRpcError> {
        let tools = serde_json::to_value(self.registry.definitions()).map_err(|e| {
            JsonRpcError::new(JsonRpcError::INTERNAL_ERROR, format!("Internal error: {}", e))
        })?;
        Ok(json!({ "tools": tools }))
    }

    async fn handle_tool_call(&self, params: &Value) -> Result<Value, JsonRpcError> {
        let call: ToolRequest = serde_json::from_value(params.clone()).map_err(|e| {
            JsonRpcError::new(
                JsonRpcError::INVALID_PARAMS,
                format!("Missing or invalid 'name' parameter: {}", e),
            )
        })?;

        match self.registry.dispatch(&call.name, call.arguments).await {
            Ok(envelope) => Ok(json!({
                "content": [{"type": "text", "text": envelope.to_json_string()}],
                "isError": !envelope.is_success()
            })),
            Err(GatewayError::UnknownOperation(name)) => Err(JsonRpcError::new(
                JsonRpcError::METHOD_NOT_FOUND,
                format!("Tool not found: {}", name),
            )),
            Err(e) => Err(JsonRpcError::new(
                JsonRpcError::INTERNAL_ERROR,
                format!("Tool call failed: {}", e),
            )),
        }
    }

    fn handle_resources_list(&self) -> Value {
        json!({
            "resources": [{
                "uri": INFO_RESOURCE_URI,
                "name": "Exchange Rates API information",
                "description": "Overview of the available exchange rate tools",
                "mimeType": "text/plain"
            }]
        })
    }

    fn handle_resource_read(&self, params: &Value) -> Result<Value, JsonRpcError> {
        let uri = params.get("uri").and_then(Value::as_str).ok_or_else(|| {
            JsonRpcError::new(
                JsonRpcError::INVALID_PARAMS,
                "Missing or invalid 'uri' parameter".to_string(),
            )
        })?;

        if uri != INFO_RESOURCE_URI {
            warn!("Unknown resource requested: {}", uri);
            return Err(JsonRpcError::new(
                JsonRpcError::INVALID_PARAMS,
                format!("Resource not found: {}", uri),
            ));
        }

        Ok(json!({
            "contents": [{
                "uri": INFO_RESOURCE_URI,
                "mimeType": "text/plain",
                "text": self.info_text()
            }]
        }))
    }

    fn info_text(&self) -> String {
        let mut text = String::from(
            "Exchange Rates Data API\n\n\
             Real-time and historical exchange rates for 170+ world currencies.\n\n\
             Available tools:\n",
        );
        for definition in self.registry.definitions() {
            text.push_str(&format!("- {}: {}\n", definition.name, definition.description));
        }
        text.push_str("\nData source: apilayer.com/exchangerates_data\n");
        text
    }
}

/// Serve newline-delimited JSON-RPC messages until the reader is exhausted.
pub async fn serve<R, W>(mut reader: R, mut writer: W, mcp_server: Arc<McpServer>) -> io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut line = String::new();

    while reader.read_line(&mut line).await? > 0 {
        let trimmed = line.trim();

        if trimmed.is_empty() {
            line.clear();
            continue;
        }

        let response = match serde_json::from_str::<JsonRpcRequest>(trimmed) {
            Ok(request) => {
                info!("Received request: {} (id: {:?})", request.method, request.id);
                mcp_server.handle_request(request).await
            }
            Err(e) => {
                error!("Failed to parse JSON-RPC request: {}", e);
                Some(JsonRpcResponse::parse_error(e.to_string()))
            }
        };

        if let Some(response) = response {
            let response_json = serde_json::to_string(&response)?;
            writer.write_all(response_json.as_bytes()).await?;
            writer.write_all(b"\n").await?;
            writer.flush().await?;
        }

        line.clear();
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::StubApi;

    fn server(body: Value) -> (McpServer, Arc<StubApi>) {
        let api = Arc::new(StubApi::new(body));
        let registry = ToolRegistry::with_exchange_tools(api.clone()).unwrap();
        (McpServer::new(registry), api)
    }

    fn request(method: &str, params: Value) -> JsonRpcRequest {
        JsonRpcRequest {
            jsonrpc: "2.0".to_string(),
            method: method.to_string(),
            params,
            id: Some(json!(1)),
        }
    }

    async fn serve_lines(input: &str) -> Vec<Value> {
        let (server, _) = server(json!({}));
        let mut output = Vec::new();
        serve(input.as_bytes(), &mut output, Arc::new(server))
            .await
            .unwrap();
        String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_serve_unparseable_line_gets_parse_error() {
        let replies = serve_lines("not json\n").await;
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0]["error"]["code"], JsonRpcError::PARSE_ERROR);
        assert_eq!(replies[0]["id"], Value::Null);
        assert!(replies[0].get("result").is_none());
    }

    #[tokio::test]
    async fn test_serve_skips_blank_lines_and_notifications() {
        let input = concat!(
            "\n",
            "   \n",
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
            "\n",
            r#"{"jsonrpc":"2.0","method":"ping","id":7}"#,
            "\n",
        );
        let replies = serve_lines(input).await;
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0]["id"], 7);
        assert_eq!(replies[0]["result"], json!({}));
    }

    #[tokio::test]
    async fn test_serve_answers_each_request_in_order() {
        let input = concat!(
            r#"{"jsonrpc":"2.0","method":"ping","id":1}"#,
            "\n",
            "{broken\n",
            r#"{"jsonrpc":"2.0","method":"ping","id":2}"#,
        );
        let replies = serve_lines(input).await;
        assert_eq!(replies.len(), 3);
        assert_eq!(replies[0]["id"], 1);
        assert_eq!(replies[1]["error"]["code"], JsonRpcError::PARSE_ERROR);
        assert_eq!(replies[2]["id"], 2);
    }

    #[test]
    fn test_jsonrpc_request_serialization() {
        let request = request("tools/call", json!({}));

        let json_str = serde_json::to_string(&request).unwrap();
        assert!(json_str.contains("tools/call"));
        assert!(json_str.contains("2.0"));
    }

    #[test]
    fn test_request_without_params_or_id() {
        let request: JsonRpcRequest =
            serde_json::from_str(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
                .unwrap();
        assert!(request.id.is_none());
        assert!(request.params.is_null());
    }

    #[tokio::test]
    async fn test_notification_gets_no_response() {
        let (server, _) = server(json!({}));
        let mut notification = request("notifications/initialized", Value::Null);
        notification.id = None;
        assert!(server.handle_request(notification).await.is_none());
    }

    #[tokio::test]
    async fn test_initialize() {
        let (server, _) = server(json!({}));
        let response = server
            .handle_request(request("initialize", json!({})))
            .await
            .unwrap();
        let result = response.result.unwrap();
        assert_eq!(result["serverInfo"]["name"], SERVER_NAME);
        assert!(result["capabilities"]["tools"].is_object());
    }

    #[tokio::test]
    async fn test_tools_list() {
        let (server, _) = server(json!({}));
        let response = server
            .handle_request(request("tools/list", json!({})))
            .await
            .unwrap();
        let tools = response.result.unwrap()["tools"].clone();
        assert_eq!(tools.as_array().unwrap().len(), 6);
        assert_eq!(tools[0]["name"], "get_currency_symbols");
        assert!(tools[1]["inputSchema"]["properties"]["base_currency"].is_object());
    }

    #[tokio::test]
    async fn test_tool_call_success() {
        let (server, api) = server(json!({
            "success": true,
            "symbols": {"EUR": "Euro"}
        }));
        let response = server
            .handle_request(request(
                "tools/call",
                json!({"name": "get_currency_symbols", "arguments": {}}),
            ))
            .await
            .unwrap();

        let result = response.result.unwrap();
        assert_eq!(result["isError"], false);
        let envelope: Value =
            serde_json::from_str(result["content"][0]["text"].as_str().unwrap()).unwrap();
        assert_eq!(envelope["success"], true);
        assert_eq!(envelope["formatted_list"], json!(["EUR: Euro"]));
        assert_eq!(api.calls(), 1);
    }

    #[tokio::test]
    async fn test_tool_call_without_arguments() {
        let (server, _) = server(json!({"success": true, "symbols": {}}));
        let response = server
            .handle_request(request(
                "tools/call",
                json!({"name": "get_currency_symbols"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.result.unwrap()["isError"], false);
    }

    #[tokio::test]
    async fn test_tool_call_error_envelope() {
        let (server, _) = server(json!({"success": false}));
        let response = server
            .handle_request(request(
                "tools/call",
                json!({"name": "get_latest_rates", "arguments": {}}),
            ))
            .await
            .unwrap();

        let result = response.result.unwrap();
        assert_eq!(result["isError"], true);
        let envelope: Value =
            serde_json::from_str(result["content"][0]["text"].as_str().unwrap()).unwrap();
        assert_eq!(envelope["success"], false);
        assert!(envelope["error"]
            .as_str()
            .unwrap()
            .contains("Failed to retrieve latest rates"));
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let (server, api) = server(json!({}));
        let response = server
            .handle_request(request(
                "tools/call",
                json!({"name": "no_such_tool", "arguments": {}}),
            ))
            .await
            .unwrap();

        let error = response.error.unwrap();
        assert_eq!(error.code, JsonRpcError::METHOD_NOT_FOUND);
        assert!(error.message.contains("no_such_tool"));
        assert_eq!(api.calls(), 0);
    }

    #[tokio::test]
    async fn test_tool_call_missing_name() {
        let (server, _) = server(json!({}));
        let response = server
            .handle_request(request("tools/call", json!({"arguments": {}})))
            .await
            .unwrap();
        assert_eq!(response.error.unwrap().code, JsonRpcError::INVALID_PARAMS);
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let (server, _) = server(json!({}));
        let response = server
            .handle_request(request("prompts/list", json!({})))
            .await
            .unwrap();
        assert_eq!(response.error.unwrap().code, JsonRpcError::METHOD_NOT_FOUND);
    }

    #[tokio::test]
    async fn test_info_resource() {
        let (server, _) = server(json!({}));
        let listed = server
            .handle_request(request("resources/list", json!({})))
            .await
            .unwrap();
        assert_eq!(
            listed.result.unwrap()["resources"][0]["uri"],
            INFO_RESOURCE_URI
        );

        let read = server
            .handle_request(request("resources/read", json!({"uri": INFO_RESOURCE_URI})))
            .await
            .unwrap();
        let text = read.result.unwrap()["contents"][0]["text"]
            .as_str()
            .unwrap()
            .to_string();
        assert!(text.contains("get_fluctuation_data"));

        let missing = server
            .handle_request(request("resources/read", json!({"uri": "exchangerates://nope"})))
            .await
            .unwrap();
        assert!(missing.error.is_some());
    }
}
