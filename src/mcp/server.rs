//! MCP Server implementation
//!
//! Implements the Model Context Protocol server for stdio transport.

use std::sync::Arc;

use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use crate::config::server::{NAME as SERVER_NAME, VERSION as SERVER_VERSION};
use crate::error::{McpError, Result};
use crate::mcp::tools::ToolRegistry;
use crate::mcp::types::*;

/// MCP Server
pub struct McpServer {
    /// Tool registry, read-only once the server exists
    registry: ToolRegistry,
}

impl McpServer {
    /// Create a new MCP server
    pub fn new(registry: ToolRegistry) -> Self {
        Self { registry }
    }

    /// Run the server on stdio
    pub async fn run_stdio(self) -> Result<()> {
        self.serve(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
            .await
    }

    /// Serve newline-delimited JSON-RPC from `reader`, answering on `writer`.
    ///
    /// Every message is handled in its own task. Returns after `reader`
    /// reaches EOF and all in-flight responses are written.
    pub async fn serve<R, W>(self, mut reader: R, writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let server = Arc::new(self);
        let (tx, rx) = mpsc::unbounded_channel::<JsonRpcResponse>();
        let writer_task = tokio::spawn(write_responses(rx, writer));

        let mut in_flight = JoinSet::new();
        let mut buf = Vec::new();

        // Lines are decoded one at a time so a bad one cannot end the session
        let read_result = loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break Ok(()),
                Ok(_) => {}
                Err(e) => break Err(e),
            }

            let line = match std::str::from_utf8(&buf) {
                Ok(line) if line.trim().is_empty() => continue,
                Ok(line) => line.to_string(),
                Err(e) => {
                    tracing::warn!(error = %e, "Message is not valid UTF-8");
                    let response = JsonRpcResponse::error(
                        None,
                        JsonRpcError::parse_error(format!("Message is not valid UTF-8: {}", e)),
                    );
                    if tx.send(response).is_err() {
                        tracing::warn!("Response writer closed; dropping response");
                    }
                    continue;
                }
            };

            let server = Arc::clone(&server);
            let tx = tx.clone();
            in_flight.spawn(async move {
                if let Some(response) = server.handle_message(&line).await {
                    if tx.send(response).is_err() {
                        tracing::warn!("Response writer closed; dropping response");
                    }
                }
            });
        };

        tracing::info!("Input closed, waiting for in-flight requests");
        while let Some(joined) = in_flight.join_next().await {
            if let Err(e) = joined {
                tracing::error!(error = %e, "Request task failed");
            }
        }

        drop(tx);
        let written = writer_task.await.map_err(|e| McpError::TransportError {
            message: e.to_string(),
        })?;

        read_result?;
        written
    }

    /// Handle an incoming JSON-RPC message; `None` means no response is due
    pub async fn handle_message(&self, message: &str) -> Option<JsonRpcResponse> {
        let request: JsonRpcRequest = match serde_json::from_str(message) {
            Ok(req) => req,
            Err(e) => {
                tracing::warn!(error = %e, "Unparseable message");
                return Some(JsonRpcResponse::error(
                    None,
                    JsonRpcError::parse_error(e.to_string()),
                ));
            }
        };

        let Some(id) = request.id.clone() else {
            self.handle_notification(&request);
            return None;
        };

        if request.jsonrpc != JSONRPC_VERSION {
            return Some(JsonRpcResponse::error(
                Some(id),
                JsonRpcError::invalid_request(format!(
                    "Unsupported JSON-RPC version: {}",
                    request.jsonrpc
                )),
            ));
        }

        tracing::debug!(method = %request.method, ?id, "Handling request");

        let outcome = match request.method.as_str() {
            methods::INITIALIZE => self.handle_initialize(&request),
            methods::PING => Ok(serde_json::json!({})),
            methods::LIST_TOOLS => self.handle_list_tools(),
            methods::CALL_TOOL => self.handle_call_tool(&request).await,
            _ => Err(JsonRpcError::method_not_found(&request.method)),
        };

        Some(match outcome {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(error) => JsonRpcResponse::error(Some(id), error),
        })
    }

    /// Notifications are never answered, even when malformed
    fn handle_notification(&self, request: &JsonRpcRequest) {
        if request.jsonrpc != JSONRPC_VERSION {
            tracing::warn!(jsonrpc = %request.jsonrpc, method = %request.method, "Ignoring notification with unsupported JSON-RPC version");
            return;
        }

        match request.method.as_str() {
            methods::INITIALIZED => tracing::info!("Client initialized"),
            other => tracing::debug!(method = other, "Ignoring notification"),
        }
    }

    /// Handle initialize request
    fn handle_initialize(&self, request: &JsonRpcRequest) -> std::result::Result<Value, JsonRpcError> {
        let params: InitializeParams = parse_params(request)?;

        tracing::info!(
            client = %params.client_info.name,
            client_version = %params.client_info.version,
            protocol_version = %params.protocol_version,
            "Initialize request"
        );

        let result = InitializeResult {
            protocol_version: negotiate_version(&params.protocol_version).to_string(),
            server_info: ServerInfo {
                name: SERVER_NAME.to_string(),
                version: SERVER_VERSION.to_string(),
            },
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability::default()),
            },
        };

        to_result_value(&result)
    }

    /// Handle list tools request
    fn handle_list_tools(&self) -> std::result::Result<Value, JsonRpcError> {
        let result = ListToolsResult {
            tools: self.registry.list_tools(),
        };

        to_result_value(&result)
    }

    /// Handle call tool request
    async fn handle_call_tool(&self, request: &JsonRpcRequest) -> std::result::Result<Value, JsonRpcError> {
        let params: CallToolParams = parse_params(request)?;

        match self.registry.call_tool(&params.name, params.arguments).await {
            Ok(result) => to_result_value(&result),
            Err(e) if e.is_protocol_error() => Err(JsonRpcError::invalid_params(e.to_string())),
            Err(e) => Err(JsonRpcError::internal_error(e.to_string())),
        }
    }
}

fn parse_params<T: serde::de::DeserializeOwned>(
    request: &JsonRpcRequest,
) -> std::result::Result<T, JsonRpcError> {
    let params = request
        .params
        .clone()
        .ok_or_else(|| JsonRpcError::invalid_params(format!("Missing params for {}", request.method)))?;

    serde_json::from_value(params)
        .map_err(|e| JsonRpcError::invalid_params(format!("Invalid params for {}: {}", request.method, e)))
}

fn to_result_value<T: serde::Serialize>(value: &T) -> std::result::Result<Value, JsonRpcError> {
    serde_json::to_value(value).map_err(|e| JsonRpcError::internal_error(e.to_string()))
}

/// Write responses one line at a time until every sender is dropped
async fn write_responses<W>(mut rx: mpsc::UnboundedReceiver<JsonRpcResponse>, mut writer: W) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(response) = rx.recv().await {
        let mut line = serde_json::to_vec(&response)?;
        line.push(b'\n');
        writer.write_all(&line).await?;
        writer.flush().await?;
    }

    Ok(())
}
