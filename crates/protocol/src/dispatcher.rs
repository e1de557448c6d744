//! Routes a decoded JSON-RPC request to the right handler and shapes the response.

use crate::resource::ResourceRegistry;
use crate::rpc::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, RequestId, error_code};
use crate::tool::ToolRegistry;
use mcpguard_error::{AppError, ErrorKind};
use serde::Deserialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Identifies this server in the `initialize` response's `serverInfo` field.
#[derive(Debug, Clone)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
    /// The MCP protocol version this server speaks, echoed back regardless of what the client
    /// requested.
    pub protocol_version: String,
}

/// Dispatches `initialize`, `tools/list`, `tools/call`, `resources/list`, and `resources/read`
/// against the registries it was built with. Any other method is a standard
/// `CodeMethodNotFound`.
pub struct Dispatcher {
    tools: Arc<ToolRegistry>,
    resources: Arc<ResourceRegistry>,
    info: ServerInfo,
    initialized: AtomicBool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InitializeParams {
    #[serde(default)]
    #[allow(dead_code)]
    protocol_version: Option<String>,
    #[serde(default)]
    #[allow(dead_code)]
    client_info: Option<serde_json::Value>,
    #[serde(default)]
    #[allow(dead_code)]
    capabilities: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ToolCallParams {
    name: String,
    #[serde(default)]
    arguments: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ResourceReadParams {
    uri: String,
}

impl Dispatcher {
    #[must_use]
    pub fn new(tools: Arc<ToolRegistry>, resources: Arc<ResourceRegistry>, info: ServerInfo) -> Self {
        Self { tools, resources, info, initialized: AtomicBool::new(false) }
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    /// Process one JSON-RPC request.
    ///
    /// Returns `None` for a true notification (no `id` field in the request): per JSON-RPC 2.0,
    /// a notification is processed for its side effects and never gets a response. Every other
    /// request — including one with an explicit `id: null` — always gets a response, even on a
    /// malformed envelope.
    pub async fn handle(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        let id = request.id.clone();

        if request.jsonrpc != "2.0" || request.method.trim().is_empty() {
            let response = JsonRpcResponse::failure(
                id.unwrap_or(RequestId::Null),
                JsonRpcError::new(error_code::INVALID_REQUEST, "invalid JSON-RPC envelope"),
            );
            return Some(response);
        }

        let Some(id) = id else {
            if let Err(err) = self.route(&request.method, request.params).await {
                tracing::warn!(method = %request.method, error = %err, "notification handling failed");
            }
            return None;
        };

        let response = match self.route(&request.method, request.params).await {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(err) => JsonRpcResponse::failure(id, to_json_rpc_error(&request.method, err)),
        };
        Some(response)
    }

    async fn route(&self, method: &str, params: Option<serde_json::Value>) -> Result<serde_json::Value, AppError> {
        match method {
            "initialize" => self.handle_initialize(params),
            "tools/list" => Ok(self.handle_tools_list()),
            "tools/call" => self.handle_tools_call(params).await,
            "resources/list" => Ok(self.handle_resources_list()),
            "resources/read" => self.handle_resources_read(params).await,
            other => Err(
                AppError::not_found("dispatch", "method not found").with_context("method", other),
            ),
        }
    }

    fn handle_initialize(&self, params: Option<serde_json::Value>) -> Result<serde_json::Value, AppError> {
        if let Some(params) = params {
            let _: InitializeParams = serde_json::from_value(params)
                .map_err(|err| invalid_params("initialize", err))?;
        }
        self.initialized.store(true, Ordering::SeqCst);

        Ok(serde_json::json!({
            "protocolVersion": self.info.protocol_version,
            "serverInfo": {
                "name": self.info.name,
                "version": self.info.version,
            },
            "capabilities": {
                "tools": {},
                "resources": {},
            },
        }))
    }

    fn handle_tools_list(&self) -> serde_json::Value {
        serde_json::json!({ "tools": self.tools.list() })
    }

    async fn handle_tools_call(&self, params: Option<serde_json::Value>) -> Result<serde_json::Value, AppError> {
        let params = params.ok_or_else(|| {
            AppError::bad_request("tools_call", "missing params").with_context("reason", "missing_params")
        })?;
        let params: ToolCallParams =
            serde_json::from_value(params).map_err(|err| invalid_params("tools/call", err))?;

        let tool = self.tools.get(&params.name)?;

        let result = tool.execute(params.arguments).await.map_err(|err| {
            AppError::internal("tools_call", "tool execution failed")
                .with_context("name", &params.name)
                .with_context("source", err.to_string())
        })?;

        Ok(serde_json::json!({
            "content": [{ "type": "text", "text": materialize_as_text(&result) }],
            "isError": false,
        }))
    }

    fn handle_resources_list(&self) -> serde_json::Value {
        serde_json::json!({ "resources": self.resources.list() })
    }

    async fn handle_resources_read(&self, params: Option<serde_json::Value>) -> Result<serde_json::Value, AppError> {
        let params = params.ok_or_else(|| {
            AppError::bad_request("resources_read", "missing params").with_context("reason", "missing_params")
        })?;
        let params: ResourceReadParams =
            serde_json::from_value(params).map_err(|err| invalid_params("resources/read", err))?;

        let content = self.resources.read(&params.uri).await?;

        Ok(serde_json::json!({
            "contents": [{
                "uri": content.uri,
                "mimeType": content.mime_type,
                "text": content.text,
            }],
        }))
    }
}

fn materialize_as_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => serde_json::to_string(other).unwrap_or_default(),
    }
}

fn invalid_params(method: &'static str, err: serde_json::Error) -> AppError {
    AppError::bad_request("decode_params", err.to_string())
        .with_context("method", method)
        .with_context("json_rpc_code", error_code::INVALID_PARAMS.to_string())
}

/// Map an [`AppError`] raised while routing into the JSON-RPC error shape the wire format uses.
/// `ErrorKind::Unauthorized`/`Forbidden` never reach here in practice (the HTTP layer rejects
/// those before the body is parsed), but are mapped defensively rather than left to panic.
fn to_json_rpc_error(method: &str, err: AppError) -> JsonRpcError {
    let looks_like_invalid_params = err.operation == "decode_params";
    let looks_like_method_not_found = err.operation == "dispatch" && err.kind == ErrorKind::NotFound;

    let code = if looks_like_method_not_found {
        error_code::METHOD_NOT_FOUND
    } else if looks_like_invalid_params {
        error_code::INVALID_PARAMS
    } else if method == "tools/call" && err.kind == ErrorKind::NotFound {
        error_code::TOOL_NOT_FOUND
    } else if method == "resources/read" && err.kind == ErrorKind::NotFound {
        error_code::RESOURCE_NOT_FOUND
    } else {
        match err.kind {
            ErrorKind::BadRequest => error_code::INVALID_PARAMS,
            ErrorKind::NotFound => error_code::INTERNAL_ERROR,
            _ => error_code::INTERNAL_ERROR,
        }
    };

    if looks_like_invalid_params {
        return JsonRpcError::new(code, "invalid params").with_data(serde_json::json!({
            "operation": err.operation,
            "reason": err.message,
        }));
    }

    JsonRpcError::new(code, err.message.clone()).with_data(serde_json::json!({
        "operation": err.operation,
    }))
}
