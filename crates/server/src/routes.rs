//! HTTP handlers for the three public/protected endpoints.

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use mcpguard_protocol::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, RequestId, error_code};
use serde_json::json;
use std::sync::Arc;

use crate::app::AppState;

pub async fn protected_resource_metadata(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "resource": state.resource_uri,
        "authorization_servers": state.authorization_servers,
        "bearer_methods_supported": ["header"],
    }))
}

pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// `POST /mcp`. A malformed JSON-RPC envelope is still an HTTP 200: per the wire contract, a
/// JSON-RPC error travels inside the body, not as an HTTP status — the HTTP layer only surfaces
/// transport-level failures.
pub async fn mcp(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let request: JsonRpcRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(err) => {
            let response = JsonRpcResponse::failure(
                RequestId::Null,
                JsonRpcError::new(error_code::PARSE_ERROR, err.to_string()),
            );
            return (StatusCode::OK, Json(response)).into_response();
        }
    };

    match state.dispatcher.handle(request).await {
        Some(response) => (StatusCode::OK, Json(response)).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    }
}
