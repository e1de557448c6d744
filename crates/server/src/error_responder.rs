//! Turns the four error shapes the middleware stack can raise into HTTP responses.
//!
//! The one rule every function here follows: the `WWW-Authenticate` header and the JSON body
//! carry only what a client is supposed to act on. Diagnostic context (the reason a token was
//! rejected, the wrapped cause) is logged by the caller before this module ever sees the error,
//! never echoed back on the wire.

use crate::www_authenticate::{Param, bearer_challenge};
use axum::Json;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// 401, with `WWW-Authenticate: Bearer[, scope="..."][, resource_metadata="..."]`.
#[must_use]
pub fn unauthorized(metadata_url: &str, scope: Option<&str>) -> Response {
    let mut params = Vec::new();
    if let Some(scope) = scope.filter(|s| !s.is_empty()) {
        params.push(Param::new("scope", scope));
    }
    params.push(Param::new("resource_metadata", metadata_url));

    let mut response = (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "error": "unauthorized", "message": "Authentication required" })),
    )
        .into_response();
    insert_challenge(&mut response, &params);
    response
}

/// 403, with `WWW-Authenticate: Bearer error="insufficient_scope", scope="...", resource_metadata="..."`.
#[must_use]
pub fn forbidden(metadata_url: &str, required_scopes: &[String]) -> Response {
    let params = vec![
        Param::new("error", "insufficient_scope"),
        Param::new("scope", required_scopes.join(" ")),
        Param::new("resource_metadata", metadata_url),
    ];

    let mut response = (
        StatusCode::FORBIDDEN,
        Json(json!({
            "error": "insufficient_scope",
            "message": "The token does not carry a required scope",
        })),
    )
        .into_response();
    insert_challenge(&mut response, &params);
    response
}

/// 400. No `WWW-Authenticate` header: this is an HTTP-layer malformation, not an auth failure.
#[must_use]
pub fn bad_request(message: impl Into<String>) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": "bad_request", "message": message.into() }))).into_response()
}

/// 500. Never carries the underlying cause; the caller is expected to have logged it already.
#[must_use]
pub fn internal_error() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "internal_error", "message": "An unexpected error occurred" })),
    )
        .into_response()
}

fn insert_challenge(response: &mut Response, params: &[Param]) {
    let value = bearer_challenge(params);
    if let Ok(header_value) = HeaderValue::from_str(&value) {
        response.headers_mut().insert(header::WWW_AUTHENTICATE, header_value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unauthorized_sets_header_and_status() {
        let response = unauthorized("https://rs.example.com/.well-known/oauth-protected-resource", Some("mcp:read"));
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let header = response.headers().get(header::WWW_AUTHENTICATE).unwrap().to_str().unwrap();
        assert!(header.starts_with("Bearer"));
        assert!(header.contains("resource_metadata="));
        assert!(header.contains("scope=\"mcp:read\""));
    }

    #[test]
    fn unauthorized_without_scope_omits_scope_param() {
        let response = unauthorized("https://rs.example.com/.well-known/oauth-protected-resource", None);
        let header = response.headers().get(header::WWW_AUTHENTICATE).unwrap().to_str().unwrap();
        assert!(!header.contains("scope="));
    }

    #[test]
    fn forbidden_sets_insufficient_scope_error() {
        let response = forbidden(
            "https://rs.example.com/.well-known/oauth-protected-resource",
            &["mcp:read".to_string(), "mcp:write".to_string()],
        );
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let header = response.headers().get(header::WWW_AUTHENTICATE).unwrap().to_str().unwrap();
        assert!(header.contains(r#"error="insufficient_scope""#));
        assert!(header.contains(r#"scope="mcp:read mcp:write""#));
    }

    #[test]
    fn bad_request_has_no_challenge_header() {
        let response = bad_request("malformed JSON");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(response.headers().get(header::WWW_AUTHENTICATE).is_none());
    }

    #[test]
    fn internal_error_is_500() {
        assert_eq!(internal_error().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
