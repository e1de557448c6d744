//! Authentication and scope-enforcement middleware.
//!
//! Two composable steps, applied in order on every protected route: [`authenticate`] extracts
//! and validates the bearer token and attaches claims to the request; [`require_scopes`] (run
//! after it) enforces that those claims carry every scope the route demands.

use axum::extract::{Request, State};
use axum::http::header;
use axum::middleware::Next;
use axum::response::Response;
use mcpguard_error::CtxKey;
use mcpguard_oauth::{TokenClaims, TokenValidator};
use std::sync::Arc;

use crate::error_responder;

pub struct AuthState {
    pub validator: TokenValidator,
    pub metadata_url: String,
    pub default_required_scopes: Vec<String>,
}

/// Extract `Authorization: Bearer <token>`, accepting only an exact, case-sensitive `Bearer`
/// scheme followed by a single non-empty token.
fn extract_bearer_token(req: &Request) -> Option<&str> {
    let value = req.headers().get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    if token.is_empty() { None } else { Some(token) }
}

pub async fn authenticate(State(state): State<Arc<AuthState>>, mut req: Request, next: Next) -> Response {
    let default_scope = state.default_required_scopes.join(" ");
    let default_scope = (!default_scope.is_empty()).then_some(default_scope.as_str());

    let Some(token) = extract_bearer_token(&req) else {
        return error_responder::unauthorized(&state.metadata_url, default_scope);
    };

    let claims = match state.validator.validate(token).await {
        Ok(claims) => claims,
        Err(err) => {
            tracing::warn!(error = %err, "bearer token validation failed");
            return error_responder::unauthorized(&state.metadata_url, default_scope);
        }
    };

    req.extensions_mut().insert(CtxKey::new(claims));
    next.run(req).await
}

pub async fn require_scopes(State(state): State<Arc<AuthState>>, req: Request, next: Next) -> Response {
    let claims = req.extensions().get::<CtxKey<TokenClaims>>().map(CtxKey::get);

    let required: Vec<&str> = state.default_required_scopes.iter().map(String::as_str).collect();

    if let Err(err) = mcpguard_oauth::scope::require_scopes(claims, &required) {
        tracing::warn!(error = %err, "scope check failed");
        return match err.kind {
            mcpguard_error::ErrorKind::Unauthorized => error_responder::unauthorized(&state.metadata_url, None),
            _ => error_responder::forbidden(&state.metadata_url, &state.default_required_scopes),
        };
    }

    next.run(req).await
}
