//! OAuth 2.1 resource server guarding an MCP JSON-RPC endpoint: configuration, auth middleware,
//! error responses, and the HTTP routes themselves.

pub mod app;
pub mod auth;
pub mod config;
pub mod error_responder;
pub mod routes;
pub mod www_authenticate;
