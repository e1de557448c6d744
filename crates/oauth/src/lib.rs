//! JWKS discovery/caching and OAuth 2.1 bearer token validation.
//!
//! This crate is the security-critical path of the resource server: it answers "is this bearer
//! token valid, and what can its holder do". It has no notion of HTTP status codes or
//! `WWW-Authenticate` headers — that translation happens one layer up, in `mcpguard-server`.

pub mod cache;
pub mod claims;
pub mod client;
pub mod jwk;
pub mod scope;
pub mod validator;

pub use cache::JwksCache;
pub use claims::TokenClaims;
pub use client::{JwksClient, JwksClientConfig};
pub use validator::{TokenValidator, TokenValidatorConfig};
