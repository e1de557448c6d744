//! Shared error taxonomy and request-context key.
//!
//! This crate sits at the bottom of the dependency graph: the OAuth pipeline and the MCP
//! protocol layer both need a common error shape and a way to stash typed values on a request
//! without colliding with each other, and neither should have to depend on the other just to
//! get it. Lifting both here breaks that cycle.

use std::error::Error as StdError;
use std::fmt;

/// Coarse error classification, independent of which component raised it.
///
/// This is what the HTTP and JSON-RPC layers switch on to pick a status code / error code;
/// it is not meant to be exhaustively matched by callers deep in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// No or invalid bearer token.
    Unauthorized,
    /// Authenticated, but missing a required scope.
    Forbidden,
    /// Malformed input at the HTTP boundary.
    BadRequest,
    /// Registry lookup or resource read miss.
    NotFound,
    /// Anything else: upstream failure, encoding failure, provider panic.
    Internal,
}

/// A structured error carrying enough context to log usefully without leaking that context
/// to callers.
///
/// `operation` names the unit of work that failed (e.g. `"jwks_fetch"`, `"tool_call"`);
/// `context` holds diagnostic key/value pairs (AS URL, kid, tool name, ...) that belong in logs
/// but never in a `WWW-Authenticate` header or a JSON-RPC error body.
#[derive(Debug)]
pub struct AppError {
    pub kind: ErrorKind,
    pub operation: &'static str,
    pub message: String,
    pub context: Vec<(&'static str, String)>,
    pub source: Option<Box<dyn StdError + Send + Sync + 'static>>,
}

impl AppError {
    #[must_use]
    pub fn new(kind: ErrorKind, operation: &'static str, message: impl Into<String>) -> Self {
        Self {
            kind,
            operation,
            message: message.into(),
            context: Vec::new(),
            source: None,
        }
    }

    #[must_use]
    pub fn unauthorized(operation: &'static str, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unauthorized, operation, message)
    }

    #[must_use]
    pub fn forbidden(operation: &'static str, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Forbidden, operation, message)
    }

    #[must_use]
    pub fn bad_request(operation: &'static str, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadRequest, operation, message)
    }

    #[must_use]
    pub fn not_found(operation: &'static str, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, operation, message)
    }

    #[must_use]
    pub fn internal(operation: &'static str, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, operation, message)
    }

    #[must_use]
    pub fn with_context(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.context.push((key, value.into()));
        self
    }

    #[must_use]
    pub fn with_source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.operation, self.message)?;
        for (k, v) in &self.context {
            write!(f, " {k}={v}")?;
        }
        Ok(())
    }
}

impl StdError for AppError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

/// A value wrapped in `CtxKey<T>` gets a distinct type for `http::Extensions` (or any other
/// type-keyed map), so two modules storing unrelated `T`s of the same underlying type can never
/// collide and nothing outside the module that constructed the key can read it by accident.
#[derive(Debug, Clone)]
pub struct CtxKey<T>(pub T);

impl<T> CtxKey<T> {
    #[must_use]
    pub fn new(value: T) -> Self {
        Self(value)
    }

    pub fn into_inner(self) -> T {
        self.0
    }

    #[must_use]
    pub fn get(&self) -> &T {
        &self.0
    }
}
