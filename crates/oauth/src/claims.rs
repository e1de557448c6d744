//! The claims extracted from a successfully validated access token.

/// Immutable once constructed: only the [`crate::validator::TokenValidator`] produces one of
/// these, and it is carried by value from there on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenClaims {
    pub subject: String,
    pub issuer: String,
    pub audience: Vec<String>,
    pub scopes: Vec<String>,
    pub expires_at: i64,
    pub issued_at: Option<i64>,
    pub jti: Option<String>,
}

impl TokenClaims {
    #[must_use]
    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes.iter().any(|s| s == scope)
    }
}
