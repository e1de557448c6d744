//! Pure scope-containment predicates and their enforcing wrappers.

use crate::claims::TokenClaims;
use mcpguard_error::AppError;

#[must_use]
pub fn has_scope(claims: &TokenClaims, scope: &str) -> bool {
    claims.has_scope(scope)
}

/// Non-empty intersection between the claims' scopes and `scopes`. An empty `scopes` always
/// returns `false` — there is nothing to have "any" of.
#[must_use]
pub fn has_any_scope(claims: &TokenClaims, scopes: &[&str]) -> bool {
    !scopes.is_empty() && scopes.iter().any(|s| claims.has_scope(s))
}

/// Subset containment: every requested scope must be present. An empty `scopes` is vacuously
/// satisfied.
#[must_use]
pub fn has_all_scopes(claims: &TokenClaims, scopes: &[&str]) -> bool {
    scopes.iter().all(|s| claims.has_scope(s))
}

/// Fails with `forbidden` unless every scope in `required` is present. An empty `required`
/// always succeeds.
pub fn require_scopes(claims: Option<&TokenClaims>, required: &[&str]) -> Result<(), AppError> {
    let Some(claims) = claims else {
        return Err(AppError::unauthorized(
            "require_scopes",
            "authentication required",
        ));
    };
    if has_all_scopes(claims, required) {
        return Ok(());
    }
    let missing: Vec<&str> = required
        .iter()
        .copied()
        .filter(|s| !claims.has_scope(s))
        .collect();
    Err(AppError::forbidden(
        "require_scopes",
        format!("missing required scope(s): {}", missing.join(" ")),
    )
    .with_context("required_scopes", required.join(" ")))
}

/// Fails unless at least one of `scopes` is present. An empty `scopes` always fails.
pub fn require_any_scope(claims: Option<&TokenClaims>, scopes: &[&str]) -> Result<(), AppError> {
    let Some(claims) = claims else {
        return Err(AppError::unauthorized(
            "require_any_scope",
            "authentication required",
        ));
    };
    if has_any_scope(claims, scopes) {
        return Ok(());
    }
    Err(AppError::forbidden(
        "require_any_scope",
        format!("none of the required scopes present: {}", scopes.join(" ")),
    )
    .with_context("required_scopes", scopes.join(" ")))
}
