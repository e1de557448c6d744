//! Builds RFC 6750 `WWW-Authenticate: Bearer ...` header values.

/// A single `k="v"` parameter. Order is preserved in the rendered header.
pub struct Param {
    pub key: &'static str,
    pub value: String,
}

impl Param {
    #[must_use]
    pub fn new(key: &'static str, value: impl Into<String>) -> Self {
        Self { key, value: value.into() }
    }
}

/// Render `Bearer[, k="v"]*`. An empty `params` yields the bare scheme token.
#[must_use]
pub fn bearer_challenge(params: &[Param]) -> String {
    if params.is_empty() {
        return "Bearer".to_string();
    }

    let rendered = params
        .iter()
        .map(|p| format!("{}=\"{}\"", p.key, escape(&p.value)))
        .collect::<Vec<_>>()
        .join(", ");
    format!("Bearer {rendered}")
}

fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
