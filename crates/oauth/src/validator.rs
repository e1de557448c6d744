//! Verifies a raw JWT against the configured audience, JWKS, and clock skew, producing
//! [`TokenClaims`] on success.

use crate::claims::TokenClaims;
use crate::client::JwksClient;
use jsonwebtoken::{Algorithm, Validation, decode, decode_header};
use mcpguard_error::AppError;
use serde::{Deserialize, Deserializer};
use std::time::Duration;

/// Algorithms this resource server will verify a signature with. `none` and every symmetric
/// (HMAC) algorithm are unconditionally excluded — they simply aren't in this list.
const PERMITTED_ALGORITHMS: &[Algorithm] = &[Algorithm::RS256, Algorithm::ES256, Algorithm::ES384];

#[derive(Debug, Clone)]
pub struct TokenValidatorConfig {
    /// The canonical URI of this resource server; must appear in a token's `aud` claim.
    pub audience: String,
    pub clock_skew: Duration,
}

#[derive(Clone)]
pub struct TokenValidator {
    config: TokenValidatorConfig,
    jwks: JwksClient,
}

#[derive(Debug, Deserialize)]
struct RawClaims {
    #[serde(default)]
    sub: Option<String>,
    #[serde(default)]
    iss: Option<String>,
    #[serde(default, deserialize_with = "string_or_seq")]
    aud: Vec<String>,
    exp: i64,
    #[serde(default)]
    iat: Option<i64>,
    #[serde(default)]
    jti: Option<String>,
    #[serde(default)]
    scope: Option<String>,
}

/// `aud` may be a single string or an array of strings; accept both.
fn string_or_seq<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrSeq {
        One(String),
        Many(Vec<String>),
    }

    Ok(match StringOrSeq::deserialize(deserializer)? {
        StringOrSeq::One(s) => vec![s],
        StringOrSeq::Many(v) => v,
    })
}

impl TokenValidator {
    #[must_use]
    pub fn new(config: TokenValidatorConfig, jwks: JwksClient) -> Self {
        Self { config, jwks }
    }

    /// Validate `jwt` end to end: header shape, signature, `exp`/`iat` skew, and audience.
    /// Returns the extracted [`TokenClaims`] on success.
    pub async fn validate(&self, jwt: &str) -> Result<TokenClaims, AppError> {
        let header = decode_header(jwt)
            .map_err(|err| invalid_token("malformed_header", err.to_string()))?;

        if !PERMITTED_ALGORITHMS.contains(&header.alg) {
            return Err(invalid_token(
                "unsupported_algorithm",
                format!("algorithm {:?} is not permitted", header.alg),
            ));
        }

        let kid = header
            .kid
            .filter(|k| !k.is_empty())
            .ok_or_else(|| invalid_token("missing_kid", "token header has no kid"))?;

        let key = self.jwks.get_key(&kid).await.map_err(|err| {
            invalid_token("key_not_found", err.to_string()).with_context("kid", &kid)
        })?;

        let mut validation = Validation::new(header.alg);
        validation.leeway = self.config.clock_skew.as_secs();
        validation.validate_exp = true;
        validation.validate_nbf = false;
        // Issuer is checked for mere presence below, not against a fixed allowlist here.
        validation.set_audience(&[self.config.audience.as_str()]);

        let data = decode::<RawClaims>(jwt, &key, &validation)
            .map_err(|err| classify_decode_error(&self.config.audience, err))?;
        let claims = data.claims;

        if let Some(iat) = claims.iat {
            let now = now_unix();
            if iat > now + i64::try_from(self.config.clock_skew.as_secs()).unwrap_or(i64::MAX) {
                return Err(invalid_token("invalid_iat", "token issued in the future"));
            }
        }

        let issuer = claims
            .iss
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| invalid_token("missing_issuer", "token has no issuer"))?;

        Ok(TokenClaims {
            subject: claims.sub.unwrap_or_default(),
            issuer,
            audience: claims.aud,
            scopes: claims
                .scope
                .unwrap_or_default()
                .split_whitespace()
                .map(str::to_string)
                .collect(),
            expires_at: claims.exp,
            issued_at: claims.iat,
            jti: claims.jti,
        })
    }
}

fn invalid_token(reason: &'static str, message: impl Into<String>) -> AppError {
    AppError::unauthorized("validate_token", message.into()).with_context("reason", reason)
}

fn classify_decode_error(expected_audience: &str, err: jsonwebtoken::errors::Error) -> AppError {
    use jsonwebtoken::errors::ErrorKind;

    match err.kind() {
        ErrorKind::ExpiredSignature => invalid_token("expired", "token exp has elapsed"),
        ErrorKind::InvalidAudience => {
            invalid_token("invalid_audience", "token aud does not include expected audience")
                .with_context("expected_audience", expected_audience)
        }
        ErrorKind::InvalidSignature => invalid_token("invalid_signature", "signature verification failed"),
        _ => invalid_token("invalid_token", err.to_string()),
    }
}

fn now_unix() -> i64 {
    i64::try_from(
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or(Duration::ZERO)
            .as_secs(),
    )
    .unwrap_or(i64::MAX)
}
